//! Telegram Bot API transport: wire types and HTTP client.

pub mod client;
pub mod types;

pub use client::{ApiError, BotClient};
pub use types::{Attachment, Chat, FileInfo, MediaKind, MediaRef, Message, Update, User};
