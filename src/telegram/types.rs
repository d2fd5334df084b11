//! Serde models for the Bot API wire format.
//!
//! Only the fields this bot reads are modeled; everything else in the
//! update payload is ignored during deserialization.

use serde::Deserialize;

/// One item from a `getUpdates` result.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// A chat message. Carries optional text and at most one media attachment.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub audio: Option<Attachment>,
    #[serde(default)]
    pub voice: Option<Attachment>,
    #[serde(default)]
    pub document: Option<Attachment>,
    #[serde(default)]
    pub video: Option<Attachment>,
    #[serde(default)]
    pub video_note: Option<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A media attachment reference. The Bot API returns richer objects per
/// kind; the bot only needs the file handle.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub file_id: String,
}

/// Result of a `getFile` call.
#[derive(Debug, Clone, Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Result of a `getMe` call.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// The attachment kinds this bot accepts for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Voice,
    Document,
    Video,
    VideoNote,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Audio => "audio",
            Self::Voice => "voice",
            Self::Document => "document",
            Self::Video => "video",
            Self::VideoNote => "video_note",
        };
        write!(f, "{}", name)
    }
}

/// A resolved media reference: the remote file handle plus its kind tag.
#[derive(Debug, Clone)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
}

impl Message {
    /// Whether the message is a bot command (`/start`, `/help`, ...).
    pub fn is_command(&self) -> bool {
        self.text
            .as_deref()
            .map(|t| t.starts_with('/'))
            .unwrap_or(false)
    }

    /// Extract the media reference, if any. When several attachment fields
    /// are somehow populated, the first in audio, voice, document, video,
    /// video_note order wins.
    pub fn media_ref(&self) -> Option<MediaRef> {
        let (kind, attachment) = if let Some(a) = &self.audio {
            (MediaKind::Audio, a)
        } else if let Some(a) = &self.voice {
            (MediaKind::Voice, a)
        } else if let Some(a) = &self.document {
            (MediaKind::Document, a)
        } else if let Some(a) = &self.video {
            (MediaKind::Video, a)
        } else if let Some(a) = &self.video_note {
            (MediaKind::VideoNote, a)
        } else {
            return None;
        };

        Some(MediaRef {
            kind,
            file_id: attachment.file_id.clone(),
        })
    }
}
