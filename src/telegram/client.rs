//! Bot API client: long-poll retrieval, replies, file lookup, and the
//! voice-note upload.
//!
//! The server endpoint is a template with two substitution slots
//! (`https://api.telegram.org/bot%s/%s` by default): the first takes the
//! bot token, the second the API method name. Self-hosted Bot API servers
//! are supported by overriding the template.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use super::types::{FileInfo, Update, User};

/// Errors from the Bot API or its HTTP transport.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} failed: {status}: {body}")]
    Status {
        method: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{method} rejected: {description}")]
    Rejected {
        method: &'static str,
        description: String,
    },
}

/// Standard Bot API response envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

impl<T> Envelope<T> {
    fn into_result(self, method: &'static str) -> Result<T, ApiError> {
        if !self.ok {
            return Err(ApiError::Rejected {
                method,
                description: self.description.unwrap_or_default(),
            });
        }
        self.result.ok_or(ApiError::Rejected {
            method,
            description: "response carried no result".to_string(),
        })
    }
}

/// Bot API client. Cheap to share behind an `Arc`; `reqwest::Client` is
/// internally reference-counted.
pub struct BotClient {
    token: String,
    endpoint: String,
    http: reqwest::Client,
}

/// Substitute the two `%s` slots of an endpoint template.
fn render(template: &str, first: &str, second: &str) -> String {
    template.replacen("%s", first, 1).replacen("%s", second, 1)
}

impl BotClient {
    pub fn new(token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: endpoint.into(),
            // No client-wide timeout: getUpdates holds the connection open
            // for the long-poll window. Per-step deadlines live in the job.
            http: reqwest::Client::new(),
        }
    }

    /// The underlying HTTP client, for plain file downloads.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// URL for an API method call.
    fn method_url(&self, method: &str) -> String {
        render(&self.endpoint, &self.token, method)
    }

    /// Direct download URL for a server file path. File content is served
    /// from the `file/bot<token>` tree rather than the method tree.
    pub fn file_url(&self, file_path: &str) -> String {
        let template = self.endpoint.replacen("bot%s", "file/bot%s", 1);
        render(&template, &self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let url = self.method_url(method);
        let request = match body {
            Some(json) => self.http.post(&url).json(&json),
            None => self.http.post(&url),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                method,
                status,
                body,
            });
        }

        let envelope: Envelope<T> = response.json().await?;
        envelope.into_result(method)
    }

    /// Authorization probe; returns the bot's own account.
    pub async fn get_me(&self) -> Result<User, ApiError> {
        self.call("getMe", None).await
    }

    /// Long-poll for updates. The server holds the connection open for up
    /// to `timeout_secs` before returning an empty batch.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, ApiError> {
        let mut body = serde_json::json!({ "timeout": timeout_secs });
        if let Some(offset) = offset {
            body["offset"] = serde_json::Value::from(offset);
        }
        self.call("getUpdates", Some(body)).await
    }

    /// Send a plain-text reply.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        self.call::<serde_json::Value>("sendMessage", Some(body))
            .await?;
        Ok(())
    }

    /// Resolve a file id to its server storage path.
    pub async fn get_file(&self, file_id: &str) -> Result<FileInfo, ApiError> {
        let body = serde_json::json!({ "file_id": file_id });
        self.call("getFile", Some(body)).await
    }

    /// Upload a local file as a voice-note message.
    pub async fn send_voice(&self, chat_id: i64, voice_path: &Path) -> Result<(), ApiError> {
        let method = "sendVoice";
        let url = self.method_url(method);

        let file_name = voice_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let bytes = tokio::fs::read(voice_path)
            .await
            .map_err(|e| ApiError::Rejected {
                method,
                description: format!("cannot read {}: {}", voice_path.display(), e),
            })?;

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/ogg")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("voice", part);

        let response = self.http.post(&url).multipart(form).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                method,
                status,
                body,
            });
        }

        let envelope: Envelope<serde_json::Value> = response.json().await?;
        envelope.into_result(method)?;
        Ok(())
    }

    /// Invalidate the session. Issued once, at shutdown.
    pub async fn log_out(&self) -> Result<(), ApiError> {
        self.call::<bool>("logOut", None).await?;
        Ok(())
    }
}
