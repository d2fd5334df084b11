//! Fake Bot API server shared by the integration suites.
//!
//! The server answers the handful of methods the bot touches and records
//! request paths, so tests can assert which calls were made and how often.
//! Update batches are queued as raw JSON arrays; once the queue is empty,
//! `getUpdates` answers with an empty batch after a short pause, standing
//! in for the long-poll window.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use opusbot::telegram::{BotClient, MediaKind, MediaRef};

#[derive(Clone)]
pub struct FakeApi {
    pub log: Arc<Mutex<Vec<String>>>,
    /// Bytes served for file downloads; `None` makes the download 404.
    pub media: Option<Vec<u8>>,
    /// Pause before the file bytes are served.
    pub media_delay: Duration,
    /// `file_path` reported by getFile.
    pub file_path: String,
    /// Queued getUpdates batches, each a JSON array of updates.
    pub updates: Arc<Mutex<VecDeque<String>>>,
}

impl FakeApi {
    pub fn new(log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            log,
            media: Some(b"fake media bytes".to_vec()),
            media_delay: Duration::ZERO,
            file_path: "music/remote_song.mp3".to_string(),
            updates: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub async fn start(self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((sock, _)) = listener.accept().await else { break };
                let api = self.clone();
                tokio::spawn(async move { api.handle(sock).await });
            }
        });
        addr
    }

    async fn handle(&self, mut sock: TcpStream) {
        let mut buf = Vec::new();
        let mut tmp = [0u8; 8192];
        let header_end = loop {
            let Ok(n) = sock.read(&mut tmp).await else { return };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&tmp[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let path = head.split_whitespace().nth(1).unwrap_or("").to_string();

        let mut content_length = 0usize;
        for line in head.lines() {
            if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }

        // Drain the request body before answering.
        let mut body_len = buf.len() - header_end;
        while body_len < content_length {
            let Ok(n) = sock.read(&mut tmp).await else { break };
            if n == 0 {
                break;
            }
            body_len += n;
        }

        self.log.lock().unwrap().push(path.clone());

        let (status, payload): (&str, Vec<u8>) = if path.contains("/file/") {
            if !self.media_delay.is_zero() {
                tokio::time::sleep(self.media_delay).await;
            }
            match &self.media {
                Some(bytes) => ("200 OK", bytes.clone()),
                None => ("404 Not Found", b"gone".to_vec()),
            }
        } else if path.ends_with("/getUpdates") {
            let batch = self.updates.lock().unwrap().pop_front();
            let batch = match batch {
                Some(json) => json,
                None => {
                    // Long-poll stand-in: pause briefly before the empty
                    // batch so the poll loop does not spin hot.
                    tokio::time::sleep(Duration::from_millis(25)).await;
                    "[]".to_string()
                }
            };
            (
                "200 OK",
                format!(r#"{{"ok":true,"result":{}}}"#, batch).into_bytes(),
            )
        } else if path.ends_with("/getMe") {
            (
                "200 OK",
                br#"{"ok":true,"result":{"id":1,"username":"opus_bot"}}"#.to_vec(),
            )
        } else if path.ends_with("/getFile") {
            (
                "200 OK",
                format!(
                    r#"{{"ok":true,"result":{{"file_id":"F1","file_path":"{}"}}}}"#,
                    self.file_path
                )
                .into_bytes(),
            )
        } else if path.ends_with("/sendMessage") || path.ends_with("/sendVoice") {
            ("200 OK", br#"{"ok":true,"result":{"message_id":1}}"#.to_vec())
        } else if path.ends_with("/logOut") {
            ("200 OK", br#"{"ok":true,"result":true}"#.to_vec())
        } else {
            (
                "404 Not Found",
                br#"{"ok":false,"description":"unknown method"}"#.to_vec(),
            )
        };

        let header = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            payload.len()
        );
        let _ = sock.write_all(header.as_bytes()).await;
        let _ = sock.write_all(&payload).await;
        let _ = sock.shutdown().await;
    }
}

/// Endpoint template pointing at a started fake server.
pub fn endpoint(addr: SocketAddr) -> String {
    format!("http://{}/bot%s/%s", addr)
}

pub fn count(log: &Arc<Mutex<Vec<String>>>, suffix: &str) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|path| path.ends_with(suffix))
        .count()
}

pub fn downloads(log: &Arc<Mutex<Vec<String>>>) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|path| path.contains("/file/"))
        .count()
}

/// Converter stand-in that copies its input to its output. The argument
/// profile is fixed (`-nostdin -y -i <in> -c:a libopus <out>`), so a
/// stand-in sees the input path as `$4` and the output path as `$7`.
pub fn copy_script(dir: &TempDir) -> String {
    let path = dir.path().join("fake-ffmpeg");
    std::fs::write(&path, "#!/bin/sh\ncp \"$4\" \"$7\"\n").unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.to_string_lossy().to_string()
}

pub fn media_ref() -> MediaRef {
    MediaRef {
        kind: MediaKind::Audio,
        file_id: "F1".to_string(),
    }
}

pub async fn client_for(api: FakeApi) -> BotClient {
    let addr = api.start().await;
    BotClient::new("TOKEN", endpoint(addr))
}

/// Poll the request log until `suffix` has been hit `n` times.
pub async fn wait_for_calls(log: &Arc<Mutex<Vec<String>>>, suffix: &str, n: usize) {
    for _ in 0..200 {
        if count(log, suffix) >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {} {} calls", n, suffix);
}
