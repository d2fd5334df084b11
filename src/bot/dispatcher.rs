//! Update dispatch loop.
//!
//! Long-polls `getUpdates` and classifies each inbound message: commands
//! and messages without a recognized media attachment get the fixed usage
//! reply; media-bearing messages become conversion jobs. Job admission is
//! gated by a semaphore sized to the configured job cap, so the dispatch
//! loop stops accepting new media work while all slots are busy.
//!
//! On shutdown the loop stops polling and waits up to a grace period for
//! in-flight jobs before abandoning the rest.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::shutdown::ShutdownWatch;
use crate::telegram::{BotClient, MediaRef, Message};

use super::job::Job;
use super::transcode::Transcoder;

/// Server-side long-poll window.
pub const LONG_POLL_TIMEOUT_SECS: u64 = 60;

/// How long to wait for in-flight jobs after a shutdown signal.
const DRAIN_GRACE: Duration = Duration::from_secs(30);

/// Back-off after a failed poll.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Fixed reply for commands and non-media messages.
pub const USAGE_TEXT: &str =
    "To use this bot, send any audio file and it will be converted to opus format.";

/// What to do with an inbound message.
#[derive(Debug)]
enum Action {
    /// Reply with the usage text.
    Usage,
    /// Spawn a conversion job for this attachment.
    Convert(MediaRef),
}

fn classify(message: &Message) -> Action {
    if message.is_command() {
        return Action::Usage;
    }
    match message.media_ref() {
        Some(media) => Action::Convert(media),
        None => Action::Usage,
    }
}

/// Consumes the update stream and spawns one job per qualifying message.
pub struct Dispatcher {
    client: Arc<BotClient>,
    transcoder: Arc<Transcoder>,
    debug: bool,
    max_jobs: usize,
}

impl Dispatcher {
    pub fn new(
        client: Arc<BotClient>,
        transcoder: Arc<Transcoder>,
        debug: bool,
        max_jobs: usize,
    ) -> Self {
        Self {
            client,
            transcoder,
            debug,
            max_jobs,
        }
    }

    /// Run until shutdown is triggered, then drain.
    pub async fn run(&self, mut shutdown: ShutdownWatch) {
        let permits = Arc::new(Semaphore::new(self.max_jobs));
        let mut jobs: JoinSet<()> = JoinSet::new();
        let mut offset: Option<i64> = None;

        info!(max_jobs = self.max_jobs, "dispatcher started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.triggered() => {
                    info!("shutdown requested, no longer accepting updates");
                    break;
                }

                polled = self.client.get_updates(offset, LONG_POLL_TIMEOUT_SECS) => {
                    match polled {
                        Ok(updates) => {
                            if let Some(max) = updates.iter().map(|u| u.update_id).max() {
                                offset = Some(max + 1);
                            }
                            for update in updates {
                                let Some(message) = update.message else { continue };
                                self.handle_message(update.update_id, message, &permits, &mut jobs)
                                    .await;
                            }
                            // Reap whatever finished since the last batch.
                            while jobs.try_join_next().is_some() {}
                        }
                        Err(e) => {
                            warn!(error = %e, "getUpdates failed, backing off");
                            sleep(POLL_RETRY_DELAY).await;
                        }
                    }
                }
            }
        }

        self.drain(jobs).await;
    }

    async fn handle_message(
        &self,
        update_id: i64,
        message: Message,
        permits: &Arc<Semaphore>,
        jobs: &mut JoinSet<()>,
    ) {
        let chat_id = message.chat.id;

        match classify(&message) {
            Action::Usage => {
                // Sent synchronously before the loop continues.
                if let Err(e) = self.client.send_message(chat_id, USAGE_TEXT).await {
                    warn!(chat = chat_id, error = %e, "usage reply failed");
                }
            }
            Action::Convert(media) => {
                // Admission gate: wait here while all job slots are busy.
                // acquire_owned only fails on a closed semaphore, which
                // never happens here.
                let Ok(permit) = Arc::clone(permits).acquire_owned().await else {
                    return;
                };

                info!(chat = chat_id, update = update_id, kind = %media.kind, "dispatching job");

                let job = Job::new(chat_id, update_id, media, self.debug);
                let client = Arc::clone(&self.client);
                let transcoder = Arc::clone(&self.transcoder);
                jobs.spawn(async move {
                    let _permit = permit;
                    job.run(&client, &transcoder).await;
                });
            }
        }
    }

    async fn drain(&self, mut jobs: JoinSet<()>) {
        if jobs.is_empty() {
            return;
        }

        info!(in_flight = jobs.len(), grace = ?DRAIN_GRACE, "draining in-flight jobs");
        let drained = timeout(DRAIN_GRACE, async {
            while jobs.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(abandoned = jobs.len(), "grace period elapsed, aborting remaining jobs");
            jobs.shutdown().await;
        } else {
            info!("all jobs drained");
        }
    }
}
