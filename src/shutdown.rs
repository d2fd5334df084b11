//! Shutdown signaling.
//!
//! A watch-channel pair links the signal listener to the dispatch loop:
//! the listener fires the trigger once an OS termination signal arrives,
//! and every subsystem holding a watch sees it. Session invalidation
//! (`logOut`) happens in `cli::run` after the dispatcher has drained.

use tokio::sync::watch;

/// Fires the shutdown broadcast. Held by the signal listener task.
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Observes the shutdown broadcast. Clone freely.
#[derive(Clone)]
pub struct ShutdownWatch {
    rx: watch::Receiver<bool>,
}

/// Create a linked trigger/watch pair.
pub fn channel() -> (ShutdownTrigger, ShutdownWatch) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownWatch { rx })
}

impl ShutdownTrigger {
    /// Broadcast shutdown to all watches. Send errors mean every watch is
    /// already gone, which is harmless here.
    pub fn fire(self) {
        let _ = self.tx.send(true);
    }
}

impl ShutdownWatch {
    /// Resolve once shutdown has been triggered. Resolves immediately if
    /// the trigger already fired.
    pub async fn triggered(&mut self) {
        let _ = self.rx.wait_for(|&fired| fired).await;
    }
}

/// Wait for SIGINT, SIGTERM, or SIGQUIT and return the signal name.
pub async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    // Registration only fails outside a tokio runtime; abort loudly.
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    let mut sigquit = signal(SignalKind::quit()).expect("failed to register SIGQUIT handler");

    tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    }
}
