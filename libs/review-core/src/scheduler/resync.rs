//! Periodic resync task.
//!
//! Runs on the tokio runtime and talks to the owning [`Scheduler`](super::Scheduler)
//! through a command channel. A timer wake recomputes the due set; source
//! file changes arrive as [`ResyncCommand::ContentChanged`].

use super::lock_state;
use super::state::ReviewState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Messages to control the resync task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncCommand {
    /// New period in seconds; 0 parks the task until the next command.
    SetInterval(u64),
    /// Source file changed on disk.
    ContentChanged,
    /// Exit the loop.
    Stop,
}

/// Owning side of the resync task.
#[derive(Debug)]
pub(crate) struct ResyncHandle {
    sender: mpsc::UnboundedSender<ResyncCommand>,
    task: JoinHandle<()>,
}

impl ResyncHandle {
    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<ResyncCommand> {
        self.sender.clone()
    }

    /// Returns false when the task is already gone.
    pub(crate) fn send(&self, command: ResyncCommand) -> bool {
        self.sender.send(command).is_ok()
    }

    pub(crate) async fn stop(self) {
        let _ = self.sender.send(ResyncCommand::Stop);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "resync task ended abnormally");
        }
    }
}

/// Spawn the resync loop on the current runtime.
pub(crate) fn spawn(
    state: Arc<Mutex<ReviewState>>,
    passive: Arc<AtomicBool>,
    interval_secs: u64,
) -> ResyncHandle {
    let (sender, receiver) = mpsc::unbounded_channel();
    let task = tokio::spawn(resync_loop(state, passive, interval_secs, receiver));
    ResyncHandle { sender, task }
}

async fn resync_loop(
    state: Arc<Mutex<ReviewState>>,
    passive: Arc<AtomicBool>,
    mut interval_secs: u64,
    mut receiver: mpsc::UnboundedReceiver<ResyncCommand>,
) {
    tracing::debug!(interval_secs, "resync task started");

    loop {
        let command = if interval_secs == 0 {
            receiver.recv().await
        } else {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(interval_secs)) => {
                    if passive.load(Ordering::SeqCst) {
                        tracing::trace!("listening, resync skipped");
                    } else {
                        lock_state(&state).refresh();
                    }
                    continue;
                }
                command = receiver.recv() => command,
            }
        };

        match command {
            Some(ResyncCommand::SetInterval(secs)) => {
                tracing::debug!(interval_secs = secs, "resync interval changed");
                interval_secs = secs;
            }
            Some(ResyncCommand::ContentChanged) => {
                let mut state = lock_state(&state);
                state.content.reload();
                if !passive.load(Ordering::SeqCst) {
                    state.refresh();
                }
            }
            Some(ResyncCommand::Stop) | None => break,
        }
    }

    tracing::debug!("resync task stopped");
}
