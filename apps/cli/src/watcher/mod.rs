//! File system watcher forwarding source file changes to the scheduler.

use crate::error::{CliError, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use review_core::ContentNotifier;
use std::ffi::OsString;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Watches the directory holding the source file.
///
/// Editors often replace a file instead of writing it in place, so the parent
/// directory is watched and events are filtered by file name.
pub struct SourceWatcher {
    watcher: Option<RecommendedWatcher>,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SourceWatcher {
    pub fn new() -> Self {
        Self {
            watcher: None,
            stop_tx: None,
            thread: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.watcher.is_some()
    }

    /// Start watching `source`; every relevant event is reported through `notifier`.
    pub fn start(&mut self, source: &Path, notifier: ContentNotifier) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }

        let file_name = source
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| CliError::InvalidSetting {
                name: "REVIEW_FILE",
                value: source.display().to_string(),
                reason: "not a file path".to_string(),
            })?;
        let directory = match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };

        let (tx, rx) = channel();
        let (stop_tx, stop_rx) = channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                if let Ok(event) = result {
                    let _ = tx.send(event);
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&directory, RecursiveMode::NonRecursive)?;
        tracing::info!(directory = %directory.display(), "watching source directory");

        self.watcher = Some(watcher);
        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread::spawn(move || {
            Self::event_loop(rx, stop_rx, file_name, notifier);
        }));

        Ok(())
    }

    /// Stop the watcher and wait for its thread.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        self.watcher = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("watcher thread panicked");
            }
        }
    }

    fn event_loop(
        rx: Receiver<Event>,
        stop_rx: Receiver<()>,
        file_name: OsString,
        notifier: ContentNotifier,
    ) {
        loop {
            if stop_rx.try_recv().is_ok() {
                break;
            }

            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(event) => {
                    if !Self::is_relevant(&event, &file_name) {
                        continue;
                    }
                    tracing::debug!(kind = ?event.kind, "source file changed");
                    if !notifier.content_changed() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn is_relevant(event: &Event, file_name: &OsString) -> bool {
        let touches_source = event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name.as_os_str()));
        touches_source
            && matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            )
    }
}

impl Default for SourceWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn only_source_changes_are_relevant() {
        let name = OsString::from("words.txt");
        assert!(SourceWatcher::is_relevant(
            &event(EventKind::Modify(ModifyKind::Any), "/tmp/words.txt"),
            &name
        ));
        assert!(SourceWatcher::is_relevant(
            &event(EventKind::Create(CreateKind::File), "/tmp/words.txt"),
            &name
        ));
        assert!(!SourceWatcher::is_relevant(
            &event(EventKind::Modify(ModifyKind::Any), "/tmp/words.history"),
            &name
        ));
        assert!(!SourceWatcher::is_relevant(
            &event(EventKind::Access(AccessKind::Any), "/tmp/words.txt"),
            &name
        ));
    }
}
