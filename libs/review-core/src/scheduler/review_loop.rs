//! Interactive review loop.
//!
//! Input and output are collaborators: an [`InteractionSource`] turns key
//! presses or lines into [`Action`]s and a [`Presenter`] shows items. The loop
//! is blocking; run it on a dedicated thread.

use super::Scheduler;
use crate::types::{Action, ServedItem};
use std::time::{Duration, Instant};

/// Produces the user's next action. Blocks until one is available.
pub trait InteractionSource {
    fn wait_action(&mut self) -> Action;
}

/// Shows items and session state.
pub trait Presenter {
    fn show(&mut self, item: &ServedItem);

    /// Nothing is due right now.
    fn show_empty(&mut self);

    fn set_status(&mut self, status: &str);

    /// Read the current item aloud.
    fn speak(&mut self, _item: &ServedItem) {}

    /// Play a listen pass.
    fn listen(&mut self, _playlist: &[ServedItem]) {}
}

enum Step {
    Advance,
    Quit,
}

/// Counters for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Items presented, repeats included.
    pub presented: usize,
    /// Presentations repeated because the user moved on too quickly.
    pub repeated: usize,
}

pub struct ReviewLoop<'a, I, P> {
    scheduler: &'a Scheduler,
    input: I,
    presenter: P,
    minimal_dwell: Duration,
}

impl<'a, I: InteractionSource, P: Presenter> ReviewLoop<'a, I, P> {
    pub fn new(scheduler: &'a Scheduler, input: I, presenter: P) -> Self {
        let minimal_dwell = scheduler.config().minimal_dwell();
        Self {
            scheduler,
            input,
            presenter,
            minimal_dwell,
        }
    }

    /// Repeat an item shown for less than `minimal_dwell`.
    pub fn with_minimal_dwell(mut self, minimal_dwell: Duration) -> Self {
        self.minimal_dwell = minimal_dwell;
        self
    }

    /// Give back the input and presenter.
    pub fn into_parts(self) -> (I, P) {
        (self.input, self.presenter)
    }

    /// Serve items until the user quits.
    pub fn run(&mut self) -> LoopSummary {
        let mut summary = LoopSummary::default();

        loop {
            let mut current = self.scheduler.next();
            self.presenter.set_status(&self.scheduler.status_line());

            loop {
                let started = Instant::now();
                summary.presented += 1;

                match self.interact(&mut current) {
                    Step::Quit => return summary,
                    Step::Advance => {}
                }

                // Moving on faster than the dwell shows the same item again.
                if current.is_none() || started.elapsed() >= self.minimal_dwell {
                    break;
                }
                summary.repeated += 1;
                tracing::debug!("answered too quickly, repeating");
            }
        }
    }

    fn present(&mut self, item: &Option<ServedItem>) -> Action {
        match item {
            Some(item) => self.presenter.show(item),
            None => self.presenter.show_empty(),
        }
        self.input.wait_action()
    }

    /// Handle actions for one presentation until the user moves on.
    fn interact(&mut self, current: &mut Option<ServedItem>) -> Step {
        let mut action = self.present(current);

        loop {
            tracing::trace!(action = action.as_str(), "user action");
            match action {
                Action::Back => {
                    if let Some(previous) = self.scheduler.previous() {
                        *current = Some(previous);
                    }
                    action = self.present(current);
                }
                Action::Speech => {
                    if let Some(item) = current.as_ref() {
                        self.presenter.speak(item);
                    }
                    action = self.input.wait_action();
                }
                Action::Listen => {
                    let session = self.scheduler.begin_listen();
                    self.presenter.listen(session.playlist());
                    action = self.input.wait_action();
                }
                Action::Delete => {
                    if let Some(item) = current.as_ref() {
                        self.scheduler.disable(item.fingerprint);
                    }
                    return Step::Advance;
                }
                Action::AddToGroup => {
                    if let Some(item) = current.as_ref() {
                        self.scheduler.add_to_group(item.fingerprint);
                    }
                    return Step::Advance;
                }
                Action::Next => return Step::Advance,
                Action::Quit => return Step::Quit,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReviewConfig, ReviewPaths, SpanTable};
    use crate::fingerprint::Fingerprinter;
    use crate::time::ManualClock;
    use crate::types::ServeSource;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Scripted(VecDeque<Action>);

    impl InteractionSource for Scripted {
        fn wait_action(&mut self) -> Action {
            self.0.pop_front().unwrap_or(Action::Quit)
        }
    }

    #[derive(Default)]
    struct Recorder {
        shown: Vec<(String, ServeSource)>,
        empty: usize,
        statuses: Vec<String>,
        spoken: Vec<String>,
        playlists: Vec<usize>,
    }

    impl Presenter for Recorder {
        fn show(&mut self, item: &ServedItem) {
            self.shown.push((item.text.clone(), item.source));
        }

        fn show_empty(&mut self) {
            self.empty += 1;
        }

        fn set_status(&mut self, status: &str) {
            self.statuses.push(status.to_string());
        }

        fn speak(&mut self, item: &ServedItem) {
            self.spoken.push(item.text.clone());
        }

        fn listen(&mut self, playlist: &[ServedItem]) {
            self.playlists.push(playlist.len());
        }
    }

    fn scheduler(dir: &TempDir, lines: &str) -> Scheduler {
        let source = dir.path().join("cards.txt");
        std::fs::write(&source, lines).unwrap();
        let config = ReviewConfig {
            spans: SpanTable::new(vec![0, 100]).unwrap(),
            order: "latest".to_string(),
            minimal_dwell_ms: 0,
            ..ReviewConfig::default()
        };
        let scheduler = Scheduler::new(
            ReviewPaths::for_source(&source),
            config,
            Fingerprinter::default(),
            Arc::new(ManualClock::new(1_700_000_000)),
        );
        scheduler.initialize().unwrap();
        scheduler
    }

    fn run(scheduler: &Scheduler, actions: &[Action]) -> (LoopSummary, Recorder) {
        let input = Scripted(actions.iter().copied().collect());
        let mut review = ReviewLoop::new(scheduler, input, Recorder::default());
        let summary = review.run();
        let (_, recorder) = review.into_parts();
        (summary, recorder)
    }

    fn texts(recorder: &Recorder) -> Vec<&str> {
        recorder.shown.iter().map(|(text, _)| text.as_str()).collect()
    }

    #[test]
    fn next_walks_the_pool_then_reports_empty() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(&dir, "alpha\nbeta\n");

        let (summary, recorder) = run(&scheduler, &[Action::Next, Action::Next, Action::Next]);
        assert_eq!(recorder.shown.len(), 2);
        // Third Next on the empty screen, then the scripted Quit on another.
        assert_eq!(recorder.empty, 2);
        assert_eq!(summary.presented, 4);
        assert_eq!(recorder.statuses.last().map(String::as_str), Some("cards.txt - 0"));
    }

    #[test]
    fn back_shows_previous_without_recording() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(&dir, "alpha\nbeta\ngamma\n");

        let (_, recorder) = run(&scheduler, &[Action::Next, Action::Back, Action::Quit]);
        assert_eq!(recorder.shown.len(), 3);
        assert_eq!(recorder.shown[2].1, ServeSource::Backward);
        assert_eq!(recorder.shown[2].0, recorder.shown[0].0);
        assert_eq!(scheduler.traversal().len(), 2);
    }

    #[test]
    fn delete_disables_current_item() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(&dir, "alpha\nbeta\n");

        let (_, recorder) = run(&scheduler, &[Action::Delete, Action::Quit]);
        assert_eq!(recorder.shown.len(), 2);
        assert_ne!(recorder.shown[0].0, recorder.shown[1].0);
        let deleted = Fingerprinter::default().fingerprint(&recorder.shown[0].0);
        assert!(!scheduler.pool().contains(&deleted));
        assert_eq!(scheduler.due_count(), 0);
    }

    #[test]
    fn speech_and_listen_keep_the_item() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(&dir, "alpha\nbeta\ngamma\n");

        let (_, recorder) = run(
            &scheduler,
            &[Action::Speech, Action::Speech, Action::Listen, Action::Quit],
        );
        assert_eq!(recorder.shown.len(), 1);
        assert_eq!(recorder.spoken.len(), 2);
        assert_eq!(recorder.playlists, vec![2]);
        assert!(!scheduler.is_listening());
    }

    #[test]
    fn quick_answers_repeat_the_item() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(&dir, "alpha\nbeta\n");

        let input = Scripted([Action::Next, Action::Quit].into_iter().collect());
        let mut review = ReviewLoop::new(&scheduler, input, Recorder::default())
            .with_minimal_dwell(Duration::from_secs(60));
        let summary = review.run();
        let (_, recorder) = review.into_parts();

        assert_eq!(summary.repeated, 1);
        assert_eq!(texts(&recorder), vec![recorder.shown[0].0.as_str(); 2]);
        assert_eq!(scheduler.traversal().len(), 1);
    }

    #[test]
    fn add_to_group_comes_back_after_distance() {
        let dir = TempDir::new().unwrap();
        let lines: String = (0..20).map(|i| format!("item {i}\n")).collect();
        let mut scheduler = scheduler(&dir, &lines);
        let mut config = scheduler.config().clone();
        config.minimal_distance = 2;
        scheduler.apply_config(config).unwrap();

        let mut actions = vec![Action::AddToGroup];
        actions.extend([Action::Next; 4]);
        actions.push(Action::Quit);
        let (_, recorder) = run(&scheduler, &actions);

        let first = recorder.shown[0].0.clone();
        let again = recorder
            .shown
            .iter()
            .position(|(text, source)| *text == first && *source == ServeSource::Group);
        assert_eq!(again, Some(3));
        assert!(scheduler.group().is_empty());
        let fingerprint = Fingerprinter::default().fingerprint(&first);
        assert_eq!(scheduler.history()[&fingerprint].len(), 1);
    }
}
