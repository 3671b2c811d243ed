//! Scheduler integration tests over real files in a temp directory.

mod common;

use pretty_assertions::assert_eq;
use review_core::{
    FingerprintAlgorithm, Fingerprinter, MigrationOutcome, ReloadOutcome, ReviewError, ServeSource,
    SpanTable,
};

use common::{fp, TestContext, T0};

/// Test a full pass over two items and their second round.
#[test]
fn test_serve_until_drained_then_next_round() {
    let ctx = TestContext::new("hello\nworld\n");
    let scheduler = ctx.scheduler();
    assert_eq!(scheduler.due_count(), 2);
    assert_eq!(scheduler.status_line(), "words.txt - 2");

    let first = scheduler.next().unwrap();
    assert_eq!(first.round, 0);
    assert_eq!(first.source, ServeSource::Pool);
    assert!(ctx.pending_exists());

    let second = scheduler.next().unwrap();
    assert_ne!(first.fingerprint, second.fingerprint);

    // Draining the due set checkpoints.
    assert!(!ctx.pending_exists());
    let (low, high) = if fp("hello") < fp("world") {
        (fp("hello"), fp("world"))
    } else {
        (fp("world"), fp("hello"))
    };
    assert_eq!(ctx.history_text(), format!("{low} {T0}\n{high} {T0}\n"));

    assert_eq!(scheduler.next(), None);
    assert_eq!(scheduler.status_line(), "words.txt - 0");

    ctx.clock.advance(10);
    let again = scheduler.next().unwrap();
    assert_eq!(again.round, 1);
}

/// Test that the pool is ordered by round, then most recent review.
#[test]
fn test_pool_prefers_low_rounds_and_recent_reviews() {
    let ctx = TestContext::new("alpha\nbeta\ngamma\n");
    ctx.write_history(&format!(
        "{} {}\n{} {}\n{}\n",
        fp("alpha"),
        T0 - 100,
        fp("beta"),
        T0 - 50,
        fp("gamma"),
    ));

    let scheduler = ctx.scheduler();
    assert_eq!(
        scheduler.pool(),
        vec![fp("gamma"), fp("beta"), fp("alpha")]
    );
}

/// Test that removed lines are pruned from history on disk.
#[test]
fn test_removed_item_is_pruned_and_persisted() {
    let mut ctx = TestContext::new("hello\nworld\n");
    let scheduler = ctx.scheduler();
    scheduler.next();
    scheduler.next();

    ctx.rewrite_source("hello\nthere\n");
    assert!(matches!(
        scheduler.content_changed(),
        ReloadOutcome::Reloaded(_)
    ));
    assert!(!ctx.history_text().contains(&fp("world").to_string()));
    assert_eq!(scheduler.due_count(), 1);

    drop(scheduler);
    let reopened = ctx.scheduler();
    let history = reopened.history();
    assert!(!history.contains_key(&fp("world")));
    assert_eq!(history[&fp("hello")], vec![T0]);
    assert!(history[&fp("there")].is_empty());
}

/// Test that case, punctuation and line order edits keep history.
#[test]
fn test_cosmetic_edit_keeps_identity() {
    let mut ctx = TestContext::new("hello\nworld\n");
    let scheduler = ctx.scheduler();
    scheduler.next();
    scheduler.next();

    ctx.rewrite_source("# reordered\nWorld!\n\nHELLO.\n");
    assert_eq!(scheduler.content_changed(), ReloadOutcome::Unchanged);
    assert_eq!(scheduler.history()[&fp("hello")], vec![T0]);
    assert_eq!(scheduler.text(fp("world")), "World!");
}

/// Test that a missing source keeps history intact.
#[test]
fn test_missing_source_keeps_history() {
    let ctx = TestContext::new("hello\n");
    let scheduler = ctx.scheduler();
    scheduler.next();
    let before = ctx.history_text();

    std::fs::remove_file(&ctx.paths.source).unwrap();
    assert_eq!(scheduler.content_changed(), ReloadOutcome::Missing);
    assert_eq!(ctx.history_text(), before);
    assert_eq!(scheduler.history()[&fp("hello")], vec![T0]);
}

/// Test that items of a deleted source are neither served nor recorded.
#[test]
fn test_missing_source_serves_nothing() {
    let mut ctx = TestContext::new("hello\nworld\n");
    let scheduler = ctx.scheduler();
    let first = scheduler.next().unwrap();
    let other = if first.fingerprint == fp("hello") {
        fp("world")
    } else {
        fp("hello")
    };

    std::fs::remove_file(&ctx.paths.source).unwrap();
    assert_eq!(scheduler.content_changed(), ReloadOutcome::Missing);
    assert_eq!(scheduler.due_count(), 0);
    assert_eq!(scheduler.next(), None);
    assert_eq!(scheduler.history()[&other], Vec::<i64>::new());
    assert_eq!(scheduler.history()[&first.fingerprint], vec![T0]);

    // Restoring the file makes the kept record due again.
    ctx.rewrite_source("hello\nworld\n");
    assert!(matches!(
        scheduler.content_changed(),
        ReloadOutcome::Reloaded(_)
    ));
    assert_eq!(scheduler.next().unwrap().fingerprint, other);
}

/// Test that a source with only comments left serves nothing.
#[test]
fn test_emptied_source_serves_nothing() {
    let mut ctx = TestContext::new("hello\nworld\n");
    let scheduler = ctx.scheduler();
    scheduler.next().unwrap();

    ctx.rewrite_source("# nothing left\n");
    scheduler.content_changed();
    assert_eq!(scheduler.next(), None);
    assert_eq!(scheduler.history().values().flatten().count(), 1);
}

/// Test that completions survive a crash before the checkpoint.
#[test]
fn test_pending_log_recovered_after_crash() {
    let ctx = TestContext::new("hello\nworld\n");
    let scheduler = ctx.scheduler();
    let served = scheduler.next().unwrap();
    assert!(ctx.pending_exists());
    drop(scheduler);

    let reopened = ctx.scheduler();
    assert_eq!(reopened.history()[&served.fingerprint], vec![T0]);
    assert!(!ctx.pending_exists());
    assert_eq!(reopened.due_count(), 1);
}

/// Test that the history is rewritten every `checkpoint_every` completions.
#[test]
fn test_checkpoint_every_rewrites_history() {
    let ctx = TestContext::new("a1\nb2\nc3\nd4\ne5\n");
    let mut config = ctx.config();
    config.checkpoint_every = 2;
    let scheduler = ctx.scheduler_with(config);

    scheduler.next();
    assert!(ctx.pending_exists());
    assert!(ctx.history_text().is_empty());

    scheduler.next();
    assert!(!ctx.pending_exists());
    assert_eq!(ctx.history_text().lines().filter(|l| l.contains(' ')).count(), 2);
}

/// Test walking back through served items and resuming forward.
#[test]
fn test_back_navigation_then_forward() {
    let ctx = TestContext::new("a1\nb2\nc3\nd4\ne5\n");
    let scheduler = ctx.scheduler();
    let served: Vec<_> = (0..3).map(|_| scheduler.next().unwrap()).collect();

    let back = scheduler.previous().unwrap();
    assert_eq!(back.fingerprint, served[1].fingerprint);
    assert_eq!(back.source, ServeSource::Backward);
    assert_eq!(scheduler.previous().unwrap().fingerprint, served[0].fingerprint);
    assert_eq!(scheduler.previous().unwrap().fingerprint, served[0].fingerprint);
    assert!(scheduler.is_navigating_back());

    let forward = scheduler.next().unwrap();
    assert_eq!(forward.source, ServeSource::Pool);
    assert!(!served.iter().any(|item| item.fingerprint == forward.fingerprint));
    assert_eq!(scheduler.traversal().len(), 4);
    assert_eq!(scheduler.history()[&served[0].fingerprint], vec![T0]);
}

/// Test that a grouped item returns only after the minimal distance.
#[test]
fn test_group_item_returns_after_distance() {
    let ctx = TestContext::new("a1\nb2\nc3\nd4\ne5\nf6\n");
    let scheduler = ctx.scheduler();
    let first = scheduler.next().unwrap();
    scheduler.add_to_group(first.fingerprint);

    let sources: Vec<_> = (0..4)
        .map(|_| {
            let item = scheduler.next().unwrap();
            (item.fingerprint, item.source)
        })
        .collect();
    assert_eq!(sources[0].1, ServeSource::Pool);
    assert_eq!(sources[1].1, ServeSource::Pool);
    assert_eq!(sources[2], (first.fingerprint, ServeSource::Group));
    assert_eq!(sources[3].1, ServeSource::Pool);
    assert_eq!(scheduler.history()[&first.fingerprint], vec![T0]);
}

/// Test that a disabled item is never served and counts as finished.
#[test]
fn test_disabled_item_is_skipped() {
    let ctx = TestContext::new("hello\nworld\n");
    let mut config = ctx.config();
    config.spans = SpanTable::new(vec![0]).unwrap();
    let scheduler = ctx.scheduler_with(config);

    scheduler.disable(fp("world"));
    let served = scheduler.next().unwrap();
    assert_eq!(served.fingerprint, fp("hello"));
    assert_eq!(scheduler.next(), None);
    assert_eq!(scheduler.status_line(), "words.txt - finished.");
}

/// Test the earliest policy takes from the back of the pool.
#[test]
fn test_earliest_order() {
    let ctx = TestContext::new("a1\nb2\nc3\n");
    let mut config = ctx.config();
    config.order = "earliest".to_string();
    let scheduler = ctx.scheduler_with(config);

    let last = *scheduler.pool().last().unwrap();
    assert_eq!(scheduler.next().unwrap().fingerprint, last);
}

/// Test listen playlists cover the pool without recording anything.
#[test]
fn test_listen_playlist_records_nothing() {
    let ctx = TestContext::new("a1\nb2\nc3\n");
    let scheduler = ctx.scheduler();

    let listen = scheduler.begin_listen();
    assert!(scheduler.is_listening());
    assert_eq!(listen.playlist().len(), 3);
    assert!(listen
        .playlist()
        .iter()
        .all(|item| item.source == ServeSource::Listen));
    drop(listen);

    assert!(!scheduler.is_listening());
    assert_eq!(scheduler.due_count(), 3);
    assert!(!ctx.pending_exists());
}

/// Test that upgrading to the current algorithm leaves the file untouched.
#[test]
fn test_upgrade_same_algorithm_is_noop() {
    let ctx = TestContext::new("hello\nworld\n");
    let scheduler = ctx.scheduler();
    scheduler.next();
    scheduler.next();
    let before = ctx.history_text();

    let outcome = scheduler
        .upgrade_fingerprint_algorithm(FingerprintAlgorithm::Fnv1a)
        .unwrap();
    assert_eq!(outcome, MigrationOutcome::Unchanged);
    assert_eq!(ctx.history_text(), before);
}

/// Test that upgrading re-keys history and switches the content store.
#[test]
fn test_upgrade_rekeys_history() {
    let ctx = TestContext::new("hello\nworld\n");
    let scheduler = ctx.scheduler();
    scheduler.next();
    scheduler.next();

    let outcome = scheduler
        .upgrade_fingerprint_algorithm(FingerprintAlgorithm::Sha256)
        .unwrap();
    assert_eq!(outcome, MigrationOutcome::Migrated { items: 2 });
    assert_eq!(scheduler.fingerprint_algorithm(), FingerprintAlgorithm::Sha256);

    let sha = Fingerprinter::new(FingerprintAlgorithm::Sha256);
    let history = scheduler.history();
    assert_eq!(history[&sha.fingerprint("hello")], vec![T0]);
    assert_eq!(history[&sha.fingerprint("world")], vec![T0]);
    assert!(!history.contains_key(&fp("hello")));
    assert!(ctx.history_text().contains(&sha.fingerprint("hello").to_string()));

    ctx.clock.advance(10);
    assert_eq!(scheduler.next().unwrap().round, 1);
}

/// Test that an item without history aborts the upgrade untouched.
#[test]
fn test_upgrade_aborts_on_missing_history() {
    let ctx = TestContext::new("hello\nworld\n");
    ctx.write_history(&format!("{} {T0}\n", fp("hello")));
    let scheduler = ctx.scheduler();
    let before = ctx.history_text();

    let error = scheduler
        .upgrade_fingerprint_algorithm(FingerprintAlgorithm::Sha256)
        .unwrap_err();
    assert!(matches!(
        error,
        ReviewError::MigrationAborted { fingerprint } if fingerprint == fp("world")
    ));
    assert_eq!(ctx.history_text(), before);
    assert_eq!(scheduler.fingerprint_algorithm(), FingerprintAlgorithm::Fnv1a);

    // The never-reviewed item is still schedulable.
    assert_eq!(scheduler.next().unwrap().fingerprint, fp("world"));
}
