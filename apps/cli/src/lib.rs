pub mod error;
pub mod lock;
pub mod settings;
pub mod terminal;
pub mod watcher;

use std::io;
use std::sync::Arc;

use review_core::{Fingerprinter, ReviewLoop, Scheduler, SystemClock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::lock::InstanceLock;
use crate::settings::Settings;
use crate::terminal::{TerminalInput, TerminalPresenter, HELP};
use crate::watcher::SourceWatcher;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let settings = Settings::from_env()?;
    let _lock = InstanceLock::acquire(&settings.paths.source)?;

    let mut scheduler = Scheduler::new(
        settings.paths.clone(),
        settings.config.clone(),
        Fingerprinter::new(settings.fingerprint),
        Arc::new(SystemClock),
    );
    if let Err(e) = scheduler.initialize() {
        tracing::warn!(error = %e, "starting with incomplete history");
    }

    if let Some(algorithm) = settings.upgrade {
        tracing::info!(
            from = settings.fingerprint.as_str(),
            to = algorithm.as_str(),
            "upgrading fingerprints"
        );
        let outcome = scheduler.upgrade_fingerprint_algorithm(algorithm)?;
        tracing::info!(
            ?outcome,
            "upgrade finished, set REVIEW_FINGERPRINT={} from now on",
            algorithm.as_str()
        );
        return Ok(());
    }

    scheduler.start_resync();

    let mut watcher = SourceWatcher::new();
    match scheduler.notifier() {
        Ok(notifier) => {
            if let Err(e) = watcher.start(&settings.paths.source, notifier) {
                tracing::warn!(error = %e, "file watcher unavailable, changes are picked up on restart");
            }
        }
        Err(e) => tracing::warn!(error = %e, "file watcher not started"),
    }

    eprintln!("{HELP}");
    let mut scheduler = tokio::task::spawn_blocking(move || {
        {
            let input = TerminalInput::new(io::stdin().lock());
            let presenter = TerminalPresenter::new(io::stdout());
            let summary = ReviewLoop::new(&scheduler, input, presenter).run();
            tracing::info!(
                presented = summary.presented,
                repeated = summary.repeated,
                "review finished"
            );
        }
        scheduler
    })
    .await?;

    watcher.stop();
    scheduler.shutdown().await;

    Ok(())
}
