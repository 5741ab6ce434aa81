//! # agenda-get
//!
//! Fetches the latest planning commission agendas from a handful of city
//! websites, concurrently, into a single output directory.
//!
//! Each site becomes one [`Task`]. The [`Orchestrator`] runs every task at
//! once, shows a live completion line while they run, and only after all of
//! them have finished replays the collected failures through an
//! [`ErrorHandler`]. One city changing its page layout never stops the others
//! from being fetched.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use agenda_get::{
//!     DirSink, HttpConfig, HttpFetcher, Orchestrator, Reporter, SilentProgress, SiteTask, Task,
//!     catalog,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let out_dir = std::env::temp_dir().join("agendas");
//!     agenda_get::prepare_output_dir(&out_dir, true).await?;
//!
//!     let fetcher = Arc::new(HttpFetcher::new(&HttpConfig::default())?);
//!     let today = chrono::Local::now().date_naive();
//!     let tasks: Vec<Arc<dyn Task>> = catalog::catalog()
//!         .into_iter()
//!         .map(|site| Arc::new(SiteTask::new(site, fetcher.clone(), today)) as Arc<dyn Task>)
//!         .collect();
//!
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(SilentProgress::new()),
//!         Arc::new(DirSink::new(&out_dir)),
//!     );
//!     let summary = orchestrator
//!         .run(&CancellationToken::new(), tasks, &mut Reporter::stdout(&out_dir))
//!         .await?;
//!     println!("{} of {} agendas saved", summary.succeeded, summary.total);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Concurrent task error collection
pub mod collector;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Run orchestration and post-run reporting
pub mod orchestrator;
/// Progress reporting
pub mod progress;
/// Agenda persistence
pub mod sink;
/// Site catalog, link finders and HTTP fetching
pub mod sites;
/// Core types
pub mod types;

// Re-export commonly used types
pub use collector::ErrorCollector;
pub use config::{Config, HttpConfig, OutputConfig, ProgressConfig};
pub use error::{Error, FetchError, FindError, Result, TaskError};
pub use orchestrator::{ErrorHandler, Orchestrator, Reporter};
pub use progress::{Progress, SilentProgress, TerminalProgress};
pub use sink::{ArtifactSink, DirSink, default_output_dir, prepare_output_dir};
pub use sites::{Fetcher, HttpFetcher, Site, SiteTask, catalog};
pub use types::{Agenda, ByteStream, RunSummary, Task};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives a termination signal
///
/// Cancellation makes in-flight fetches fail promptly; the run still joins
/// every task and reports before exiting.
///
/// - **Unix:** listens for SIGTERM and SIGINT, falling back to whichever can be registered.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Returns without cancelling if `token` is cancelled by someone else first.
pub async fn cancel_on_signal(token: CancellationToken) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = wait_for_signal() => {
            tracing::warn!("cancelling outstanding fetches");
            token.cancel();
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
