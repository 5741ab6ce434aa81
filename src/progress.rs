//! Live completion indicator for a run.
//!
//! [`TerminalProgress`] keeps an atomic completion counter and a background
//! render loop that redraws a single overwritable line on a fixed interval.
//! Stopping the reporter draws one final line and waits for the loop to exit.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ProgressConfig;

/// Completion tracking driven by the orchestrator
///
/// Lifecycle: `start` once, `increment` any number of times from any task,
/// then `stop` once all work is done.
#[async_trait]
pub trait Progress: Send + Sync {
    /// Reset the counter to zero out of `total` and begin reporting
    fn start(&self, total: usize);

    /// Record one finished task
    fn increment(&self);

    /// Flush a final report and wait until background reporting has ended
    ///
    /// Calling `stop` again, or before `start`, does nothing.
    async fn stop(&self);
}

/// Render one progress line: `\r|<pct>% complete <bar>|`
///
/// A run with nothing to do renders as complete. Counts past `total` are
/// clamped to 100%.
pub fn render_line(completed: usize, total: usize, bar_width: usize) -> String {
    let ratio = if total == 0 {
        1.0
    } else {
        (completed as f64 / total as f64).min(1.0)
    };
    let filled = ((ratio * bar_width as f64) as usize).min(bar_width);
    format!(
        "\r|{:3.0}% complete {}{}|",
        ratio * 100.0,
        "=".repeat(filled),
        " ".repeat(bar_width - filled)
    )
}

#[derive(Debug, Default)]
struct Counter {
    total: AtomicUsize,
    completed: AtomicUsize,
}

impl Counter {
    fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    /// Count one finished task; increments past `total` are dropped
    fn increment(&self) {
        let total = self.total.load(Ordering::Acquire);
        let counted = self
            .completed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |done| {
                (done < total).then_some(done + 1)
            });
        if counted.is_err() {
            tracing::warn!(total, "progress incremented past its total");
        }
    }

    fn snapshot(&self) -> (usize, usize) {
        let total = self.total.load(Ordering::Acquire);
        let completed = self.completed.load(Ordering::Acquire);
        (completed.min(total), total)
    }
}

enum Lifecycle {
    Created,
    Running {
        stop: CancellationToken,
        handle: JoinHandle<()>,
    },
    Stopped,
}

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Progress reporter that draws a fill bar on a terminal
pub struct TerminalProgress {
    counter: Arc<Counter>,
    out: SharedWriter,
    interval: Duration,
    bar_width: usize,
    lifecycle: Mutex<Lifecycle>,
}

impl TerminalProgress {
    /// Create a reporter that draws to stdout
    #[must_use]
    pub fn new(config: &ProgressConfig) -> Self {
        Self::with_writer(config, std::io::stdout())
    }

    /// Create a reporter that draws to an arbitrary writer
    #[must_use]
    pub fn with_writer(config: &ProgressConfig, writer: impl Write + Send + 'static) -> Self {
        Self {
            counter: Arc::new(Counter::default()),
            out: Arc::new(Mutex::new(Box::new(writer))),
            interval: config.interval,
            bar_width: config.bar_width,
            lifecycle: Mutex::new(Lifecycle::Created),
        }
    }

    /// Tasks completed so far
    pub fn completed(&self) -> usize {
        self.counter.snapshot().0
    }

    /// Total set by `start`
    pub fn total(&self) -> usize {
        self.counter.snapshot().1
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Progress for TerminalProgress {
    fn start(&self, total: usize) {
        let mut lifecycle = self.lifecycle();
        if !matches!(*lifecycle, Lifecycle::Created) {
            tracing::warn!(total, "progress reporter can only be started once");
            return;
        }

        self.counter.reset(total);
        let stop = CancellationToken::new();
        let handle = spawn_render_loop(RenderLoopParams {
            counter: Arc::clone(&self.counter),
            out: Arc::clone(&self.out),
            interval: self.interval,
            bar_width: self.bar_width,
            stop: stop.clone(),
        });
        *lifecycle = Lifecycle::Running { stop, handle };
    }

    fn increment(&self) {
        self.counter.increment();
    }

    async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle(), Lifecycle::Stopped);
        match previous {
            Lifecycle::Running { stop, handle } => {
                stop.cancel();
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "progress render loop did not exit cleanly");
                }
            }
            Lifecycle::Created => tracing::debug!("progress stopped before it was started"),
            Lifecycle::Stopped => tracing::debug!("progress already stopped"),
        }
    }
}

struct RenderLoopParams {
    counter: Arc<Counter>,
    out: SharedWriter,
    interval: Duration,
    bar_width: usize,
    stop: CancellationToken,
}

fn spawn_render_loop(params: RenderLoopParams) -> JoinHandle<()> {
    let RenderLoopParams {
        counter,
        out,
        interval,
        bar_width,
        stop,
    } = params;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => {
                    draw(&counter, &out, bar_width, true);
                    break;
                }
                _ = ticker.tick() => {
                    draw(&counter, &out, bar_width, false);
                }
            }
        }
    })
}

fn draw(counter: &Counter, out: &SharedWriter, bar_width: usize, last: bool) {
    let (completed, total) = counter.snapshot();
    let line = render_line(completed, total, bar_width);
    let mut out = out.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = write_line(&mut **out, &line, last) {
        tracing::debug!(error = %e, "failed to draw progress");
    }
}

fn write_line(out: &mut dyn Write, line: &str, last: bool) -> std::io::Result<()> {
    out.write_all(line.as_bytes())?;
    if last {
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Progress reporter that only counts
///
/// Used when the progress display is disabled.
#[derive(Debug, Default)]
pub struct SilentProgress {
    counter: Counter,
}

impl SilentProgress {
    /// Create a silent reporter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks completed so far
    pub fn completed(&self) -> usize {
        self.counter.snapshot().0
    }
}

#[async_trait]
impl Progress for SilentProgress {
    fn start(&self, total: usize) {
        self.counter.reset(total);
    }

    fn increment(&self) {
        self.counter.increment();
    }

    async fn stop(&self) {}
}
