//! Run orchestration: fan tasks out, join, then report.
//!
//! A run launches one tokio task per [`Task`], with no concurrency limit. Each
//! execution fetches its agenda, hands it to the [`ArtifactSink`], records any
//! failure in the run's [`ErrorCollector`] and increments progress exactly
//! once. Failures never cancel siblings. Once every execution has finished,
//! progress is stopped and the collected errors are replayed, sequentially,
//! through an [`ErrorHandler`].

mod report;


use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::collector::ErrorCollector;
use crate::error::{Result, TaskError};
use crate::progress::Progress;
use crate::sink::ArtifactSink;
use crate::types::{RunSummary, Task};

pub use report::{ErrorHandler, Reporter};

/// Drives a run over a fixed set of tasks
///
/// The progress reporter is started and stopped once per run, so a
/// [`TerminalProgress`](crate::progress::TerminalProgress) backs a single run.
pub struct Orchestrator {
    progress: Arc<dyn Progress>,
    sink: Arc<dyn ArtifactSink>,
}

impl Orchestrator {
    /// Create an orchestrator reporting to `progress` and saving through `sink`
    pub fn new(progress: Arc<dyn Progress>, sink: Arc<dyn ArtifactSink>) -> Self {
        Self { progress, sink }
    }

    /// Run every task concurrently and report failures once all have finished
    ///
    /// Task failures are not errors of the run: they are passed to `handler`
    /// after the join. The run fails only when `handler` does, and the first
    /// handler failure stops the replay.
    ///
    /// Cancelling `cancel` makes in-flight network work fail with a
    /// cancellation error, recorded like any other failure. The join is not
    /// shortened: every task still finishes and increments progress.
    pub async fn run<H>(
        &self,
        cancel: &CancellationToken,
        tasks: Vec<Arc<dyn Task>>,
        handler: &mut H,
    ) -> Result<RunSummary>
    where
        H: ErrorHandler + ?Sized,
    {
        let total = tasks.len();
        let collector = Arc::new(ErrorCollector::new());
        tracing::info!(tasks = total, "starting run");
        self.progress.start(total);

        let mut executions = JoinSet::new();
        let mut names = HashMap::with_capacity(total);
        for task in tasks {
            let name = task.name().to_string();
            let handle = executions.spawn(execute(Execution {
                name: name.clone(),
                task,
                sink: Arc::clone(&self.sink),
                progress: Arc::clone(&self.progress),
                collector: Arc::clone(&collector),
                cancel: cancel.clone(),
            }));
            names.insert(handle.id(), name);
        }

        // Join barrier: nothing below runs until every execution is done.
        let mut succeeded = 0;
        while let Some(joined) = executions.join_next_with_id().await {
            match joined {
                Ok((_, true)) => succeeded += 1,
                Ok((_, false)) => {}
                Err(e) => {
                    // The execution died before counting itself.
                    let task = names.remove(&e.id()).unwrap_or_default();
                    tracing::error!(task = %task, error = %e, "task execution was lost");
                    collector.record(TaskError::Panicked {
                        task,
                        message: e.to_string(),
                    });
                    self.progress.increment();
                }
            }
        }
        self.progress.stop().await;

        let summary = RunSummary {
            total,
            succeeded,
            failed: collector.len(),
        };
        let mut cancelled = 0;
        collector.for_each(|err| cancelled += usize::from(err.is_cancelled()));
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled,
            "run finished"
        );

        for err in collector.drain() {
            handler.handle(&err).await?;
        }
        Ok(summary)
    }
}

/// Everything one concurrent execution owns
struct Execution {
    name: String,
    task: Arc<dyn Task>,
    sink: Arc<dyn ArtifactSink>,
    progress: Arc<dyn Progress>,
    collector: Arc<ErrorCollector>,
    cancel: CancellationToken,
}

/// Run one task to completion; returns whether it succeeded
async fn execute(execution: Execution) -> bool {
    let Execution {
        name,
        task,
        sink,
        progress,
        collector,
        cancel,
    } = execution;

    let outcome = AssertUnwindSafe(fetch_and_save(task.as_ref(), sink.as_ref(), &cancel))
        .catch_unwind()
        .await;
    let result = match outcome {
        Ok(result) => result,
        Err(payload) => Err(TaskError::Panicked {
            task: name,
            message: panic_message(payload.as_ref()),
        }),
    };

    let succeeded = result.is_ok();
    collector.record_result(result);
    progress.increment();
    succeeded
}

async fn fetch_and_save(
    task: &dyn Task,
    sink: &dyn ArtifactSink,
    cancel: &CancellationToken,
) -> std::result::Result<(), TaskError> {
    let agenda = task.run(cancel).await?;
    let path = sink
        .persist(cancel, agenda)
        .await
        .map_err(|source| TaskError::Sink {
            task: task.name().to_string(),
            source,
        })?;
    tracing::debug!(task = task.name(), path = %path.display(), "task finished");
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
