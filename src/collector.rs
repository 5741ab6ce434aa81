//! Thread-safe, append-only sink for task failures.
//!
//! Tasks record into the collector from any thread while the run is in flight.
//! `for_each` and `try_for_each` replay the recorded errors in insertion
//! order without consuming them, so replaying twice yields the same sequence.
//! After the join barrier the orchestrator drains the collector instead,
//! because its handler awaits between records.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::TaskError;

/// Ordered collection of task failures
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Mutex<Vec<TaskError>>,
}

impl ErrorCollector {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error
    ///
    /// The critical section is a single `Vec::push`.
    pub fn record(&self, err: TaskError) {
        tracing::debug!(task = err.task(), error = %err, "task failed");
        self.lock().push(err);
    }

    /// Append the error of a failed result; successful results are ignored
    pub fn record_result(&self, result: std::result::Result<(), TaskError>) {
        if let Err(err) = result {
            self.record(err);
        }
    }

    /// Number of recorded errors
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Replay every recorded error in insertion order
    ///
    /// The handler cannot stop the iteration.
    pub fn for_each(&self, mut handler: impl FnMut(&TaskError)) {
        for err in self.lock().iter() {
            handler(err);
        }
    }

    /// Replay recorded errors in insertion order until the handler fails
    ///
    /// The first handler error stops the replay and becomes the result.
    pub fn try_for_each<E>(
        &self,
        mut handler: impl FnMut(&TaskError) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        for err in self.lock().iter() {
            handler(err)?;
        }
        Ok(())
    }

    /// Remove and return every recorded error, in insertion order
    ///
    /// Used once a run has joined, when each record is handed to the
    /// post-run handler exactly once.
    pub fn drain(&self) -> Vec<TaskError> {
        std::mem::take(&mut *self.lock())
    }

    // A panic while holding the lock cannot leave the Vec half-written,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<TaskError>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
