//! Core types for agenda-get

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Readable body of a fetched document
///
/// Dropping the stream releases the underlying connection or file handle.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// A fetched agenda, ready to be persisted
pub struct Agenda {
    /// Output filename, e.g. `oakland.pdf`
    pub name: String,
    /// Document content
    pub content: ByteStream,
}

impl Agenda {
    /// Wrap an in-memory body, mostly useful for tests and mirrors
    pub fn from_bytes(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: Box::pin(std::io::Cursor::new(content.into())),
        }
    }
}

impl std::fmt::Debug for Agenda {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agenda")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One independently executable unit of work in a run
///
/// Tasks share no mutable state with each other. Network-bound work must watch
/// `cancel` and fail with a cancellation error once it fires.
#[async_trait]
pub trait Task: Send + Sync {
    /// Name used for diagnostics and error reports
    fn name(&self) -> &str;

    /// Produce the task's agenda
    async fn run(&self, cancel: &CancellationToken) -> Result<Agenda, TaskError>;
}

/// Outcome counts of a finished run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks launched
    pub total: usize,
    /// Tasks that produced and saved an agenda
    pub succeeded: usize,
    /// Tasks whose error was recorded
    pub failed: usize,
}

impl RunSummary {
    /// Whether every task succeeded
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
