//! Error types for agenda-get
//!
//! Two families live here:
//! - [`Error`] is fatal. It covers setup (configuration, output directory) and the
//!   post-run report step, and it decides the process exit code.
//! - [`TaskError`] belongs to exactly one task. Task errors are collected, never
//!   propagated, and replayed once the whole run has finished.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for agenda-get operations
pub type Result<T> = std::result::Result<T, Error>;

/// Suffix appended to a task name to build its diagnostic filename
pub const DIAGNOSTIC_SUFFIX: &str = "-error-content.html";

/// Diagnostic filename for a task: `<task>-error-content.html`
pub fn diagnostic_file_name(task: &str) -> String {
    format!("{task}{DIAGNOSTIC_SUFFIX}")
}

/// Fatal error type for agenda-get
///
/// Returned by setup code before any task runs, and by the report step when a
/// diagnostic payload cannot be persisted.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "progress.interval")
        key: Option<String>,
    },

    /// The output directory could not be cleared or created
    #[error("can't prepare output directory {}: {source}", path.display())]
    OutputDir {
        /// Directory that was being prepared
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// A diagnostic payload could not be written while reporting task errors
    #[error("report finder error: can't write {}: {source}", path.display())]
    Report {
        /// Diagnostic file that could not be written
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be constructed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error on a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, used in structured log fields
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::OutputDir { .. } => "output_dir_error",
            Error::Report { .. } => "report_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}

/// Failure to fetch a remote document
#[derive(Debug, Error)]
pub enum FetchError {
    /// The run was cancelled before the request finished
    #[error("request cancelled")]
    Cancelled,

    /// The server answered with anything other than 200 OK
    #[error("status code {0}")]
    Status(u16),

    /// Transport-level failure
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The response body could not be read
    #[error("read body: {0}")]
    Body(#[from] std::io::Error),
}

/// Failure to locate an agenda link inside a fetched page
#[derive(Debug, Error)]
pub enum FindError {
    /// The expected element or attribute was not present
    #[error("couldn't find {0} attribute")]
    MissingAttribute(&'static str),

    /// The meeting calendar had no rows at all
    #[error("no meetings this month")]
    NoMeetings,

    /// An onclick handler did not contain a quoted URL
    #[error("couldn't parse url from javascript: {0}")]
    UnparsableScript(String),

    /// A CSS selector or regular expression failed to compile
    #[error("invalid pattern {0}")]
    InvalidPattern(String),

    /// The link found on the page is not a usable URL
    #[error("invalid agenda url {url}: {reason}")]
    InvalidUrl {
        /// Link as found on the page
        url: String,
        /// Parser message
        reason: String,
    },
}

/// A failure produced by exactly one task
///
/// The variant is chosen where the failure happens, so the report step never
/// has to inspect an error at runtime to find out whether a diagnostic payload
/// is attached.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Fetching a page or document failed
    #[error("{task}: get {url}: {source}")]
    Fetch {
        /// Task name
        task: String,
        /// URL being fetched
        url: String,
        /// Underlying fetch failure
        source: FetchError,
    },

    /// The agenda link could not be found in the fetched page
    #[error("{task}: {source}")]
    Extraction {
        /// Task name
        task: String,
        /// Why the link could not be found
        source: FindError,
        /// Raw page content, kept for manual triage
        content: Vec<u8>,
    },

    /// The fetched document could not be persisted
    #[error("{task}: save agenda: {source}")]
    Sink {
        /// Task name
        task: String,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// The task panicked
    #[error("{task}: task panicked: {message}")]
    Panicked {
        /// Task name
        task: String,
        /// Panic payload, when it was a string
        message: String,
    },
}

impl TaskError {
    /// Name of the task that produced this error
    pub fn task(&self) -> &str {
        match self {
            TaskError::Fetch { task, .. }
            | TaskError::Extraction { task, .. }
            | TaskError::Sink { task, .. }
            | TaskError::Panicked { task, .. } => task,
        }
    }

    /// Raw page content attached to extraction failures
    pub fn diagnostic_content(&self) -> Option<&[u8]> {
        match self {
            TaskError::Extraction { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Suggested filename for the diagnostic payload, if there is one
    pub fn diagnostic_filename(&self) -> Option<String> {
        self.diagnostic_content()
            .map(|_| diagnostic_file_name(self.task()))
    }

    /// Whether the task failed because the run was cancelled
    pub fn is_cancelled(&self) -> bool {
        match self {
            TaskError::Fetch {
                source: FetchError::Cancelled,
                ..
            } => true,
            TaskError::Sink { source, .. } => source.kind() == std::io::ErrorKind::Interrupted,
            _ => false,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_error_carries_diagnostic() {
        let err = TaskError::Extraction {
            task: "fresno".into(),
            source: FindError::NoMeetings,
            content: b"<html>x</html>".to_vec(),
        };

        assert_eq!(err.task(), "fresno");
        assert_eq!(err.diagnostic_content(), Some(&b"<html>x</html>"[..]));
        assert_eq!(
            err.diagnostic_filename().as_deref(),
            Some("fresno-error-content.html")
        );
        assert_eq!(err.to_string(), "fresno: no meetings this month");
    }

    #[test]
    fn plain_errors_have_no_diagnostic() {
        let errors = vec![
            TaskError::Fetch {
                task: "oakland".into(),
                url: "https://example.com".into(),
                source: FetchError::Status(503),
            },
            TaskError::Sink {
                task: "oakland".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            },
            TaskError::Panicked {
                task: "oakland".into(),
                message: "boom".into(),
            },
        ];

        for err in &errors {
            assert_eq!(err.task(), "oakland");
            assert!(err.diagnostic_content().is_none());
            assert!(err.diagnostic_filename().is_none());
        }
        assert_eq!(
            errors[0].to_string(),
            "oakland: get https://example.com: status code 503"
        );
    }

    #[test]
    fn cancellation_is_detected() {
        let fetch = TaskError::Fetch {
            task: "a".into(),
            url: "u".into(),
            source: FetchError::Cancelled,
        };
        let sink = TaskError::Sink {
            task: "a".into(),
            source: std::io::Error::new(std::io::ErrorKind::Interrupted, "cancelled"),
        };
        let status = TaskError::Fetch {
            task: "a".into(),
            url: "u".into(),
            source: FetchError::Status(404),
        };

        assert!(fetch.is_cancelled());
        assert!(sink.is_cancelled());
        assert!(!status.is_cancelled());
    }

    #[test]
    fn fatal_error_codes() {
        let cases = vec![
            (Error::config("sites", "unknown site"), "config_error"),
            (
                Error::OutputDir {
                    path: "/tmp/x".into(),
                    source: std::io::Error::other("nope"),
                },
                "output_dir_error",
            ),
            (
                Error::Report {
                    path: "/tmp/x".into(),
                    source: std::io::Error::other("nope"),
                },
                "report_error",
            ),
            (Error::Io(std::io::Error::other("nope")), "io_error"),
        ];

        for (err, code) in cases {
            assert_eq!(err.error_code(), code, "wrong code for {err}");
        }
    }
}
