//! Post-run error classification and reporting.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{Error, Result, TaskError};

/// Receives each recorded task error, in insertion order, after a run
///
/// Returning an error aborts the rest of the replay and fails the run.
#[async_trait]
pub trait ErrorHandler: Send {
    /// Handle one task error
    async fn handle(&mut self, err: &TaskError) -> Result<()>;
}

#[async_trait]
impl<F> ErrorHandler for F
where
    F: FnMut(&TaskError) -> Result<()> + Send,
{
    async fn handle(&mut self, err: &TaskError) -> Result<()> {
        self(err)
    }
}

/// Default handler: prints task errors and saves pages that could not be understood
///
/// An extraction failure writes the raw page to `<task>-error-content.html` in
/// the output directory so it can be attached to a bug report. Failing to
/// write that file is fatal.
pub struct Reporter<W> {
    out_dir: PathBuf,
    out: W,
}

impl Reporter<std::io::Stdout> {
    /// Report to stdout
    pub fn stdout(out_dir: impl Into<PathBuf>) -> Self {
        Self::new(out_dir, std::io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    /// Report to an arbitrary writer
    pub fn new(out_dir: impl Into<PathBuf>, out: W) -> Self {
        Self {
            out_dir: out_dir.into(),
            out,
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> ErrorHandler for Reporter<W> {
    async fn handle(&mut self, err: &TaskError) -> Result<()> {
        let diagnostic = err.diagnostic_content().zip(err.diagnostic_filename());
        let Some((content, file_name)) = diagnostic else {
            writeln!(self.out, "{err}")?;
            return Ok(());
        };

        let path = self.out_dir.join(file_name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| Error::Report {
                path: path.clone(),
                source,
            })?;
        tracing::warn!(task = err.task(), error = %err, path = %path.display(), "saved unreadable page");
        writeln!(
            self.out,
            "Critical Error. Please file a github issue and attach the {} file.",
            path.display()
        )?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FindError};
    use tempfile::tempdir;

    #[tokio::test]
    async fn plain_errors_are_printed() {
        let dir = tempdir().unwrap();
        let mut reporter = Reporter::new(dir.path(), Vec::new());

        reporter
            .handle(&TaskError::Fetch {
                task: "oakland".into(),
                url: "https://example.com".into(),
                source: FetchError::Status(503),
            })
            .await
            .unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(out, "oakland: get https://example.com: status code 503\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn extraction_failures_write_diagnostic_file() {
        let dir = tempdir().unwrap();
        let mut reporter = Reporter::new(dir.path(), Vec::new());

        reporter
            .handle(&TaskError::Extraction {
                task: "c".into(),
                source: FindError::MissingAttribute("href"),
                content: b"<html>x</html>".to_vec(),
            })
            .await
            .unwrap();

        let diagnostic = dir.path().join("c-error-content.html");
        assert_eq!(std::fs::read(&diagnostic).unwrap(), b"<html>x</html>");
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.starts_with("Critical Error."));
        assert!(out.contains(&diagnostic.display().to_string()));
    }

    #[tokio::test]
    async fn unwritable_diagnostic_is_fatal() {
        let dir = tempdir().unwrap();
        let mut reporter = Reporter::new(dir.path().join("gone"), Vec::new());

        let err = reporter
            .handle(&TaskError::Extraction {
                task: "c".into(),
                source: FindError::NoMeetings,
                content: Vec::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Report { .. }));
        assert!(reporter.into_inner().is_empty());
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let mut seen = Vec::new();
        let mut handler = |err: &TaskError| -> Result<()> {
            seen.push(err.task().to_string());
            Ok(())
        };

        handler
            .handle(&TaskError::Panicked {
                task: "p".into(),
                message: "boom".into(),
            })
            .await
            .unwrap();

        assert_eq!(seen, vec!["p"]);
    }
}
