//! Persisting fetched agendas and preparing the output directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::types::Agenda;

/// Name of the output directory created under the user's home
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "agendas";

/// Destination for fetched agendas
///
/// Implementations own the agenda's stream and must drop it on every path.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Persist the agenda, returning where it was stored
    async fn persist(
        &self,
        cancel: &CancellationToken,
        agenda: Agenda,
    ) -> std::io::Result<PathBuf>;
}

/// Writes each agenda to a file in a single directory
#[derive(Clone, Debug)]
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    /// Create a sink writing into `dir`, which must already exist
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn target(&self, name: &str) -> std::io::Result<PathBuf> {
        let is_plain = Path::new(name).file_name().is_some_and(|f| f == name);
        if !is_plain {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("agenda name {name:?} is not a plain file name"),
            ));
        }
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl ArtifactSink for DirSink {
    async fn persist(
        &self,
        cancel: &CancellationToken,
        agenda: Agenda,
    ) -> std::io::Result<PathBuf> {
        let Agenda { name, mut content } = agenda;
        let path = self.target(&name)?;

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| std::io::Error::new(e.kind(), format!("create output: {e}")))?;

        let copied = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(std::io::Error::new(
                ErrorKind::Interrupted,
                "cancelled while writing output",
            )),
            result = tokio::io::copy(&mut content, &mut file) => result,
        };
        let written = match copied {
            Ok(bytes) => file.flush().await.map(|()| bytes),
            Err(e) => Err(e),
        };

        match written {
            Ok(bytes) => {
                tracing::debug!(path = %path.display(), bytes, "agenda saved");
                Ok(path)
            }
            Err(e) => {
                drop(file);
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(
                        path = %path.display(),
                        error = %remove_err,
                        "failed to remove partial output"
                    );
                }
                Err(std::io::Error::new(e.kind(), format!("write output: {e}")))
            }
        }
    }
}

/// `$HOME/agendas`
pub fn default_output_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_OUTPUT_DIR_NAME))
        .ok_or_else(|| Error::config("output.dir", "can't determine the home directory"))
}

/// Make sure `dir` exists, clearing previous contents first when `clear` is set
pub async fn prepare_output_dir(dir: &Path, clear: bool) -> Result<()> {
    let to_setup_err = |source| Error::OutputDir {
        path: dir.to_path_buf(),
        source,
    };

    if clear {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => tracing::debug!(path = %dir.display(), "cleared output directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(to_setup_err(e)),
        }
    }
    tokio::fs::create_dir_all(dir).await.map_err(to_setup_err)
}
