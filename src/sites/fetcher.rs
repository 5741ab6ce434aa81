//! HTTP document fetching with cooperative cancellation.

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::config::HttpConfig;
use crate::error::FetchError;
use crate::types::ByteStream;

/// Source of remote documents
///
/// Every await inside an implementation must race `cancel`, so a cancelled
/// run fails fast with [`FetchError::Cancelled`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Open `url` as a byte stream
    async fn open(&self, cancel: &CancellationToken, url: &str) -> Result<ByteStream, FetchError>;

    /// Read the whole document at `url` into memory
    async fn fetch_bytes(
        &self,
        cancel: &CancellationToken,
        url: &str,
    ) -> Result<Vec<u8>, FetchError> {
        let mut body = self.open(cancel, url).await?;
        let mut page = Vec::new();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = body.read_to_end(&mut page) => result.map_err(FetchError::Body),
        };
        read.map(|_| page)
    }
}

/// [`Fetcher`] backed by a reqwest client
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the configured user agent and timeout
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &HttpConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn open(&self, cancel: &CancellationToken, url: &str) -> Result<ByteStream, FetchError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = self.client.get(url).send() => result?,
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::debug!(url, status = status.as_u16(), "unexpected response status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(StreamReader::new(body)))
    }
}
