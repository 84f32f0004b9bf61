//! HTTP download of feed documents.
//!
//! One [`Fetcher`] is built per run so every feed shares the same connection
//! pool. `file://` URLs are read straight from disk, which is handy for feeds
//! generated on the same machine.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::{redirect::Policy, Client, Url};
use thiserror::Error;
use tracing::debug;

use crate::config::HttpConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Couldn't build the HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("Invalid feed url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Couldn't read {}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{url} returned an empty document")]
    Empty { url: String },
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Fetcher { client })
    }

    /// Downloads the document behind `url`. Non-success statuses and empty
    /// bodies are errors.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        let body = if parsed.scheme() == "file" {
            let path =
                parsed.to_file_path().map_err(|_| FetchError::InvalidUrl {
                    url: url.to_owned(),
                    reason: "not a local path".to_owned(),
                })?;
            tokio::fs::read(&path)
                .await
                .map_err(|source| FetchError::File { path, source })?
        } else {
            self.get(parsed, url).await?
        };

        if body.is_empty() {
            return Err(FetchError::Empty {
                url: url.to_owned(),
            });
        }

        debug!(url, bytes = body.len(), "Fetched feed");
        Ok(body)
    }

    async fn get(&self, parsed: Url, url: &str) -> Result<Vec<u8>, FetchError> {
        let request_error = |source| FetchError::Request {
            url: url.to_owned(),
            source,
        };

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(request_error)?;
        Ok(bytes.to_vec())
    }
}
