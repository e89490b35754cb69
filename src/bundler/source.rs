use std::{path::Path, time::Duration};

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    Client,
};
use tokio::fs;

use super::error::{BundleError, BundleResult};

pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/**
    Read and write access to text files.
*/
#[async_trait]
pub trait FileSystem: Send + Sync {
    /**
        Reads the file at the given path.

        Fails with [`BundleError::NotFound`] if there is no file at the path.
    */
    async fn read_text(&self, path: &Path) -> BundleResult<String>;

    async fn write_text(&self, path: &Path, contents: &str) -> BundleResult<()>;
}

/**
    Download access for remote modules.
*/
#[async_trait]
pub trait Fetcher: Send + Sync {
    /**
        Downloads the body at the given url as text.

        Any transport failure, including a non-success
        status code, is a [`BundleError::Transport`].
        Requests are never retried.
    */
    async fn fetch_text(&self, url: &str) -> BundleResult<String>;
}

/**
    The real filesystem.
*/
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

#[async_trait]
impl FileSystem for DiskFileSystem {
    async fn read_text(&self, path: &Path) -> BundleResult<String> {
        fs::read_to_string(path)
            .await
            .map_err(|e| BundleError::from_io(path, e))
    }

    async fn write_text(&self, path: &Path, contents: &str) -> BundleResult<()> {
        fs::write(path, contents)
            .await
            .map_err(|source| BundleError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

/**
    Fetches modules over http(s) using a shared [`reqwest::Client`].
*/
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /**
        Creates a new fetcher sending the given user agent.

        Requests have no timeout unless one is given,
        in which case it applies to each request as a whole.
    */
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, value);
        }
        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> BundleResult<String> {
        tracing::debug!(url, "sending request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BundleError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BundleError::transport(
                url,
                format!(
                    "server responded with {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("?")
                ),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| BundleError::transport(url, e))
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[tokio::test]
    async fn disk_read_of_missing_file_is_not_found() {
        let path = env::temp_dir().join("rbx-bundler-definitely-missing.lua");
        let err = DiskFileSystem.read_text(&path).await.unwrap_err();
        assert!(matches!(err, BundleError::NotFound { .. }));
    }

    #[test]
    fn fetcher_builds_with_and_without_timeout() {
        assert!(HttpFetcher::new(DEFAULT_USER_AGENT, None).is_ok());
        assert!(HttpFetcher::new(DEFAULT_USER_AGENT, Some(Duration::from_secs(5))).is_ok());
    }
}
