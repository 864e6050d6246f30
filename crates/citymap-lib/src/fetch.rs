//! Fetching raw source bytes
//!
//! The ingestor only sees the [`Fetcher`] trait, so tests and offline runs can
//! swap the HTTP client for a directory or an in-memory map.

use crate::{Error, Result};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default User-Agent for HTTP requests
const DEFAULT_USER_AGENT: &str = concat!("citymap/", env!("CARGO_PKG_VERSION"));

/// Retrieves the raw bytes behind a source location
pub trait Fetcher: Send + Sync {
    /// Fetch the full body at `location`
    ///
    /// Any failure (unreachable, non-success status, unreadable body) is
    /// reported as [`Error::FetchFailure`].
    fn fetch(&self, location: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

fn is_absolute_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn fetch_failure(location: &str, reason: impl ToString) -> Error {
    Error::FetchFailure {
        location: location.to_string(),
        reason: reason.to_string(),
    }
}

/// Fetches over HTTP(S); relative locations are joined to a base URL
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| fetch_failure("<client>", format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// The URL a location resolves to
    pub fn resolve(&self, location: &str) -> String {
        if is_absolute_url(location) {
            return location.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let location = location.trim_start_matches('/');
        format!("{base}/{location}")
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let url = self.resolve(location);
        trace!(url = %url, "HTTP GET request starting");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(
                url = %url,
                error = %e,
                is_connect = e.is_connect(),
                is_timeout = e.is_timeout(),
                "HTTP request failed"
            );
            fetch_failure(&url, format!("Request failed: {e}"))
        })?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "HTTP response received");
        if !status.is_success() {
            return Err(fetch_failure(&url, format!("HTTP {status}")));
        }

        let bytes = response.bytes().await.map_err(|e| {
            warn!(url = %url, error = %e, "Failed to read response body");
            fetch_failure(&url, format!("Failed to read response: {e}"))
        })?;
        trace!(url = %url, bytes = bytes.len(), "HTTP response body read");
        Ok(bytes.to_vec())
    }
}

/// Reads locations as paths below a local directory (offline mirror)
#[derive(Clone, Debug)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Fetcher for DirectoryFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if is_absolute_url(location) {
            return Err(fetch_failure(location, "remote URL in offline mode"));
        }
        let path = self.root.join(location.trim_start_matches('/'));
        trace!(path = %path.display(), "Reading source file");
        tokio::fs::read(&path)
            .await
            .map_err(|e| fetch_failure(&path.display().to_string(), e))
    }
}

/// Serves fixed bodies from memory and counts requests
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requests: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(location, body);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.bodies.insert(location.into(), body.into());
    }

    /// Number of fetches issued so far, successful or not
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

impl Fetcher for MemoryFetcher {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.bodies
            .get(location)
            .cloned()
            .ok_or_else(|| fetch_failure(location, "not found"))
    }
}
