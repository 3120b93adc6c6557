//! Byte fetching for images and input documents.
//!
//! `http://` and `https://` locations go through a blocking reqwest client
//! (feature `http`); `file://` URLs and anything else are read from the
//! filesystem.

use std::fs;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("html2wordml/", env!("CARGO_PKG_VERSION"));

/// Reads bytes from URLs and paths.
#[derive(Debug, Clone)]
pub struct Fetcher {
    #[cfg(feature = "http")]
    client: reqwest::blocking::Client,
}

impl Fetcher {
    /// Create a fetcher. `timeout` bounds each HTTP request.
    #[cfg_attr(not(feature = "http"), allow(unused_variables))]
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        #[cfg(feature = "http")]
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Fetch {
                location: "HTTP client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            #[cfg(feature = "http")]
            client,
        })
    }

    /// Fetch the bytes at `location`. The error is a human-readable reason.
    pub fn fetch(&self, location: &str) -> std::result::Result<Vec<u8>, String> {
        if is_http(location) {
            return self.fetch_http(location);
        }
        if location.starts_with("file:") {
            let url = Url::parse(location).map_err(|e| e.to_string())?;
            let path = url
                .to_file_path()
                .map_err(|()| "not a local file URL".to_string())?;
            return fs::read(path).map_err(|e| e.to_string());
        }
        fs::read(location).map_err(|e| e.to_string())
    }

    #[cfg(feature = "http")]
    fn fetch_http(&self, location: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self.client.get(location).send().map_err(|e| {
            if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            }
        })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(format!("HTTP {status}"));
        }

        let bytes = response.bytes().map_err(|e| e.to_string())?;
        tracing::trace!(location, bytes = bytes.len(), "fetched");
        Ok(bytes.to_vec())
    }

    #[cfg(not(feature = "http"))]
    fn fetch_http(&self, _location: &str) -> std::result::Result<Vec<u8>, String> {
        Err("HTTP support is not enabled".to_string())
    }
}

fn is_http(location: &str) -> bool {
    let lower = location.get(..8).unwrap_or(location).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Fetch an input document from a URL or path with default settings.
///
/// ```no_run
/// let html = html2wordml::fetch_location("https://example.com/page.html")?;
/// # Ok::<(), html2wordml::Error>(())
/// ```
pub fn fetch_location(location: &str) -> Result<Vec<u8>> {
    Fetcher::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)?
        .fetch(location)
        .map_err(|reason| Error::Fetch {
            location: location.to_string(),
            reason,
        })
}
