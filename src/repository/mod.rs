// src/repository/mod.rs

//! Remote repository access
//!
//! A repository is a base URL under which the index, its signature, and
//! per-package `{filename}` / `{filename}.sig` artifacts are addressable by
//! simple path concatenation. Fetching is all-or-nothing into memory; any
//! failure is fatal for the artifact and never retried.

pub mod index;

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches remote artifacts fully into memory.
///
/// Implementations must distinguish transport failures from non-success
/// HTTP statuses; both abort the artifact.
pub trait Fetcher: Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Join a repository base URL and an artifact path component
pub fn artifact_url(base: &str, file: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), file)
}

/// HTTP fetcher backed by a blocking reqwest client
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Download(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::Download(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|e| Error::Download(format!("Failed to read response from {}: {}", url, e)))?;

        Ok(bytes.to_vec())
    }
}
