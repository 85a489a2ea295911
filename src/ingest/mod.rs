/// Source document retrieval and extraction.
///
/// Submodules:
/// - `table`   — generic HTML table row lookup and cell decoding.
/// - `precip`  — 3-day confirmed and 30-day rolling precipitation totals.
/// - `warning` — warning feed parsing and dryness / wind classification.
///
/// Fetching sits behind the `Fetcher` trait so the extractors can be driven
/// by live HTTP, recorded documents (`crate::replay`), or test fixtures.

pub mod precip;
pub mod table;
pub mod warning;

use crate::model::SourceError;
use std::time::Duration;

/// Browser-like agent; the daily table pages reject some bare clients.
pub const USER_AGENT: &str = "Mozilla/5.0";

/// Retrieves one document as text. One attempt per call, no retries.
pub trait Fetcher {
    /// `charset` decodes the body when the server does not declare one.
    fn fetch_text(&self, url: &str, charset: &str, timeout: Duration) -> Result<String, SourceError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch_text(&self, url: &str, charset: &str, timeout: Duration) -> Result<String, SourceError> {
        (**self).fetch_text(url, charset, timeout)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn fetch_text(&self, url: &str, charset: &str, timeout: Duration) -> Result<String, SourceError> {
        (**self).fetch_text(url, charset, timeout)
    }
}

/// Live fetcher over a blocking reqwest client.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::unavailable("http client", e))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str, charset: &str, timeout: Duration) -> Result<String, SourceError> {
        tracing::debug!(url, "fetching");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| SourceError::unavailable(url, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::unavailable(url, format!("HTTP {}", response.status())));
        }

        response
            .text_with_charset(charset)
            .map_err(|e| SourceError::unavailable(url, format!("failed to read body: {}", e)))
    }
}
