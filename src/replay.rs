/// Development mode utilities for working with recorded documents
///
/// When the live JMA pages are unavailable (or a run has to be reproduced
/// exactly), record the fetched documents once with `RecordingFetcher` and
/// replay them later with `ReplayFetcher`.

use crate::ingest::Fetcher;
use crate::model::SourceError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name a recorded URL is stored under.
///
/// Every character outside `[A-Za-z0-9.-]` becomes `_`, so query strings
/// stay distinct but safe as file names.
pub fn snapshot_file_name(url: &str) -> String {
    let stem = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    name.push_str(".snapshot");
    name
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Serves documents from memory or from a snapshot directory.
#[derive(Debug, Clone, Default)]
pub struct ReplayFetcher {
    documents: HashMap<String, String>,
    directory: Option<PathBuf>,
}

impl ReplayFetcher {
    /// In-memory documents keyed by URL.
    pub fn from_documents<I, U, B>(documents: I) -> Self
    where
        I: IntoIterator<Item = (U, B)>,
        U: Into<String>,
        B: Into<String>,
    {
        Self {
            documents: documents
                .into_iter()
                .map(|(url, body)| (url.into(), body.into()))
                .collect(),
            directory: None,
        }
    }

    /// Documents read lazily from files named by `snapshot_file_name`.
    pub fn from_dir(directory: impl Into<PathBuf>) -> Self {
        Self {
            documents: HashMap::new(),
            directory: Some(directory.into()),
        }
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.documents.insert(url.into(), body.into());
    }
}

impl Fetcher for ReplayFetcher {
    fn fetch_text(&self, url: &str, _charset: &str, _timeout: Duration) -> Result<String, SourceError> {
        if let Some(body) = self.documents.get(url) {
            return Ok(body.clone());
        }
        let Some(dir) = &self.directory else {
            return Err(SourceError::unavailable(url, "no recorded document"));
        };
        let path = dir.join(snapshot_file_name(url));
        fs::read_to_string(&path)
            .map_err(|e| SourceError::unavailable(url, format!("no snapshot at {}: {}", path.display(), e)))
    }
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// Passes requests through and saves every successful body.
///
/// A failed save is logged and does not fail the fetch.
pub struct RecordingFetcher<F> {
    inner: F,
    directory: PathBuf,
}

impl<F: Fetcher> RecordingFetcher<F> {
    pub fn new(inner: F, directory: impl Into<PathBuf>) -> std::io::Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { inner, directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl<F: Fetcher> Fetcher for RecordingFetcher<F> {
    fn fetch_text(&self, url: &str, charset: &str, timeout: Duration) -> Result<String, SourceError> {
        let body = self.inner.fetch_text(url, charset, timeout)?;
        let path = self.directory.join(snapshot_file_name(url));
        if let Err(e) = fs::write(&path, &body) {
            tracing::warn!(path = %path.display(), "failed to record snapshot: {e}");
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("firewx-replay-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_snapshot_names_are_distinct_per_query() {
        let a = snapshot_file_name("https://example.invalid/daily.php?year=2025&month=2");
        let b = snapshot_file_name("https://example.invalid/daily.php?year=2025&month=3");
        assert_ne!(a, b);
        assert!(!a.contains('/') && !a.contains('?') && !a.contains('&'));
        assert!(a.ends_with(".snapshot"));
    }

    #[test]
    fn test_unknown_url_is_unavailable() {
        let fetcher = ReplayFetcher::from_documents([("https://a.invalid/", "body")]);
        let err = fetcher
            .fetch_text("https://b.invalid/", "utf-8", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, SourceError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_recorded_documents_replay_identically() {
        let dir = scratch_dir("roundtrip");
        let url = "https://a.invalid/feed.json?x=1";
        let source = ReplayFetcher::from_documents([(url, "{\"headlineText\": \"晴れ\"}")]);

        let recorder = RecordingFetcher::new(source, &dir).unwrap();
        assert_eq!(recorder.directory(), dir.as_path());
        assert!(dir.is_dir(), "recording directory is created up front");
        let live = recorder.fetch_text(url, "utf-8", Duration::from_secs(1)).unwrap();

        let replay = ReplayFetcher::from_dir(&dir);
        let replayed = replay.fetch_text(url, "utf-8", Duration::from_secs(1)).unwrap();
        assert_eq!(live, replayed);

        let _ = fs::remove_dir_all(&dir);
    }
}
