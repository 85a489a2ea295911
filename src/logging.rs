/// Structured logging for the alert service
///
/// Every record is tagged with the document family it concerns and, when
/// relevant, the station or area label. Source failures are classified so
/// that expected gaps (a blank cell) stay quiet while outages are loud.

use crate::model::SourceError;
use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Daily confirmed precipitation tables
    Daily,
    /// Rolling-window summary table
    Summary,
    /// Warning / advisory feed
    Warning,
    /// Published records and history
    Output,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Daily => write!(f, "DAILY"),
            DataSource::Summary => write!(f, "SUMMARY"),
            DataSource::Warning => write!(f, "WARN"),
            DataSource::Output => write!(f, "OUT"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - a placeholder or garbled cell in an otherwise good table
    Expected,
    /// Unexpected failure - the source is down or unreachable
    Unexpected,
    /// Unknown - the document loaded but its layout did not match
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

pub fn classify_failure(err: &SourceError) -> FailureType {
    match err {
        SourceError::MalformedValue { .. } => FailureType::Expected,
        SourceError::SourceUnavailable { .. } => FailureType::Unexpected,
        SourceError::ParseMismatch { .. } => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI verbosity level.
///
/// Mapping:
/// - 0 (none) -> warn
/// - 1 (-v)   -> info
/// - 2 (-vv)  -> debug
/// - 3+ (-vvv)-> trace
///
/// `RUST_LOG` overrides the flag if set. With `log_file`, records are
/// appended to that file instead of stderr.
pub fn init(verbosity: u8, log_file: Option<&Path>) -> std::io::Result<()> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("firewx_service={level},firewx={level}")));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a source failure at the level its classification calls for.
pub fn log_source_failure(source: DataSource, label: &str, operation: &str, err: &SourceError) {
    let failure_type = classify_failure(err);
    match failure_type {
        FailureType::Expected => {
            tracing::debug!(source = %source, label, failure = %failure_type, "{operation}: {err}")
        }
        FailureType::Unexpected => {
            tracing::error!(source = %source, label, failure = %failure_type, "{operation}: {err}")
        }
        FailureType::Unknown => {
            tracing::warn!(source = %source, label, failure = %failure_type, "{operation}: {err}")
        }
    }
}

/// Log how many precipitation tiers were tried before one answered.
pub fn log_tier_summary(source: DataSource, tried: usize, winner: Option<&str>) {
    match winner {
        Some(label) if tried == 1 => tracing::info!(source = %source, label, "primary source answered"),
        Some(label) => tracing::warn!(source = %source, label, tried, "answered by fallback source"),
        None => tracing::error!(source = %source, tried, "no source produced data"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        let down = SourceError::unavailable("daily", "timeout");
        assert_eq!(classify_failure(&down), FailureType::Unexpected);

        let layout = SourceError::mismatch("summary", "header not found");
        assert_eq!(classify_failure(&layout), FailureType::Unknown);

        let cell = SourceError::MalformedValue { text: "1.2.3".into() };
        assert_eq!(classify_failure(&cell), FailureType::Expected);
    }

    #[test]
    fn test_data_source_tags() {
        assert_eq!(DataSource::Daily.to_string(), "DAILY");
        assert_eq!(DataSource::Warning.to_string(), "WARN");
        assert_eq!(FailureType::Unknown.to_string(), "UNKNOWN");
    }
}
