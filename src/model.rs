/// Core data types for the dryness / wind alert service.
///
/// This module defines the shared domain model imported by all other modules:
/// daily rainfall records, extraction results, warning feed entries, and the
/// final judgment. It contains no I/O.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Precipitation types
// ---------------------------------------------------------------------------

/// One day's confirmed rainfall at a station, decoded from a daily table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPrecipRecord {
    pub date: NaiveDate,
    pub amount_mm: f64,
}

/// Outcome of a single precipitation extraction.
///
/// `success == false` means no source produced a matching row. The total is
/// then 0.0 but must not be read as a measured dry spell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecipitationResult {
    pub total_mm: f64,
    pub source_label: String, // station / table that satisfied the query
    pub success: bool,
}

impl PrecipitationResult {
    pub fn found(total_mm: f64, source_label: &str) -> Self {
        Self {
            total_mm,
            source_label: source_label.to_string(),
            success: true,
        }
    }

    pub fn not_found(source_label: &str) -> Self {
        Self {
            total_mm: 0.0,
            source_label: source_label.to_string(),
            success: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Warning feed types
// ---------------------------------------------------------------------------

/// Status attached to one category entry of an area in the warning feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningStatus {
    Issued,     // 発表
    Continuing, // 継続
    Canceled,   // 解除
    Other,
}

impl WarningStatus {
    pub fn from_feed(status: &str) -> Self {
        match status.trim() {
            "発表" => WarningStatus::Issued,
            "継続" => WarningStatus::Continuing,
            "解除" => WarningStatus::Canceled,
            _ => WarningStatus::Other,
        }
    }

    /// Issued or continuing: the notice is currently in force.
    pub fn is_active(self) -> bool {
        matches!(self, WarningStatus::Issued | WarningStatus::Continuing)
    }
}

/// Ordinal hazard level for one sub-area in one time slot.
///
/// Levels in ascending order:
///   inactive < advisory < warning < emergency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ActivityLevel {
    Inactive,
    Advisory,
    Warning,
    Emergency,
}

impl ActivityLevel {
    /// Decodes a feed activity code ("00", "10", "30", "50", ...).
    ///
    /// Codes are two-digit numbers where 10-29 is advisory, 30-49 warning and
    /// 50+ emergency. Anything unparsable counts as inactive.
    pub fn from_code(code: &str) -> Self {
        match code.trim().parse::<u32>() {
            Ok(n) if n >= 50 => ActivityLevel::Emergency,
            Ok(n) if n >= 30 => ActivityLevel::Warning,
            Ok(n) if n >= 10 => ActivityLevel::Advisory,
            _ => ActivityLevel::Inactive,
        }
    }
}

/// A named part of the reporting area with its current hazard level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubAreaSignal {
    pub sub_area_code: Option<String>,
    pub sub_area_name: String,
    pub activity_level: ActivityLevel,
    pub is_sea: bool,
}

/// One category (dry, strong wind, storm, ...) reported for an area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarningEntry {
    pub area_code: String,
    pub category_code: String,
    pub status: WarningStatus,
    pub sub_areas: Vec<SubAreaSignal>,
}

/// Dryness and wind signals derived from the warning feed.
///
/// Invariant: `wind_is_land` implies `wind_issued`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdvisoryResult {
    pub is_dry: bool,
    pub wind_issued: bool,
    pub wind_is_land: bool,
    pub wind_locations: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Judgment types
// ---------------------------------------------------------------------------

/// Final alert level. Numeric values are part of the output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AlertLevel {
    None = 0,
    Caution = 1,
    Alert = 2,
}

impl AlertLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Label used in published records and history.
    pub fn label(self) -> &'static str {
        match self {
            AlertLevel::None => "該当なし",
            AlertLevel::Caution => "注意レベル",
            AlertLevel::Alert => "警報レベル",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {} ({})", self.as_u8(), self.label())
    }
}

/// Everything one run decided, built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgmentResult {
    pub level: AlertLevel,
    pub precipitation: PrecipitationResult,     // 3-day confirmed
    pub precipitation_30d: PrecipitationResult, // 30-day rolling
    pub advisory: AdvisoryResult,
}

impl JudgmentResult {
    /// True when both precipitation totals came from real rows.
    pub fn precipitation_complete(&self) -> bool {
        self.precipitation.success && self.precipitation_30d.success
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or decoding a source document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// Fetch failed, timed out, or returned a non-2xx status.
    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// The document loaded but the expected row, column or node is missing.
    #[error("{source_name} parse mismatch: {detail}")]
    ParseMismatch { source_name: String, detail: String },

    /// A cell could not be reduced to a number.
    #[error("malformed value: {text:?}")]
    MalformedValue { text: String },
}

impl SourceError {
    pub fn unavailable(source_name: &str, reason: impl fmt::Display) -> Self {
        SourceError::SourceUnavailable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn mismatch(source_name: &str, detail: impl fmt::Display) -> Self {
        SourceError::ParseMismatch {
            source_name: source_name.to_string(),
            detail: detail.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_decoding() {
        assert_eq!(WarningStatus::from_feed("発表"), WarningStatus::Issued);
        assert_eq!(WarningStatus::from_feed("継続"), WarningStatus::Continuing);
        assert_eq!(WarningStatus::from_feed("解除"), WarningStatus::Canceled);
        assert_eq!(WarningStatus::from_feed("発表警報・注意報はなし"), WarningStatus::Other);
        assert!(WarningStatus::Issued.is_active());
        assert!(WarningStatus::Continuing.is_active());
        assert!(!WarningStatus::Canceled.is_active());
        assert!(!WarningStatus::Other.is_active());
    }

    #[test]
    fn test_activity_level_ordering() {
        assert!(ActivityLevel::Inactive < ActivityLevel::Advisory);
        assert!(ActivityLevel::Advisory < ActivityLevel::Warning);
        assert!(ActivityLevel::Warning < ActivityLevel::Emergency);
    }

    #[test]
    fn test_activity_level_from_code() {
        assert_eq!(ActivityLevel::from_code("00"), ActivityLevel::Inactive);
        assert_eq!(ActivityLevel::from_code("10"), ActivityLevel::Advisory);
        assert_eq!(ActivityLevel::from_code("20"), ActivityLevel::Advisory);
        assert_eq!(ActivityLevel::from_code("30"), ActivityLevel::Warning);
        assert_eq!(ActivityLevel::from_code("50"), ActivityLevel::Emergency);
        assert_eq!(ActivityLevel::from_code(""), ActivityLevel::Inactive);
        assert_eq!(ActivityLevel::from_code("xx"), ActivityLevel::Inactive);
    }

    #[test]
    fn test_alert_level_labels_and_values() {
        assert_eq!(AlertLevel::None.as_u8(), 0);
        assert_eq!(AlertLevel::Caution.as_u8(), 1);
        assert_eq!(AlertLevel::Alert.as_u8(), 2);
        assert_eq!(AlertLevel::Alert.to_string(), "Level 2 (警報レベル)");
    }

    #[test]
    fn test_not_found_is_distinct_from_measured_zero() {
        let missing = PrecipitationResult::not_found("取得失敗");
        let dry = PrecipitationResult::found(0.0, "八幡");
        assert_eq!(missing.total_mm, dry.total_mm);
        assert_ne!(missing, dry, "a missing total must never compare equal to a measured 0.0");
    }

    #[test]
    fn test_source_error_display() {
        let e = SourceError::unavailable("daily 八幡", "HTTP 503");
        assert_eq!(e.to_string(), "daily 八幡 unavailable: HTTP 503");
        let e = SourceError::mismatch("summary", "no station row");
        assert_eq!(e.to_string(), "summary parse mismatch: no station row");
    }
}
