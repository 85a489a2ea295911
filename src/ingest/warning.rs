/// Warning feed parsing and classification.
///
/// The JMA prefecture feed (`warning/data/warning/<pref>.json`) reports each
/// area in two places:
///
/// - `areaTypes[].areas[]`: the authoritative per-category status list
///   (`{"code": "15", "status": "発表"}`), which says whether something is in
///   force but not where.
/// - `timeSeries[].areaTypes[].areas[].warnings[].levels[].localAreas[]`:
///   the same categories broken down into named sub-areas (陸上, 海上, bays,
///   straits) with one activity code per forecast slot.
///
/// `classify` cross-checks the two: the status list decides whether wind is
/// issued, the sub-area breakdown decides land versus sea, and the headline
/// text is the last resort when no breakdown is published.

use crate::config::WarningConfig;
use crate::ingest::Fetcher;
use crate::logging::{self, DataSource};
use crate::model::{
    ActivityLevel, AdvisoryResult, SourceError, SubAreaSignal, WarningEntry, WarningStatus,
};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::collections::BTreeSet;

// ============================================================================
// Feed Response Structures
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningFeed {
    #[serde(default)]
    pub report_datetime: Option<String>,
    #[serde(default)]
    pub headline_text: Option<String>,
    #[serde(default)]
    pub area_types: Vec<AreaType>,
    #[serde(default)]
    pub time_series: Vec<TimeSeries>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaType {
    #[serde(default)]
    pub areas: Vec<StatusArea>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusArea {
    pub code: String,
    #[serde(default)]
    pub warnings: Vec<StatusWarning>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusWarning {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    #[serde(default)]
    pub time_defines: Vec<String>,
    #[serde(default)]
    pub area_types: Vec<TimeSeriesAreaType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeSeriesAreaType {
    #[serde(default)]
    pub areas: Vec<TimeSeriesArea>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesArea {
    pub code: String,
    #[serde(default)]
    pub warnings: Vec<TimeSeriesWarning>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesWarning {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub levels: Vec<Level>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    #[serde(default)]
    pub local_areas: Vec<LocalArea>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalArea {
    #[serde(default, alias = "localAreaCode")]
    pub code: Option<String>,
    #[serde(default)]
    pub local_area_name: Option<String>,
    /// One activity code per slot of the enclosing `timeDefines`.
    #[serde(default)]
    pub values: Vec<String>,
}

impl TimeSeries {
    /// Start of the first slot, if `timeDefines` is present and well formed.
    pub fn starts_at(&self) -> Option<DateTime<FixedOffset>> {
        self.time_defines
            .first()
            .and_then(|t| DateTime::parse_from_rfc3339(t.trim()).ok())
    }

    fn has_area(&self, code: &str) -> bool {
        self.area_types
            .iter()
            .flat_map(|at| at.areas.iter())
            .any(|a| a.code == code)
    }
}

impl LocalArea {
    /// Level for the first slot of the enclosing series.
    pub fn current_level(&self) -> ActivityLevel {
        self.values
            .first()
            .map(|v| ActivityLevel::from_code(v))
            .unwrap_or(ActivityLevel::Inactive)
    }
}

pub fn parse_feed(body: &str) -> Result<WarningFeed, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::mismatch("warning feed", e))
}

// ============================================================================
// Feed -> WarningEntry
// ============================================================================

impl WarningFeed {
    fn status_area(&self, code: &str) -> Option<&StatusArea> {
        self.area_types
            .iter()
            .flat_map(|at| at.areas.iter())
            .find(|a| a.code == code)
    }

    /// The series covering `code` whose first slot is earliest, which holds
    /// the current activity. Undated series are used only when no series for
    /// the area carries a parsable `timeDefines`; ties keep feed order.
    pub fn current_series(&self, code: &str) -> Option<&TimeSeries> {
        self.time_series
            .iter()
            .filter(|ts| ts.has_area(code))
            .min_by_key(|ts| {
                let start = ts.starts_at();
                (start.is_none(), start)
            })
    }

    pub fn has_status_area(&self, code: &str) -> bool {
        self.status_area(code).is_some()
    }

    pub fn has_time_series_area(&self, code: &str) -> bool {
        self.time_series.iter().any(|ts| ts.has_area(code))
    }
}

/// Sea if the code is a listed sea area or the name carries a sea keyword.
pub fn is_sea_area(code: Option<&str>, name: &str, config: &WarningConfig) -> bool {
    if let Some(code) = code {
        if config.sea_codes.iter().any(|c| c == code) {
            return true;
        }
    }
    config.sea_keywords.iter().any(|k| name.contains(k.as_str()))
}

/// Status list entries for the target area, in feed order.
pub fn status_entries(feed: &WarningFeed, config: &WarningConfig) -> Vec<WarningEntry> {
    let Some(area) = feed.status_area(&config.area_code) else {
        let err = SourceError::mismatch("warning feed", format!("area {} not in status list", config.area_code));
        logging::log_source_failure(DataSource::Warning, &config.area_code, "status list", &err);
        return Vec::new();
    };

    area.warnings
        .iter()
        .filter_map(|w| {
            let code = w.code.as_deref()?;
            Some(WarningEntry {
                area_code: area.code.clone(),
                category_code: code.to_string(),
                status: WarningStatus::from_feed(w.status.as_deref().unwrap_or("")),
                sub_areas: Vec::new(),
            })
        })
        .collect()
}

/// Wind entries for the sub-area region from the current series, one per
/// category occurrence, each carrying every named sub-area at its current
/// slot. Later forecast series are ignored.
///
/// These entries have no status of their own; `WarningStatus::Other` marks
/// them as breakdown-only.
pub fn sub_area_entries(feed: &WarningFeed, config: &WarningConfig) -> Vec<WarningEntry> {
    let mut entries = Vec::new();
    let Some(series) = feed.current_series(&config.sub_area_region_code) else {
        return entries;
    };
    let areas = series
        .area_types
        .iter()
        .flat_map(|at| at.areas.iter())
        .filter(|a| a.code == config.sub_area_region_code);
    for area in areas {
        for warning in &area.warnings {
            let Some(code) = warning.code.as_deref() else {
                continue;
            };
            if !config.is_wind_code(code) {
                continue;
            }
            let sub_areas = warning
                .levels
                .iter()
                .flat_map(|level| level.local_areas.iter())
                .filter_map(|la| {
                    let name = la.local_area_name.as_deref()?.trim();
                    if name.is_empty() {
                        return None;
                    }
                    Some(SubAreaSignal {
                        sub_area_code: la.code.clone(),
                        sub_area_name: name.to_string(),
                        activity_level: la.current_level(),
                        is_sea: is_sea_area(la.code.as_deref(), name, config),
                    })
                })
                .collect();
            entries.push(WarningEntry {
                area_code: area.code.clone(),
                category_code: code.to_string(),
                status: WarningStatus::Other,
                sub_areas,
            });
        }
    }
    entries
}

// ============================================================================
// Classification
// ============================================================================

/// True if the headline names wind over the region's land.
///
/// Requires a wind term and the region name. A headline that mentions a sea
/// qualifier without any land qualifier is read as sea-only.
pub fn headline_indicates_land_wind(headline: &str, config: &WarningConfig) -> bool {
    let mentions_wind = config.headline_wind_terms.iter().any(|t| headline.contains(t.as_str()));
    if !mentions_wind || !headline.contains(config.region_name.as_str()) {
        return false;
    }
    let sea = config.headline_sea_qualifiers.iter().any(|q| headline.contains(q.as_str()));
    let land = config.headline_land_qualifiers.iter().any(|q| headline.contains(q.as_str()));
    !(sea && !land)
}

/// Derives the dryness and wind signals from a parsed feed.
pub fn classify(feed: &WarningFeed, config: &WarningConfig) -> AdvisoryResult {
    let statuses = status_entries(feed, config);

    let is_dry = statuses
        .iter()
        .any(|e| e.category_code == config.dry_code && e.status.is_active());
    let status_wind = statuses
        .iter()
        .any(|e| config.is_wind_code(&e.category_code) && e.status.is_active());

    let active: Vec<SubAreaSignal> = sub_area_entries(feed, config)
        .into_iter()
        .flat_map(|e| e.sub_areas)
        .filter(|s| s.activity_level >= ActivityLevel::Advisory)
        .collect();

    let wind_locations: BTreeSet<String> = active.iter().map(|s| s.sub_area_name.clone()).collect();

    let (wind_issued, wind_is_land) = if !active.is_empty() {
        let land = active.iter().any(|s| !s.is_sea);
        tracing::debug!(
            land,
            sub_areas = active.len(),
            status_wind,
            "wind land/sea from sub-area breakdown"
        );
        // An active breakdown counts as issued even if the status list lags.
        (true, land)
    } else if status_wind {
        let land = feed
            .headline_text
            .as_deref()
            .map(|h| headline_indicates_land_wind(h, config))
            .unwrap_or(false);
        tracing::debug!(land, "wind land/sea from headline");
        (true, land)
    } else {
        (false, false)
    };

    AdvisoryResult {
        is_dry,
        wind_issued,
        wind_is_land,
        wind_locations,
    }
}

/// Parses and classifies a feed body; any failure gives the all-false default.
pub fn classify_body(body: &str, config: &WarningConfig) -> AdvisoryResult {
    match parse_feed(body) {
        Ok(feed) => classify(&feed, config),
        Err(err) => {
            logging::log_source_failure(DataSource::Warning, &config.area_code, "parse feed", &err);
            AdvisoryResult::default()
        }
    }
}

/// Fetches and classifies the configured feed. Never fails.
pub fn fetch_advisories<F: Fetcher>(fetcher: &F, config: &WarningConfig) -> AdvisoryResult {
    match fetcher.fetch_text(&config.url, "utf-8", config.timeout()) {
        Ok(body) => {
            let result = classify_body(&body, config);
            tracing::info!(
                is_dry = result.is_dry,
                wind_issued = result.wind_issued,
                wind_is_land = result.wind_is_land,
                locations = ?result.wind_locations,
                "advisories"
            );
            result
        }
        Err(err) => {
            logging::log_source_failure(DataSource::Warning, &config.area_code, "fetch feed", &err);
            AdvisoryResult::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
