//! Data Source Verification Module
//!
//! Checks the configured sources against what they actually serve: does each
//! daily tier expose day rows this month, can the summary table locate the
//! window header and station row, does the warning feed contain the target
//! areas. Run before changing station or area codes in `monitor.toml`.

use crate::config::{DailySource, MonitorConfig, SummarySource, WarningConfig};
use crate::ingest::Fetcher;
use crate::ingest::precip;
use crate::ingest::table::{RowQuery, Table};
use crate::ingest::warning;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub checked_month: String,
    pub daily_results: Vec<DailyVerification>,
    pub summary_result: SummaryVerification,
    pub warning_result: WarningVerification,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub partial: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyVerification {
    pub label: String,
    pub url: String,
    pub status: VerificationStatus,
    pub page_loaded: bool,
    pub day_rows: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryVerification {
    pub label: String,
    pub status: VerificationStatus,
    pub page_loaded: bool,
    pub header_found: bool,
    pub station_row_found: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarningVerification {
    pub status: VerificationStatus,
    pub feed_parsed: bool,
    pub area_found: bool,
    pub sub_area_region_found: bool,
    pub headline_present: bool,
    pub report_datetime: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Individual checks
// ============================================================================

pub fn verify_daily_source<F: Fetcher>(fetcher: &F, source: &DailySource, month: NaiveDate) -> DailyVerification {
    let url = source.url_for(month.year(), month.month());
    let mut result = DailyVerification {
        label: source.label.clone(),
        url: url.clone(),
        status: VerificationStatus::Failed,
        page_loaded: false,
        day_rows: 0,
        error_message: None,
    };

    let html = match fetcher.fetch_text(&url, &source.charset, source.timeout()) {
        Ok(html) => html,
        Err(e) => {
            result.error_message = Some(e.to_string());
            return result;
        }
    };
    result.page_loaded = true;

    match Table::parse(&html, "tr.mtx", "td") {
        Ok(table) => {
            result.day_rows = table
                .rows()
                .iter()
                .filter(|row| row.len() > source.value_column)
                .filter(|row| row.first().is_some_and(|c| !c.is_empty() && c.chars().all(|ch| ch.is_ascii_digit())))
                .count();
        }
        Err(e) => result.error_message = Some(e.to_string()),
    }

    result.status = if result.day_rows > 0 {
        VerificationStatus::Success
    } else {
        VerificationStatus::PartialSuccess
    };
    result
}

pub fn verify_summary_source<F: Fetcher>(fetcher: &F, source: &SummarySource) -> SummaryVerification {
    let mut result = SummaryVerification {
        label: source.label.clone(),
        status: VerificationStatus::Failed,
        page_loaded: false,
        header_found: false,
        station_row_found: false,
        error_message: None,
    };

    let table = match fetcher
        .fetch_text(&source.url, &source.charset, source.timeout())
        .and_then(|html| Table::parse(&html, "tr", "th, td"))
    {
        Ok(table) => table,
        Err(e) => {
            result.error_message = Some(e.to_string());
            return result;
        }
    };
    result.page_loaded = true;
    result.header_found = table
        .find_header_position(&source.window_label)
        .and_then(|(_, pos)| precip::window_column(pos))
        .is_some();

    let query = RowQuery::new(1, &source.station_label)
        .with_co_label(0, &source.region_label, true)
        .with_min_cells(2);
    result.station_row_found = table.find_row(&query).is_some();

    result.status = match (result.header_found, result.station_row_found) {
        (true, true) => VerificationStatus::Success,
        (false, true) => VerificationStatus::PartialSuccess,
        _ => VerificationStatus::Failed,
    };
    if !result.station_row_found {
        result.error_message = Some(format!(
            "no row for {} / {}",
            source.region_label, source.station_label
        ));
    }
    result
}

pub fn verify_warning_feed<F: Fetcher>(fetcher: &F, config: &WarningConfig) -> WarningVerification {
    let mut result = WarningVerification {
        status: VerificationStatus::Failed,
        feed_parsed: false,
        area_found: false,
        sub_area_region_found: false,
        headline_present: false,
        report_datetime: None,
        error_message: None,
    };

    let feed = match fetcher
        .fetch_text(&config.url, "utf-8", config.timeout())
        .and_then(|body| warning::parse_feed(&body))
    {
        Ok(feed) => feed,
        Err(e) => {
            result.error_message = Some(e.to_string());
            return result;
        }
    };

    result.feed_parsed = true;
    result.area_found = feed.has_status_area(&config.area_code);
    result.sub_area_region_found = feed.has_time_series_area(&config.sub_area_region_code);
    result.headline_present = feed.headline_text.as_deref().is_some_and(|h| !h.trim().is_empty());
    result.report_datetime = feed.report_datetime.clone();

    result.status = match (result.area_found, result.sub_area_region_found) {
        (true, true) => VerificationStatus::Success,
        (true, false) => VerificationStatus::PartialSuccess,
        _ => VerificationStatus::Failed,
    };
    result
}

// ============================================================================
// Full report
// ============================================================================

pub fn verify_sources<F: Fetcher>(fetcher: &F, config: &MonitorConfig, today: NaiveDate) -> VerificationReport {
    let daily_results: Vec<_> = config
        .precipitation
        .daily_sources
        .iter()
        .map(|s| verify_daily_source(fetcher, s, today))
        .collect();
    let summary_result = verify_summary_source(fetcher, &config.precipitation.summary);
    let warning_result = verify_warning_feed(fetcher, &config.warnings);

    let statuses: Vec<VerificationStatus> = daily_results
        .iter()
        .map(|d| d.status)
        .chain([summary_result.status, warning_result.status])
        .collect();
    let count = |s: VerificationStatus| statuses.iter().filter(|x| **x == s).count();
    let summary = VerificationSummary {
        total: statuses.len(),
        working: count(VerificationStatus::Success),
        partial: count(VerificationStatus::PartialSuccess),
        failed: count(VerificationStatus::Failed),
    };

    VerificationReport {
        checked_month: today.format("%Y-%m").to_string(),
        daily_results,
        summary_result,
        warning_result,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplayFetcher;

    fn config() -> MonitorConfig {
        MonitorConfig::builtin().unwrap()
    }

    #[test]
    fn test_everything_unreachable_fails() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 13).unwrap();
        let report = verify_sources(&ReplayFetcher::default(), &config(), today);
        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.failed, 4);
        assert!(report.daily_results.iter().all(|d| !d.page_loaded));
        assert_eq!(report.checked_month, "2025-05");
    }

    #[test]
    fn test_daily_page_without_rows_is_partial() {
        let config = config();
        let source = &config.precipitation.daily_sources[0];
        let today = NaiveDate::from_ymd_opt(2025, 5, 13).unwrap();
        let fetcher = ReplayFetcher::from_documents([(source.url_for(2025, 5), "<html></html>")]);
        let result = verify_daily_source(&fetcher, source, today);
        assert!(result.page_loaded);
        assert_eq!(result.day_rows, 0);
        assert_eq!(result.status, VerificationStatus::PartialSuccess);
    }

    #[test]
    fn test_summary_table_with_header_and_station_row() {
        let config = config();
        let source = &config.precipitation.summary;
        let html = include_str!("../tests/fixtures/summary_pre00.html");
        let fetcher = ReplayFetcher::from_documents([(source.url.clone(), html)]);

        let result = verify_summary_source(&fetcher, source);
        assert!(result.page_loaded);
        assert!(result.header_found, "前30日間合計 header should be located");
        assert!(result.station_row_found, "carried-forward 福岡県 / 八幡 row should match");
        assert_eq!(result.status, VerificationStatus::Success);
        assert!(result.error_message.is_none());
    }

    #[test]
    fn test_summary_table_without_station_row_fails() {
        let config = config();
        let source = &config.precipitation.summary;
        let html = "<table><tr><th>府県</th><th>地点</th><th>前30日間合計</th></tr>\
                    <tr><td>京都府</td><td>八幡</td><td>95.0</td></tr></table>";
        let fetcher = ReplayFetcher::from_documents([(source.url.clone(), html)]);

        let result = verify_summary_source(&fetcher, source);
        assert!(result.header_found);
        assert!(!result.station_row_found);
        assert_eq!(result.status, VerificationStatus::Failed);
    }

    #[test]
    fn test_warning_feed_area_checks() {
        let config = config();
        let body = r#"{"headlineText": "", "areaTypes": [{"areas": [{"code": "4010100", "warnings": []}]}]}"#;
        let fetcher = ReplayFetcher::from_documents([(config.warnings.url.clone(), body)]);
        let result = verify_warning_feed(&fetcher, &config.warnings);
        assert!(result.feed_parsed);
        assert!(result.area_found);
        assert!(!result.sub_area_region_found);
        assert!(!result.headline_present);
        assert_eq!(result.status, VerificationStatus::PartialSuccess);
    }
}
