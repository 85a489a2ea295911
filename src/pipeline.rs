//! One judgment run: fetch, extract, classify, decide.
//!
//! The run never fails. Each sub-result has a safe default, and the
//! `success` flags on the precipitation results carry "not found" through to
//! the caller.

use crate::alert;
use crate::config::{MonitorConfig, StationConfig};
use crate::ingest::{Fetcher, precip, warning};
use crate::model::JudgmentResult;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};

/// The station's UTC offset, falling back to UTC for an impossible value.
pub fn station_offset(station: &StationConfig) -> FixedOffset {
    FixedOffset::east_opt(station.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Current time in the station's local calendar.
pub fn station_now(now: DateTime<Utc>, station: &StationConfig) -> DateTime<FixedOffset> {
    now.with_timezone(&station_offset(station))
}

/// Yesterday and the days before it, newest first.
///
/// Only full days are confirmed, so today is never included.
pub fn target_dates(today: NaiveDate, lookback_days: u32) -> Vec<NaiveDate> {
    (1..=i64::from(lookback_days))
        .filter_map(|back| today.checked_sub_signed(Duration::days(back)))
        .collect()
}

/// Runs the whole judgment for `today` (station local date).
pub fn run<F: Fetcher>(fetcher: &F, config: &MonitorConfig, today: NaiveDate) -> JudgmentResult {
    let placeholders = config.placeholder_tokens();
    let dates = target_dates(today, config.station.lookback_days);
    tracing::info!(station = %config.station.name, ?dates, "starting judgment");

    let p3d = precip::confirmed_total(fetcher, &config.precipitation.daily_sources, &dates, &placeholders);
    let p30d = precip::rolling_total(fetcher, &config.precipitation.summary, &placeholders);
    let advisory = warning::fetch_advisories(fetcher, &config.warnings);

    if !p3d.success {
        tracing::error!(
            station = %config.station.name,
            "every daily precipitation source failed; 3-day total is not a measurement"
        );
    }
    if !p30d.success {
        tracing::error!(
            station = %config.station.name,
            "rolling total unavailable; 30-day total is not a measurement"
        );
    }

    let result = alert::judge(p3d, p30d, advisory);
    tracing::info!(level = %result.level, "judgment complete");
    result
}
