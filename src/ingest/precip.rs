/// Precipitation totals from the JMA station tables.
///
/// Two extractions:
/// - `confirmed_total` sums the daily confirmed values for the requested
///   days, trying each configured station tier until one yields any day row.
/// - `rolling_total` reads one rolling-window column (e.g. 30-day) from the
///   all-station summary table, locating the column from its header.
///
/// Neither returns an error. A source that cannot answer produces a
/// `PrecipitationResult` with `success == false`, which is not the same as a
/// measured 0.0 mm.

use crate::config::{DailySource, SummarySource};
use crate::ingest::Fetcher;
use crate::ingest::table::{CellValue, RowQuery, Table, parse_cell};
use crate::logging::{self, DataSource};
use crate::model::{DailyPrecipRecord, PrecipitationResult, SourceError};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Label reported when no daily tier produced data.
pub const UNAVAILABLE_LABEL: &str = "取得失敗";

/// Daily table rows carry this class; other rows are headers and notes.
const DAILY_ROW_SELECTOR: &str = "tr.mtx";
const DAILY_CELL_SELECTOR: &str = "td";
const SUMMARY_ROW_SELECTOR: &str = "tr";
const SUMMARY_CELL_SELECTOR: &str = "th, td";

// ---------------------------------------------------------------------------
// Daily confirmed totals
// ---------------------------------------------------------------------------

/// Days found for one tier, keyed by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyExtraction {
    pub records: BTreeMap<NaiveDate, DailyPrecipRecord>,
}

impl DailyExtraction {
    pub fn matched_days(&self) -> usize {
        self.records.len()
    }

    /// Sum over `dates`, counting days without a record as 0.0.
    pub fn total_for(&self, dates: &[NaiveDate]) -> f64 {
        dates
            .iter()
            .filter_map(|d| self.records.get(d))
            .map(|r| r.amount_mm)
            .sum()
    }

    /// Later records for the same date replace earlier ones.
    fn insert(&mut self, record: DailyPrecipRecord) {
        self.records.insert(record.date, record);
    }
}

/// Distinct (year, month) pairs covering `dates`, newest first.
pub fn months_needed(dates: &[NaiveDate]) -> Vec<(i32, u32)> {
    let mut months: Vec<(i32, u32)> = dates.iter().map(|d| (d.year(), d.month())).collect();
    months.sort_unstable_by(|a, b| b.cmp(a));
    months.dedup();
    months
}

/// Decodes the requested days from one month's daily table.
///
/// Only rows whose first cell is the day-of-month and that are long enough
/// to hold `value_column` count as matches.
pub fn extract_month(
    table: &Table,
    year: i32,
    month: u32,
    dates: &[NaiveDate],
    value_column: usize,
    placeholders: &[&str],
    into: &mut DailyExtraction,
) {
    for date in dates.iter().filter(|d| d.year() == year && d.month() == month) {
        let day = date.day().to_string();
        let query = RowQuery::new(0, &day).with_min_cells(value_column + 1);

        for row in table.find_rows(&query) {
            let value = parse_cell(&row[value_column], placeholders);
            if let CellValue::Malformed(err) = &value {
                logging::log_source_failure(DataSource::Daily, &date.to_string(), "decode cell", err);
            }
            tracing::debug!(date = %date, mm = value.mm(), "daily value");
            into.insert(DailyPrecipRecord {
                date: *date,
                amount_mm: value.mm(),
            });
        }
    }
}

/// Fetches and decodes every month one tier needs.
///
/// A month that fails to load is logged and skipped; the extraction may
/// still succeed from the other month.
pub fn extract_daily<F: Fetcher>(
    fetcher: &F,
    source: &DailySource,
    dates: &[NaiveDate],
    placeholders: &[&str],
) -> DailyExtraction {
    let mut extraction = DailyExtraction::default();

    for (year, month) in months_needed(dates) {
        let url = source.url_for(year, month);
        let table = fetcher
            .fetch_text(&url, &source.charset, source.timeout())
            .and_then(|html| Table::parse(&html, DAILY_ROW_SELECTOR, DAILY_CELL_SELECTOR));

        let table = match table {
            Ok(t) if !t.is_empty() => t,
            Ok(_) => {
                let err = SourceError::mismatch(&source.label, format!("no day rows for {}-{:02}", year, month));
                logging::log_source_failure(DataSource::Daily, &source.label, "parse daily table", &err);
                continue;
            }
            Err(err) => {
                logging::log_source_failure(DataSource::Daily, &source.label, "fetch daily table", &err);
                continue;
            }
        };

        extract_month(&table, year, month, dates, source.value_column, placeholders, &mut extraction);
    }
    extraction
}

/// Total over `dates` from the first tier that yields at least one day.
///
/// A tier whose days all read 0.0 still wins: "found, zero" is an answer,
/// "no rows" is not.
pub fn confirmed_total<F: Fetcher>(
    fetcher: &F,
    sources: &[DailySource],
    dates: &[NaiveDate],
    placeholders: &[&str],
) -> PrecipitationResult {
    for (tried, source) in sources.iter().enumerate() {
        let extraction = extract_daily(fetcher, source, dates, placeholders);
        if extraction.matched_days() > 0 {
            logging::log_tier_summary(DataSource::Daily, tried + 1, Some(&source.label));
            let total = extraction.total_for(dates);
            tracing::info!(
                label = %source.label,
                days = extraction.matched_days(),
                total_mm = total,
                "confirmed total"
            );
            return PrecipitationResult::found(total, &source.label);
        }
        let err = SourceError::mismatch(&source.label, "no requested day matched");
        logging::log_source_failure(DataSource::Daily, &source.label, "confirmed total", &err);
    }

    logging::log_tier_summary(DataSource::Daily, sources.len(), None);
    PrecipitationResult::not_found(UNAVAILABLE_LABEL)
}

// ---------------------------------------------------------------------------
// Rolling-window totals
// ---------------------------------------------------------------------------

/// Data column for a window whose header sits at `header_position`.
///
/// The header row lists one cell per window after two label columns, while
/// data rows hold a value/ratio pair per window, hence the doubling.
/// Returns `None` when the header sits inside the label columns.
pub fn window_column(header_position: usize) -> Option<usize> {
    header_position.checked_sub(2).map(|k| k * 2 + 2)
}

/// Reads the configured window total for the configured station.
pub fn rolling_total_from_table(
    table: &Table,
    source: &SummarySource,
    placeholders: &[&str],
) -> Result<f64, SourceError> {
    let column = match table
        .find_header_position(&source.window_label)
        .and_then(|(_, pos)| window_column(pos))
    {
        Some(column) => {
            tracing::debug!(column, "located window header");
            column
        }
        None => {
            let err = SourceError::mismatch(
                &source.label,
                format!("header '{}' not found, using column {}", source.window_label, source.default_column),
            );
            logging::log_source_failure(DataSource::Summary, &source.label, "locate header", &err);
            source.default_column
        }
    };

    let query = RowQuery::new(1, &source.station_label)
        .with_co_label(0, &source.region_label, true)
        .with_min_cells(2);
    let row = table.find_row(&query).ok_or_else(|| {
        SourceError::mismatch(
            &source.label,
            format!("no row for {} / {}", source.region_label, source.station_label),
        )
    })?;

    let cell = row.get(column).ok_or_else(|| {
        SourceError::mismatch(
            &source.label,
            format!("station row has {} cells, column {} requested", row.len(), column),
        )
    })?;

    let value = parse_cell(cell, placeholders);
    if let CellValue::Malformed(err) = &value {
        logging::log_source_failure(DataSource::Summary, &source.label, "decode cell", err);
    }
    Ok(value.mm())
}

/// Fetches the summary table and reads the configured window total.
pub fn rolling_total<F: Fetcher>(
    fetcher: &F,
    source: &SummarySource,
    placeholders: &[&str],
) -> PrecipitationResult {
    let result = fetcher
        .fetch_text(&source.url, &source.charset, source.timeout())
        .and_then(|html| Table::parse(&html, SUMMARY_ROW_SELECTOR, SUMMARY_CELL_SELECTOR))
        .and_then(|table| rolling_total_from_table(&table, source, placeholders));

    match result {
        Ok(total) => {
            tracing::info!(label = %source.label, total_mm = total, "rolling total");
            PrecipitationResult::found(total, &source.label)
        }
        Err(err) => {
            logging::log_source_failure(DataSource::Summary, &source.label, "rolling total", &err);
            PrecipitationResult::not_found(&source.label)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
