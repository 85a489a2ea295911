//! Published records.
//!
//! Renders a `JudgmentResult` into the record the dashboard reads
//! (`data.json` plus a `data.js` wrapper), appends one row to the CSV history,
//! and re-exports the whole history as JSON for the chart.

use crate::model::JudgmentResult;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("output I/O error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("history CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Output record
// ---------------------------------------------------------------------------

const UNAVAILABLE_NOTE: &str = "取得失敗";

/// Appended to `notes` when either total is missing.
pub const INCOMPLETE_NOTE: &str = " [欠測あり: 判定は参考値]";

/// The dashboard record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub updated_at: String,
    pub level: u8,
    pub result_text: String,
    pub p3d: f64,
    pub p30d: f64,
    pub is_dry: bool,
    /// Wind advisory over land; the only wind signal the level uses.
    pub is_strong_wind: bool,
    pub wind_issued: bool,
    pub wind_locations: Vec<String>,
    pub p3d_source: String,
    pub p3d_found: bool,
    pub p30d_found: bool,
    pub notes: String,
}

impl OutputRecord {
    pub fn from_judgment(result: &JudgmentResult, now: DateTime<FixedOffset>) -> Self {
        let p3 = &result.precipitation;
        let p30 = &result.precipitation_30d;
        let p3_note = if p3.success {
            format!("{}確定値", p3.source_label)
        } else {
            UNAVAILABLE_NOTE.to_string()
        };
        let p30_note = if p30.success {
            format!("確定値({})", p30.source_label)
        } else {
            UNAVAILABLE_NOTE.to_string()
        };
        let mut notes = format!("前3日={}, 前30日={}", p3_note, p30_note);
        if !result.precipitation_complete() {
            // Missing totals enter the table as 0.0, so the level is not a measurement.
            notes.push_str(INCOMPLETE_NOTE);
        }
        Self {
            updated_at: now.format("%Y-%m-%d %H:%M").to_string(),
            level: result.level.as_u8(),
            result_text: result.level.label().to_string(),
            p3d: p3.total_mm,
            p30d: p30.total_mm,
            is_dry: result.advisory.is_dry,
            is_strong_wind: result.advisory.wind_is_land,
            wind_issued: result.advisory.wind_issued,
            wind_locations: result.advisory.wind_locations.iter().cloned().collect(),
            p3d_source: p3.source_label.clone(),
            p3d_found: p3.success,
            p30d_found: p30.success,
            notes,
        }
    }

    pub fn to_json(&self) -> Result<String, OutputError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).map_err(io_error(parent)),
        _ => Ok(()),
    }
}

/// Writes `data.json` at `path` and `data.js` beside it.
pub fn write_record(record: &OutputRecord, path: &Path) -> Result<(), OutputError> {
    ensure_parent(path)?;
    let json = record.to_json()?;
    fs::write(path, &json).map_err(io_error(path))?;

    let js_path = path.with_file_name("data.js");
    fs::write(&js_path, format!("window.WEATHER_DATA = {};", json)).map_err(io_error(&js_path))?;
    tracing::info!(path = %path.display(), "wrote record");
    Ok(())
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One history line, as written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub date: String,
    pub time: String,
    pub level: u8,
    pub p3d: f64,
    pub p30d: f64,
    pub is_dry: bool,
    pub is_strong_wind: bool,
    pub result_text: String,
    pub source: String,
}

impl HistoryRow {
    pub fn from_record(record: &OutputRecord, now: DateTime<FixedOffset>) -> Self {
        Self {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M").to_string(),
            level: record.level,
            p3d: record.p3d,
            p30d: record.p30d,
            is_dry: record.is_dry,
            is_strong_wind: record.is_strong_wind,
            result_text: record.result_text.clone(),
            source: record.p3d_source.clone(),
        }
    }
}

/// Appends `row`, writing the header only when the file is new or empty.
pub fn append_history(row: &HistoryRow, path: &Path) -> Result<(), OutputError> {
    ensure_parent(path)?;
    let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error(path))?;

    let mut writer = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
    writer.serialize(row)?;
    writer.flush().map_err(io_error(path))?;
    Ok(())
}

/// A history line as read back; every field is optional text.
#[derive(Debug, Deserialize)]
struct RawHistoryRow {
    date: Option<String>,
    time: Option<String>,
    level: Option<String>,
    p3d: Option<String>,
    p30d: Option<String>,
    is_dry: Option<String>,
    is_strong_wind: Option<String>,
    result_text: Option<String>,
    source: Option<String>,
}

/// A history line for the chart, with lenient coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub date: String,
    pub time: String,
    pub level: u8,
    pub p3d: f64,
    pub p30d: f64,
    pub is_dry: bool,
    pub is_strong_wind: bool,
    pub result_text: String,
    pub source: String,
}

fn truthy(value: Option<&str>) -> bool {
    value.map(|v| v.trim().eq_ignore_ascii_case("true")).unwrap_or(false)
}

impl From<RawHistoryRow> for HistoryEntry {
    fn from(raw: RawHistoryRow) -> Self {
        let number = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<f64>().ok()).unwrap_or(0.0);
        Self {
            date: raw.date.clone().unwrap_or_default(),
            time: raw.time.clone().unwrap_or_default(),
            level: raw.level.as_deref().and_then(|s| s.trim().parse().ok()).unwrap_or(0),
            p3d: number(&raw.p3d),
            p30d: number(&raw.p30d),
            is_dry: truthy(raw.is_dry.as_deref()),
            is_strong_wind: truthy(raw.is_strong_wind.as_deref()),
            result_text: raw.result_text.unwrap_or_default(),
            source: raw.source.unwrap_or_default(),
        }
    }
}

/// Reads the CSV history. A missing file is an empty history.
pub fn read_history(path: &Path) -> Result<Vec<HistoryEntry>, OutputError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut entries = Vec::new();
    for row in reader.deserialize::<RawHistoryRow>() {
        match row {
            Ok(raw) => entries.push(HistoryEntry::from(raw)),
            Err(e) => tracing::warn!(path = %path.display(), "skipping history row: {e}"),
        }
    }
    Ok(entries)
}

/// Re-exports the full CSV history as a JSON array. Returns the row count.
pub fn export_history_json(history_csv: &Path, json_path: &Path) -> Result<usize, OutputError> {
    let entries = read_history(history_csv)?;
    ensure_parent(json_path)?;
    let mut file = fs::File::create(json_path).map_err(io_error(json_path))?;
    serde_json::to_writer_pretty(&mut file, &entries)?;
    file.flush().map_err(io_error(json_path))?;
    tracing::info!(rows = entries.len(), path = %json_path.display(), "exported history");
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::judge;
    use crate::model::{AdvisoryResult, PrecipitationResult};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn fixed_now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 5, 13, 7, 30, 0)
            .unwrap()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("firewx-report-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_record() -> OutputRecord {
        let mut advisory = AdvisoryResult {
            wind_issued: true,
            wind_is_land: true,
            ..AdvisoryResult::default()
        };
        advisory.wind_locations.insert("陸上".to_string());
        let result = judge(
            PrecipitationResult::found(0.5, "八幡"),
            PrecipitationResult::found(12.0, "八幡"),
            advisory,
        );
        OutputRecord::from_judgment(&result, fixed_now())
    }

    #[test]
    fn test_record_fields() {
        let record = sample_record();
        assert_eq!(record.updated_at, "2025-05-13 07:30");
        assert_eq!(record.level, 2);
        assert_eq!(record.result_text, "警報レベル");
        assert!(record.is_strong_wind);
        assert_eq!(record.wind_locations, vec!["陸上".to_string()]);
        assert_eq!(record.notes, "前3日=八幡確定値, 前30日=確定値(八幡)");
    }

    #[test]
    fn test_missing_thirty_day_is_noted() {
        let result = judge(
            PrecipitationResult::found(0.5, "八幡"),
            PrecipitationResult::not_found("八幡"),
            AdvisoryResult::default(),
        );
        let record = OutputRecord::from_judgment(&result, fixed_now());
        assert!(!record.p30d_found);
        assert!(record.notes.contains("前30日=取得失敗"), "got {}", record.notes);
        assert!(record.notes.ends_with(INCOMPLETE_NOTE), "got {}", record.notes);
    }

    #[test]
    fn test_all_sources_missing_is_flagged_not_presented_as_dry() {
        let result = judge(
            PrecipitationResult::not_found("取得失敗"),
            PrecipitationResult::not_found("八幡"),
            AdvisoryResult::default(),
        );
        let record = OutputRecord::from_judgment(&result, fixed_now());
        assert_eq!(record.level, 1, "0.0 totals still satisfy the dry rule");
        assert!(!record.p3d_found);
        assert_eq!(record.notes, format!("前3日=取得失敗, 前30日=取得失敗{}", INCOMPLETE_NOTE));
    }

    #[test]
    fn test_complete_record_has_no_incomplete_marker() {
        assert!(!sample_record().notes.contains(INCOMPLETE_NOTE));
    }

    #[test]
    fn test_record_writes_json_and_js() {
        let dir = scratch_dir("record");
        let path = dir.join("docs").join("data.json");
        write_record(&sample_record(), &path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["level"], 2);
        let js = fs::read_to_string(dir.join("docs").join("data.js")).unwrap();
        assert!(js.starts_with("window.WEATHER_DATA = {"));
        assert!(js.ends_with("};"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_history_header_written_once() {
        let dir = scratch_dir("history");
        let path = dir.join("history.csv");
        let row = HistoryRow::from_record(&sample_record(), fixed_now());
        append_history(&row, &path).unwrap();
        append_history(&row, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "date,time,level,p3d,p30d,is_dry,is_strong_wind,result_text,source");
        assert!(lines[1].starts_with("2025-05-13,07:30,2,0.5,12.0,false,true,"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_history_export_coerces_legacy_rows() {
        let dir = scratch_dir("export");
        fs::create_dir_all(&dir).unwrap();
        let csv_path = dir.join("history.csv");
        fs::write(
            &csv_path,
            "date,time,level,p3d,p30d,is_dry,is_strong_wind,result_text,source\n\
             2024-01-01,09:00,1,0.0,12.5,True,False,注意レベル,八幡\n\
             2024-01-02,09:00,x,,abc,false,TRUE,該当なし,福岡(代替)\n",
        )
        .unwrap();

        let json_path = dir.join("out").join("history.json");
        assert_eq!(export_history_json(&csv_path, &json_path).unwrap(), 2);

        let entries = read_history(&csv_path).unwrap();
        assert!(entries[0].is_dry);
        assert_eq!(entries[0].p30d, 12.5);
        assert_eq!(entries[1].level, 0);
        assert_eq!(entries[1].p3d, 0.0);
        assert_eq!(entries[1].p30d, 0.0);
        assert!(entries[1].is_strong_wind);
        assert!(json_path.exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_history_is_empty() {
        assert!(read_history(Path::new("/nonexistent/firewx/history.csv")).unwrap().is_empty());
    }
}
