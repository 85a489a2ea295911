/// Service configuration.
///
/// Station identifiers, table layouts, warning code sets and output paths
/// live here rather than in code, so another station or region needs only a
/// different `monitor.toml`. All other modules take the relevant section by
/// reference instead of reading global constants.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Copy of the shipped `monitor.toml`, used when no file is present.
const BUILTIN_CONFIG: &str = include_str!("../monitor.toml");

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV_VAR: &str = "FIREWX_CONFIG";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

// ---------------------------------------------------------------------------
// Configuration sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Cell texts that mean "no observation" and count as 0.0 mm.
    #[serde(default = "default_placeholders")]
    pub placeholders: Vec<String>,
    pub station: StationConfig,
    pub precipitation: PrecipitationConfig,
    pub warnings: WarningConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: String,
    /// Offset of the station's local calendar from UTC, in hours.
    pub utc_offset_hours: i32,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrecipitationConfig {
    pub daily_sources: Vec<DailySource>,
    pub summary: SummarySource,
}

/// One tier of daily confirmed tables (a station plus its page layout).
#[derive(Debug, Clone, Deserialize)]
pub struct DailySource {
    pub label: String,
    pub url_template: String,
    pub prec_no: String,
    pub block_no: String,
    /// Cell index holding the day's total. Fixed per layout, never inferred.
    pub value_column: usize,
    #[serde(default = "default_page_charset")]
    pub charset: String,
    #[serde(default = "default_short_timeout")]
    pub timeout_secs: u64,
}

impl DailySource {
    pub fn url_for(&self, year: i32, month: u32) -> String {
        self.url_template
            .replace("{prec_no}", &self.prec_no)
            .replace("{block_no}", &self.block_no)
            .replace("{year}", &year.to_string())
            .replace("{month}", &month.to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The rolling-window summary table (10/20/30-day totals for all stations).
#[derive(Debug, Clone, Deserialize)]
pub struct SummarySource {
    pub label: String,
    pub url: String,
    #[serde(default = "default_utf8")]
    pub charset: String,
    pub window_label: String,
    /// Matched by containment against the (carried-forward) first cell.
    pub region_label: String,
    /// Matched exactly against the second cell.
    pub station_label: String,
    pub default_column: usize,
    #[serde(default = "default_long_timeout")]
    pub timeout_secs: u64,
}

impl SummarySource {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarningConfig {
    pub url: String,
    /// Area whose direct category list carries the authoritative status.
    pub area_code: String,
    /// Area whose time-indexed breakdown names the sub-areas.
    pub sub_area_region_code: String,
    pub region_name: String,
    pub dry_code: String,
    pub wind_codes: Vec<String>,
    #[serde(default)]
    pub sea_codes: Vec<String>,
    #[serde(default)]
    pub sea_keywords: Vec<String>,
    #[serde(default)]
    pub headline_wind_terms: Vec<String>,
    #[serde(default)]
    pub headline_sea_qualifiers: Vec<String>,
    #[serde(default)]
    pub headline_land_qualifiers: Vec<String>,
    #[serde(default = "default_short_timeout")]
    pub timeout_secs: u64,
}

impl WarningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_wind_code(&self, code: &str) -> bool {
        self.wind_codes.iter().any(|c| c == code)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub data_file: PathBuf,
    pub history_file: PathBuf,
    pub history_json: PathBuf,
}

fn default_placeholders() -> Vec<String> {
    ["--", "///", "×"].iter().map(|s| s.to_string()).collect()
}

fn default_lookback_days() -> u32 {
    3
}

fn default_page_charset() -> String {
    "shift_jis".to_string()
}

fn default_utf8() -> String {
    "utf-8".to_string()
}

fn default_short_timeout() -> u64 {
    10
}

fn default_long_timeout() -> u64 {
    15
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl MonitorConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The configuration shipped with the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_CONFIG)
    }

    pub fn placeholder_tokens(&self) -> Vec<&str> {
        self.placeholders.iter().map(String::as_str).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::Invalid { reason });

        if self.precipitation.daily_sources.is_empty() {
            return invalid("at least one daily precipitation source is required".into());
        }

        let mut seen = std::collections::HashSet::new();
        for source in &self.precipitation.daily_sources {
            if !seen.insert(source.label.as_str()) {
                return invalid(format!("duplicate daily source label '{}'", source.label));
            }
            if source.block_no.is_empty() || !source.block_no.chars().all(|c| c.is_ascii_digit()) {
                return invalid(format!(
                    "block_no for '{}' must be numeric, got '{}'",
                    source.label, source.block_no
                ));
            }
            if source.value_column == 0 {
                return invalid(format!(
                    "value_column for '{}' must be >= 1 (column 0 is the day label)",
                    source.label
                ));
            }
            for placeholder in ["{prec_no}", "{block_no}", "{year}", "{month}"] {
                if !source.url_template.contains(placeholder) {
                    return invalid(format!(
                        "url_template for '{}' is missing {}",
                        source.label, placeholder
                    ));
                }
            }
        }

        if self.precipitation.summary.default_column < 2 {
            return invalid("summary default_column must point past the label columns".into());
        }
        if self.warnings.wind_codes.is_empty() {
            return invalid("warnings.wind_codes must not be empty".into());
        }
        if self.station.lookback_days == 0 {
            return invalid("station.lookback_days must be >= 1".into());
        }
        if self.station.utc_offset_hours.abs() > 14 {
            return invalid(format!(
                "station.utc_offset_hours out of range: {}",
                self.station.utc_offset_hours
            ));
        }
        Ok(())
    }
}

/// Loads configuration from `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<MonitorConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    MonitorConfig::from_toml_str(&text)
}

/// Resolves the configuration the binary should use.
///
/// Order: explicit path, then `FIREWX_CONFIG`, then `./monitor.toml`, then
/// the built-in copy. An explicitly named file that does not exist is an
/// error; only the implicit default may be absent.
pub fn resolve_config(explicit: Option<&Path>) -> Result<MonitorConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return load_config(path);
    }
    let default_path = Path::new("monitor.toml");
    if default_path.exists() {
        return load_config(default_path);
    }
    MonitorConfig::builtin()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> MonitorConfig {
        MonitorConfig::builtin().expect("shipped monitor.toml should parse and validate")
    }

    #[test]
    fn test_builtin_config_has_primary_and_fallback_tiers() {
        let config = builtin();
        let sources = &config.precipitation.daily_sources;
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].label, "八幡");
        assert_eq!(sources[0].value_column, 1);
        assert_eq!(sources[1].label, "福岡(代替)");
        assert_eq!(sources[1].value_column, 3);
    }

    #[test]
    fn test_daily_url_substitution() {
        let config = builtin();
        let url = config.precipitation.daily_sources[0].url_for(2025, 3);
        assert!(url.contains("daily_a1.php"));
        assert!(url.contains("prec_no=82"));
        assert!(url.contains("block_no=0780"));
        assert!(url.contains("year=2025"));
        assert!(url.contains("month=3&"), "month should not be zero-padded: {}", url);
    }

    #[test]
    fn test_builtin_block_numbers_are_numeric() {
        for source in &builtin().precipitation.daily_sources {
            assert!(
                source.block_no.chars().all(|c| c.is_ascii_digit()),
                "block_no for '{}' should be numeric, got '{}'",
                source.label,
                source.block_no
            );
        }
    }

    #[test]
    fn test_builtin_wind_codes_include_advisory_and_storm() {
        let warnings = builtin().warnings;
        assert!(warnings.is_wind_code("15"));
        assert!(warnings.is_wind_code("05"));
        assert!(!warnings.is_wind_code(&warnings.dry_code));
    }

    #[test]
    fn test_duplicate_source_labels_rejected() {
        let mut config = builtin();
        let copy = config.precipitation.daily_sources[0].clone();
        config.precipitation.daily_sources.push(copy);
        let err = config.validate().expect_err("duplicate labels should be rejected");
        assert!(err.to_string().contains("duplicate"), "got: {}", err);
    }

    #[test]
    fn test_zero_value_column_rejected() {
        let mut config = builtin();
        config.precipitation.daily_sources[1].value_column = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_template_without_month_rejected() {
        let mut config = builtin();
        config.precipitation.daily_sources[0].url_template =
            "https://example.invalid/daily?year={year}".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_template_without_station_codes_rejected() {
        for missing in ["{prec_no}", "{block_no}"] {
            let mut config = builtin();
            let template = config.precipitation.daily_sources[0].url_template.replace(missing, "82");
            config.precipitation.daily_sources[0].url_template = template;
            let err = config.validate().expect_err("template without station code should be rejected");
            assert!(err.to_string().contains(missing), "got: {}", err);
        }
    }

    #[test]
    fn test_empty_wind_codes_rejected() {
        let mut config = builtin();
        config.warnings.wind_codes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_section_is_parse_error() {
        let result = MonitorConfig::from_toml_str("[station]\nname = \"x\"\nutc_offset_hours = 9\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_missing_file_is_io_error() {
        let result = load_config("/nonexistent/firewx/monitor.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
