//! Alert level decision.
//!
//! Dryness is the trigger and land wind is the modifier: wind alone never
//! raises the level. Thresholds are fixed domain constants.

use crate::model::{AdvisoryResult, AlertLevel, JudgmentResult, PrecipitationResult};

/// 3-day confirmed total at or below which the ground counts as dry (mm).
pub const DRY_3DAY_MAX_MM: f64 = 1.0;

/// 30-day total at or below which the season counts as dry (mm).
pub const DRY_30DAY_MAX_MM: f64 = 30.0;

/// Decision table.
///
/// - Caution: `p3d <= 1.0` and either `p30d <= 30.0` or a dryness advisory.
/// - Alert: caution and a wind advisory over land.
/// - Otherwise none.
pub fn judge_level(p3d: f64, p30d: f64, is_dry: bool, wind_is_land: bool) -> AlertLevel {
    let dry_spell = p3d <= DRY_3DAY_MAX_MM && (p30d <= DRY_30DAY_MAX_MM || is_dry);
    match (dry_spell, wind_is_land) {
        (true, true) => AlertLevel::Alert,
        (true, false) => AlertLevel::Caution,
        (false, _) => AlertLevel::None,
    }
}

/// Combines the extraction outputs into the final result.
///
/// Missing totals enter the table as 0.0; `JudgmentResult` keeps their
/// `success` flags so the caller can tell a real dry spell from a gap.
pub fn judge(
    precipitation: PrecipitationResult,
    precipitation_30d: PrecipitationResult,
    advisory: AdvisoryResult,
) -> JudgmentResult {
    let level = judge_level(
        precipitation.total_mm,
        precipitation_30d.total_mm,
        advisory.is_dry,
        advisory.wind_is_land,
    );
    JudgmentResult {
        level,
        precipitation,
        precipitation_30d,
        advisory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_month_is_caution() {
        assert_eq!(judge_level(0.5, 10.0, false, false), AlertLevel::Caution);
    }

    #[test]
    fn test_dry_month_with_land_wind_is_alert() {
        assert_eq!(judge_level(0.5, 10.0, false, true), AlertLevel::Alert);
    }

    #[test]
    fn test_wet_period_is_none_regardless_of_wind() {
        assert_eq!(judge_level(2.0, 50.0, false, false), AlertLevel::None);
        assert_eq!(judge_level(2.0, 50.0, false, true), AlertLevel::None);
        assert_eq!(judge_level(2.0, 50.0, true, true), AlertLevel::None);
    }

    #[test]
    fn test_dryness_advisory_overrides_wet_month() {
        assert_eq!(judge_level(0.8, 40.0, true, false), AlertLevel::Caution);
        assert_eq!(judge_level(0.8, 40.0, true, true), AlertLevel::Alert);
        assert_eq!(judge_level(0.8, 40.0, false, true), AlertLevel::None);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        assert_eq!(judge_level(1.0, 30.0, false, false), AlertLevel::Caution);
        assert_eq!(judge_level(1.01, 30.0, false, false), AlertLevel::None);
        assert_eq!(judge_level(1.0, 30.01, false, false), AlertLevel::None);
    }

    #[test]
    fn test_judge_keeps_inputs() {
        let p3 = PrecipitationResult::found(0.0, "八幡");
        let p30 = PrecipitationResult::not_found("八幡");
        let advisory = AdvisoryResult {
            is_dry: true,
            ..AdvisoryResult::default()
        };
        let result = judge(p3.clone(), p30.clone(), advisory.clone());
        assert_eq!(result.level, AlertLevel::Caution);
        assert_eq!(result.precipitation, p3);
        assert_eq!(result.precipitation_30d, p30);
        assert_eq!(result.advisory, advisory);
        assert!(!result.precipitation_complete());
    }
}
