//! Overall confidence scoring.
//!
//! Confidence starts at 1.0 and loses
//!
//! - `noise_weight * noise_average`, and
//! - `empty_unit_weight * none_fraction` once more than
//!   `empty_unit_fraction` of the units carry no text,
//!
//! then is clamped to `[0, 1]` and rounded to two decimals. Both terms only
//! grow when a unit gets noisier or emptier, which keeps the score monotone:
//! raising a unit's alnum ratio never lowers confidence and zeroing a unit's
//! char count never raises it.

use crate::config::ConfidenceConfig;
use crate::models::{DensityCategory, UnitSignalRecord};
use crate::noise::NoiseAssessment;

/// Fraction of units without any text. An empty sequence is all-empty.
pub fn none_fraction(records: &[UnitSignalRecord]) -> f64 {
    if records.is_empty() {
        return 1.0;
    }
    let none = records
        .iter()
        .filter(|r| r.char_count == 0 || r.density_category == DensityCategory::None)
        .count();
    none as f64 / records.len() as f64
}

pub fn score_confidence(
    records: &[UnitSignalRecord],
    noise: &NoiseAssessment,
    policy: &ConfidenceConfig,
) -> f64 {
    let mut confidence = 1.0 - policy.noise_weight * noise.average.clamp(0.0, 1.0);

    let empty = none_fraction(records);
    if empty > policy.empty_unit_fraction {
        confidence -= policy.empty_unit_weight * empty;
    }

    round2(confidence.clamp(0.0, 1.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoiseConfig;
    use crate::noise::classify_noise;

    fn record(unit_index: usize, char_count: usize, alnum_ratio: f64) -> UnitSignalRecord {
        UnitSignalRecord {
            unit_index,
            char_count,
            alnum_ratio,
            density_category: if char_count == 0 {
                DensityCategory::None
            } else {
                DensityCategory::Normal
            },
        }
    }

    fn score(records: &[UnitSignalRecord]) -> f64 {
        let noise = classify_noise(records, &NoiseConfig::default());
        score_confidence(records, &noise, &ConfidenceConfig::default())
    }

    #[test]
    fn clean_single_unit_is_high() {
        let conf = score(&[record(0, 1800, 0.98)]);
        assert!(conf > 0.8, "Expected > 0.8, got {conf}");
    }

    #[test]
    fn mid_ratio_pages_land_in_normal_band() {
        let records: Vec<_> = (0..4).map(|i| record(i, 1200, 0.55)).collect();
        let conf = score(&records);
        assert!((0.5..0.8).contains(&conf), "Expected [0.5, 0.8), got {conf}");
    }

    #[test]
    fn empty_sequence_is_zero() {
        assert_eq!(score(&[]), 0.0);
    }

    #[test]
    fn single_blank_unit_is_low() {
        let conf = score(&[record(0, 0, 0.0)]);
        assert!(conf < 0.5, "Expected < 0.5, got {conf}");
    }

    #[test]
    fn one_failed_unit_in_five_degrades_but_stays_usable() {
        let mut records: Vec<_> = (0..5).map(|i| record(i, 1500, 0.98)).collect();
        let clean = score(&records);
        records[2] = UnitSignalRecord::zero(2);
        let degraded = score(&records);
        assert!(degraded < clean);
        assert!(degraded >= 0.5, "Expected >= 0.5, got {degraded}");
    }

    #[test]
    fn penalty_only_past_fraction() {
        let policy = ConfidenceConfig::default();
        // 1 of 4 empty = 0.25, below 0.3
        let mut records: Vec<_> = (0..4).map(|i| record(i, 1500, 1.0)).collect();
        records[0] = UnitSignalRecord::zero(0);
        let noise = NoiseAssessment {
            level: crate::models::NoiseLevel::Low,
            average: 0.0,
            warnings: vec![],
        };
        assert_eq!(score_confidence(&records, &noise, &policy), 1.0);
        // 2 of 4 empty = 0.5, above 0.3
        records[1] = UnitSignalRecord::zero(1);
        assert_eq!(score_confidence(&records, &noise, &policy), 0.85);
    }

    #[test]
    fn raising_alnum_ratio_never_lowers_confidence() {
        let mut records: Vec<_> = (0..3).map(|i| record(i, 400, 0.4)).collect();
        let mut previous = score(&records);
        for step in 1..=6 {
            records[1].alnum_ratio = 0.4 + 0.1 * step as f64;
            let current = score(&records);
            assert!(current >= previous, "{current} < {previous} at step {step}");
            previous = current;
        }
    }

    #[test]
    fn zeroing_a_unit_never_raises_confidence() {
        let records: Vec<_> = (0..3).map(|i| record(i, 400, 0.9)).collect();
        let before = score(&records);
        let mut zeroed = records.clone();
        zeroed[0].char_count = 0;
        zeroed[0].density_category = DensityCategory::None;
        assert!(score(&zeroed) <= before);
    }
}
