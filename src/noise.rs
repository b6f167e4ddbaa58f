//! Noise classification over all unit signal records of a request.
//!
//! Per-unit score is `alnum_weight * (1 - alnum_ratio) + emptiness_weight *
//! empty`, averaged across units and bucketed with the policy cutoffs.

use crate::config::NoiseConfig;
use crate::models::{NoiseLevel, UnitSignalRecord};

/// Warning raised when a request carries no text at all.
pub const NO_CONTENT: &str = "no_content";

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseAssessment {
    pub level: NoiseLevel,
    /// Mean per-unit noise score, in `[0, 1]`.
    pub average: f64,
    pub warnings: Vec<String>,
}

/// Alnum ratio the scorers may rely on: nothing to measure means nothing
/// recognized.
pub fn effective_alnum_ratio(record: &UnitSignalRecord) -> f64 {
    if record.char_count == 0 {
        0.0
    } else {
        record.alnum_ratio.clamp(0.0, 1.0)
    }
}

pub fn unit_noise_score(record: &UnitSignalRecord, policy: &NoiseConfig) -> f64 {
    let empty = if record.char_count < policy.min_chars {
        1.0
    } else {
        0.0
    };
    policy.alnum_weight * (1.0 - effective_alnum_ratio(record)) + policy.emptiness_weight * empty
}

pub fn bucket(average: f64, policy: &NoiseConfig) -> NoiseLevel {
    if average >= policy.high_at {
        NoiseLevel::High
    } else if average >= policy.medium_at {
        NoiseLevel::Medium
    } else {
        NoiseLevel::Low
    }
}

pub fn classify_noise(records: &[UnitSignalRecord], policy: &NoiseConfig) -> NoiseAssessment {
    if records.is_empty() {
        return NoiseAssessment {
            level: NoiseLevel::High,
            average: 1.0,
            warnings: vec![NO_CONTENT.to_string()],
        };
    }

    let total: f64 = records.iter().map(|r| unit_noise_score(r, policy)).sum();
    let average = (total / records.len() as f64).clamp(0.0, 1.0);

    let mut warnings = Vec::new();
    if records.iter().all(|r| r.char_count == 0) {
        warnings.push(NO_CONTENT.to_string());
    }

    NoiseAssessment {
        level: bucket(average, policy),
        average,
        warnings,
    }
}
