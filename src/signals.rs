//! Unit signal extraction.
//!
//! Turns one [`RawUnit`] into one [`UnitSignalRecord`] plus the unit-level
//! warning codes it raises. Pure and infallible: missing extractor signals
//! default to nothing, a degraded unit yields a zero record.

use crate::config::SignalsConfig;
use crate::models::{DensityCategory, RawUnit, UnitSignalRecord};

/// Output of signal extraction for one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSignals {
    pub record: UnitSignalRecord,
    pub warnings: Vec<String>,
}

/// Characters that carry content: not whitespace, not control.
pub fn is_significant(c: char) -> bool {
    !c.is_whitespace() && !c.is_control()
}

/// `(significant chars, alphanumeric chars)` of a text.
pub fn count_chars(text: &str) -> (usize, usize) {
    text.chars()
        .filter(|c| is_significant(*c))
        .fold((0, 0), |(total, alnum), c| {
            (total + 1, alnum + usize::from(c.is_alphanumeric()))
        })
}

pub fn density_for(char_count: usize, policy: &SignalsConfig) -> DensityCategory {
    if char_count == 0 {
        DensityCategory::None
    } else if char_count < policy.sparse_below {
        DensityCategory::Sparse
    } else if char_count <= policy.dense_above {
        DensityCategory::Normal
    } else {
        DensityCategory::Dense
    }
}

pub fn extract_signals(unit: &RawUnit, policy: &SignalsConfig) -> UnitSignals {
    let number = unit.unit_index + 1;
    let mut warnings = Vec::new();

    let record = if unit.is_degraded() {
        warnings.push(format!("unit_failed_{}", number));
        UnitSignalRecord::zero(unit.unit_index)
    } else {
        let (char_count, alnum) = count_chars(&unit.raw_text);
        let mut alnum_ratio = if char_count == 0 {
            0.0
        } else {
            alnum as f64 / char_count as f64
        };

        if let Some(signals) = &unit.source_signals {
            if let Some(recognized) = signals.recognized_ratio {
                alnum_ratio = alnum_ratio.min(sanitize_ratio(recognized));
            }
            if let Some(layout) = signals.layout_confidence {
                if sanitize_ratio(layout) < policy.low_layout_confidence {
                    warnings.push(format!("low_layout_confidence_unit_{}", number));
                }
            }
        }

        if char_count == 0 {
            warnings.push(format!("no_text_unit_{}", number));
        }

        UnitSignalRecord {
            unit_index: unit.unit_index,
            char_count,
            alnum_ratio,
            density_category: density_for(char_count, policy),
        }
    };

    warnings.extend(unit.warnings.iter().cloned());
    UnitSignals { record, warnings }
}

/// NaN and out-of-range reports collapse into `[0, 1]`.
fn sanitize_ratio(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
