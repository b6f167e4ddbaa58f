//! Guidance for the consuming language model.
//!
//! | overall_confidence | mode before noise adjustment |
//! |--------------------|------------------------------|
//! | > 0.8              | creative                     |
//! | 0.5 – 0.8          | normal                       |
//! | < 0.5              | strict                       |
//!
//! High noise caps the mode at `strict`, medium noise at `normal`. Noise can
//! only downgrade.

use crate::config::GuidanceConfig;
use crate::models::{InputCategory, LlmMode, NoiseLevel, TextDensity};

pub const LOW_CONFIDENCE_INPUT: &str = "low_confidence_input";
pub const HIGH_NOISE_INPUT: &str = "high_noise_input";
pub const SHORT_TEXT: &str = "short_text";
pub const SHORT_CONTENT: &str = "short_content";

#[derive(Debug, Clone, PartialEq)]
pub struct Guidance {
    pub mode: LlmMode,
    /// Confidence warning first, then noise, then length.
    pub warnings: Vec<String>,
}

pub fn mode_for_confidence(confidence: f64, policy: &GuidanceConfig) -> LlmMode {
    if confidence > policy.creative_above {
        LlmMode::Creative
    } else if confidence >= policy.strict_below {
        LlmMode::Normal
    } else {
        LlmMode::Strict
    }
}

pub fn noise_ceiling(noise: NoiseLevel) -> LlmMode {
    match noise {
        NoiseLevel::Low => LlmMode::Creative,
        NoiseLevel::Medium => LlmMode::Normal,
        NoiseLevel::High => LlmMode::Strict,
    }
}

pub fn resolve_guidance(
    confidence: f64,
    noise: NoiseLevel,
    category: InputCategory,
    text_chars: usize,
    policy: &GuidanceConfig,
) -> Guidance {
    let mode = mode_for_confidence(confidence, policy).capped_at(noise_ceiling(noise));

    let mut warnings = Vec::new();
    if confidence < policy.strict_below {
        warnings.push(LOW_CONFIDENCE_INPUT.to_string());
    }
    if noise == NoiseLevel::High {
        warnings.push(HIGH_NOISE_INPUT.to_string());
    }
    if text_chars > 0 {
        if category.is_url() {
            if text_chars < policy.short_content_chars {
                warnings.push(SHORT_CONTENT.to_string());
            }
        } else if text_chars < policy.short_text_chars {
            warnings.push(SHORT_TEXT.to_string());
        }
    }

    Guidance { mode, warnings }
}

/// Buckets the average characters per page of the final text.
pub fn text_density(avg_chars_per_page: f64, policy: &GuidanceConfig) -> TextDensity {
    if avg_chars_per_page > policy.density_high_above {
        TextDensity::High
    } else if avg_chars_per_page > policy.density_medium_above {
        TextDensity::Medium
    } else {
        TextDensity::Low
    }
}
