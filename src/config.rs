//! TOML configuration parsing and validation.
//!
//! Every section and key is optional; a missing file section falls back to
//! the defaults below. The scoring thresholds and weights form an immutable
//! [`ScoringPolicy`] that is handed to the pipeline at construction.
//!
//! ```toml
//! [noise]
//! alnum_weight = 0.7
//! emptiness_weight = 0.3
//! medium_at = 0.15
//! high_at = 0.45
//!
//! [confidence]
//! noise_weight = 0.8
//!
//! [pipeline]
//! max_workers = 4
//!
//! [fetch]
//! timeout_secs = 10
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub signals: SignalsConfig,
    pub noise: NoiseConfig,
    pub confidence: ConfidenceConfig,
    pub guidance: GuidanceConfig,
    pub pipeline: PipelineConfig,
    pub extract: ExtractConfig,
    pub fetch: FetchConfig,
}

/// Unit Signal Extractor policy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SignalsConfig {
    /// Units with fewer significant characters are `sparse`.
    pub sparse_below: usize,
    /// Units with more significant characters are `dense`.
    pub dense_above: usize,
    /// Reported layout confidence below this raises a unit warning.
    pub low_layout_confidence: f64,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            sparse_below: 300,
            dense_above: 2500,
            low_layout_confidence: 0.5,
        }
    }
}

/// Noise Classifier policy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NoiseConfig {
    pub alnum_weight: f64,
    pub emptiness_weight: f64,
    /// A unit with fewer significant characters counts as empty.
    pub min_chars: usize,
    /// Average noise at or above this is `medium`.
    pub medium_at: f64,
    /// Average noise at or above this is `high`.
    pub high_at: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            alnum_weight: 0.7,
            emptiness_weight: 0.3,
            min_chars: 20,
            medium_at: 0.15,
            high_at: 0.45,
        }
    }
}

/// Confidence Scorer policy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub noise_weight: f64,
    pub empty_unit_weight: f64,
    /// The empty-unit penalty applies once more than this fraction of units
    /// has no text.
    pub empty_unit_fraction: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            noise_weight: 0.8,
            empty_unit_weight: 0.3,
            empty_unit_fraction: 0.3,
        }
    }
}

/// Guidance Resolver policy and result density buckets.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GuidanceConfig {
    pub creative_above: f64,
    pub strict_below: f64,
    pub short_text_chars: usize,
    pub short_content_chars: usize,
    pub density_medium_above: f64,
    pub density_high_above: f64,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            creative_above: 0.8,
            strict_below: 0.5,
            short_text_chars: 100,
            short_content_chars: 200,
            density_medium_above: 800.0,
            density_high_above: 2500.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker pool size for per-unit work. `0` means one per available CPU.
    pub max_workers: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractConfig {
    pub ocr_command: String,
    pub ocr_timeout_secs: u64,
    pub max_entry_bytes: u64,
    pub max_archive_entries: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            ocr_command: "tesseract".to_string(),
            ocr_timeout_secs: 60,
            max_entry_bytes: 50 * 1024 * 1024,
            max_archive_entries: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("unified-ingest/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// The immutable scoring constants of one pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoringPolicy {
    pub signals: SignalsConfig,
    pub noise: NoiseConfig,
    pub confidence: ConfidenceConfig,
    pub guidance: GuidanceConfig,
}

impl Config {
    pub fn policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            signals: self.signals.clone(),
            noise: self.noise.clone(),
            confidence: self.confidence.clone(),
            guidance: self.guidance.clone(),
        }
    }

    /// Effective worker pool size.
    pub fn worker_count(&self) -> usize {
        if self.pipeline.max_workers > 0 {
            return self.pipeline.max_workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{} must be in [0.0, 1.0], got {}", name, value);
    }
    Ok(())
}

pub fn validate(config: &Config) -> Result<()> {
    // Signals
    if config.signals.sparse_below > config.signals.dense_above {
        bail!("signals.sparse_below must be <= signals.dense_above");
    }
    unit_interval("signals.low_layout_confidence", config.signals.low_layout_confidence)?;

    // Noise
    unit_interval("noise.alnum_weight", config.noise.alnum_weight)?;
    unit_interval("noise.emptiness_weight", config.noise.emptiness_weight)?;
    if config.noise.alnum_weight + config.noise.emptiness_weight > 1.0 + f64::EPSILON {
        bail!("noise.alnum_weight + noise.emptiness_weight must be <= 1.0");
    }
    unit_interval("noise.medium_at", config.noise.medium_at)?;
    unit_interval("noise.high_at", config.noise.high_at)?;
    if config.noise.medium_at >= config.noise.high_at {
        bail!("noise.medium_at must be < noise.high_at");
    }

    // Confidence
    unit_interval("confidence.noise_weight", config.confidence.noise_weight)?;
    unit_interval("confidence.empty_unit_weight", config.confidence.empty_unit_weight)?;
    unit_interval(
        "confidence.empty_unit_fraction",
        config.confidence.empty_unit_fraction,
    )?;

    // Guidance
    unit_interval("guidance.creative_above", config.guidance.creative_above)?;
    unit_interval("guidance.strict_below", config.guidance.strict_below)?;
    if config.guidance.strict_below > config.guidance.creative_above {
        bail!("guidance.strict_below must be <= guidance.creative_above");
    }
    if config.guidance.density_medium_above > config.guidance.density_high_above {
        bail!("guidance.density_medium_above must be <= guidance.density_high_above");
    }

    // Collaborators
    if config.extract.ocr_command.trim().is_empty() {
        bail!("extract.ocr_command must not be empty");
    }
    if config.extract.max_entry_bytes == 0 {
        bail!("extract.max_entry_bytes must be > 0");
    }
    if config.fetch.timeout_secs == 0 {
        bail!("fetch.timeout_secs must be > 0");
    }
    if config.fetch.max_body_bytes == 0 {
        bail!("fetch.max_body_bytes must be > 0");
    }

    Ok(())
}
