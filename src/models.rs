//! Core data models used throughout the ingestion pipeline.
//!
//! These types represent the raw units handed over by an extraction
//! collaborator, the per-unit signal records derived from them, the
//! request-level assessment, and the terminal [`IngestResult`] returned to
//! callers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Output contract version. Evolution within a version is additive only.
pub const SCHEMA_VERSION: &str = "1.3";

// ═══════════════════════════════════════════════════════════════════════
// Raw units
// ═══════════════════════════════════════════════════════════════════════

/// Low-level metrics an extractor may report for a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSignals {
    /// Fraction of glyphs the engine recognized with confidence, in `[0, 1]`.
    #[serde(default)]
    pub recognized_ratio: Option<f64>,
    /// Engine-reported layout confidence, in `[0, 1]`.
    #[serde(default)]
    pub layout_confidence: Option<f64>,
}

/// Whether the collaborator produced usable text for a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Ok,
    /// The unit exists (it counts as a page) but its text could not be read.
    Degraded { reason: String },
}

/// One page, slide, sheet, image, or page-equivalent of extracted text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUnit {
    pub unit_index: usize,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub source_signals: Option<SourceSignals>,
    #[serde(default)]
    pub status: UnitStatus,
    /// Warning codes surfaced by the extractor for this unit.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl RawUnit {
    pub fn text(unit_index: usize, raw_text: impl Into<String>) -> Self {
        Self {
            unit_index,
            raw_text: raw_text.into(),
            ..Default::default()
        }
    }

    pub fn degraded(unit_index: usize, reason: impl Into<String>) -> Self {
        Self {
            unit_index,
            status: UnitStatus::Degraded {
                reason: reason.into(),
            },
            ..Default::default()
        }
    }

    pub fn with_signals(mut self, signals: SourceSignals) -> Self {
        self.source_signals = Some(signals);
        self
    }

    pub fn with_warning(mut self, code: impl Into<String>) -> Self {
        self.warnings.push(code.into());
        self
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, UnitStatus::Degraded { .. })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Signals and assessment
// ═══════════════════════════════════════════════════════════════════════

/// Bucketed amount of text on a unit relative to a page-length baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityCategory {
    None,
    Sparse,
    Normal,
    Dense,
}

/// Uniform signal record derived from exactly one [`RawUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitSignalRecord {
    pub unit_index: usize,
    pub char_count: usize,
    pub alnum_ratio: f64,
    pub density_category: DensityCategory,
}

impl UnitSignalRecord {
    /// Record contributed by a unit whose text could not be read.
    pub fn zero(unit_index: usize) -> Self {
        Self {
            unit_index,
            char_count: 0,
            alnum_ratio: 0.0,
            density_category: DensityCategory::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDensity {
    Low,
    Medium,
    High,
}

/// Operating caution recommended to a downstream language model.
///
/// Variants are ordered from most to least permissive so that capping is a
/// `max` over the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmMode {
    Creative,
    Normal,
    Strict,
}

impl LlmMode {
    /// Never more permissive than `ceiling`.
    pub fn capped_at(self, ceiling: LlmMode) -> LlmMode {
        self.max(ceiling)
    }
}

/// Request-level quality assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateAssessment {
    pub overall_confidence: f64,
    pub noise_level: NoiseLevel,
    pub text_density: TextDensity,
    pub avg_chars_per_page: f64,
    pub warnings: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Inputs
// ═══════════════════════════════════════════════════════════════════════

/// A file handed to the pipeline by the request-handling layer.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub file_name: String,
    /// Declared extension without the leading dot. Derived from the file
    /// name when absent.
    pub extension: Option<String>,
    pub size_bytes: u64,
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            extension: None,
            size_bytes: bytes.len() as u64,
            bytes,
        }
    }

    /// Lowercased extension, without the dot. Empty when none can be found.
    pub fn effective_extension(&self) -> String {
        let declared = self
            .extension
            .as_deref()
            .map(|e| e.trim().trim_start_matches('.'))
            .filter(|e| !e.is_empty());
        match declared {
            Some(ext) => ext.to_ascii_lowercase(),
            None => std::path::Path::new(&self.file_name)
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default(),
        }
    }
}

/// The two request shapes the core accepts.
#[derive(Debug, Clone)]
pub enum IngestRequest {
    File(FileInput),
    Url(String),
}

/// Coarse input category, used for routing and reported as `input_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputCategory {
    Text,
    Pdf,
    Image,
    Office,
    Archive,
    Url,
}

impl InputCategory {
    pub const TEXT_EXTS: &'static [&'static str] = &["txt", "md", "csv", "json"];
    pub const IMAGE_EXTS: &'static [&'static str] =
        &["png", "jpg", "jpeg", "webp", "bmp", "tiff", "tif"];
    pub const OFFICE_EXTS: &'static [&'static str] = &["docx", "pptx", "xlsx"];

    /// Category for a lowercased file extension, or `None` when unsupported.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "zip" => Some(Self::Archive),
            e if Self::TEXT_EXTS.contains(&e) => Some(Self::Text),
            e if Self::IMAGE_EXTS.contains(&e) => Some(Self::Image),
            e if Self::OFFICE_EXTS.contains(&e) => Some(Self::Office),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Office => "office",
            Self::Archive => "archive",
            Self::Url => "url",
        }
    }

    pub fn is_url(self) -> bool {
        self == Self::Url
    }
}

impl std::fmt::Display for InputCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive metadata about where the units came from.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub category: InputCategory,
    pub file_name: String,
    pub file_extension: String,
    pub file_size_bytes: u64,
    pub source_url: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Output record
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrMeta {
    pub input_type: InputCategory,
    pub page_count: usize,
    pub noise_level: NoiseLevel,
    pub recommended_llm_mode: LlmMode,
    pub text_density: TextDensity,
    pub avg_chars_per_page: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMeta {
    pub file_name: String,
    pub file_extension: String,
    pub file_size_bytes: u64,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub ingested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

fn serialize_rfc3339<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// The terminal record of a successful run.
///
/// Fields are private; the record is built once by the pipeline and only
/// read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestResult {
    schema_version: &'static str,
    text: String,
    overall_confidence: f64,
    warnings: Vec<String>,
    ocr_meta: OcrMeta,
    file_meta: FileMeta,
}

impl IngestResult {
    pub(crate) fn new(
        text: String,
        assessment: AggregateAssessment,
        mode: LlmMode,
        page_count: usize,
        source: SourceDescriptor,
        ingested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            text,
            overall_confidence: assessment.overall_confidence,
            warnings: assessment.warnings,
            ocr_meta: OcrMeta {
                input_type: source.category,
                page_count,
                noise_level: assessment.noise_level,
                recommended_llm_mode: mode,
                text_density: assessment.text_density,
                avg_chars_per_page: assessment.avg_chars_per_page,
            },
            file_meta: FileMeta {
                file_name: source.file_name,
                file_extension: source.file_extension,
                file_size_bytes: source.file_size_bytes,
                ingested_at,
                source_url: source.source_url,
            },
        }
    }

    pub fn schema_version(&self) -> &str {
        self.schema_version
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn overall_confidence(&self) -> f64 {
        self.overall_confidence
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn ocr_meta(&self) -> &OcrMeta {
        &self.ocr_meta
    }

    pub fn file_meta(&self) -> &FileMeta {
        &self.file_meta
    }

    pub fn page_count(&self) -> usize {
        self.ocr_meta.page_count
    }

    pub fn noise_level(&self) -> NoiseLevel {
        self.ocr_meta.noise_level
    }

    pub fn recommended_llm_mode(&self) -> LlmMode {
        self.ocr_meta.recommended_llm_mode
    }

    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w == code)
    }
}
