//! Request orchestration.
//!
//! One request runs through seven stages, strictly in order:
//!
//! ```text
//! IngestRequest
//!      │
//!      ▼
//! Collect ──► SignalExtract ──► NoiseClassify ──► ConfidenceScore
//! (collab.)   (pool fan-out)    (barrier)               │
//!                                                       ▼
//! IngestResult ◄── Finalize ◄── Guide ◄── Normalize (pool fan-out)
//! ```
//!
//! A request ends either with an [`IngestResult`] or with an [`IngestError`],
//! never with a partial result. The [`Pipeline`] holds nothing that is
//! specific to one request, so a single instance can serve any number of
//! concurrent requests; the worker pool is shared between them.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::confidence::score_confidence;
use crate::config::{Config, ScoringPolicy};
use crate::error::IngestError;
use crate::extract::LocalExtractor;
use crate::fetch::HttpFetcher;
use crate::guidance::{resolve_guidance, text_density};
use crate::models::{
    AggregateAssessment, FileInput, IngestRequest, IngestResult, InputCategory, RawUnit,
    SourceDescriptor,
};
use crate::noise::classify_noise;
use crate::normalize::{join_units, normalize_text};
use crate::pool::WorkerPool;
use crate::signals::extract_signals;
use crate::traits::{PageFetcher, UnitExtractor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collect,
    SignalExtract,
    NoiseClassify,
    ConfidenceScore,
    Normalize,
    Guide,
    Finalize,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Collect => "collect",
            Stage::SignalExtract => "signal_extract",
            Stage::NoiseClassify => "noise_classify",
            Stage::ConfidenceScore => "confidence_score",
            Stage::Normalize => "normalize",
            Stage::Guide => "guide",
            Stage::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a warning came from. Determines its position in the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum WarningSource {
    Guidance,
    Content,
    Unit,
}

/// Append-only warning ledger of one request.
///
/// Codes are kept in insertion order within each source and recorded once.
#[derive(Debug, Default)]
struct WarningLog {
    entries: Vec<(WarningSource, String)>,
}

impl WarningLog {
    fn extend<I>(&mut self, source: WarningSource, codes: I)
    where
        I: IntoIterator<Item = String>,
    {
        for code in codes {
            if !self.entries.iter().any(|(_, seen)| *seen == code) {
                self.entries.push((source, code));
            }
        }
    }

    fn into_codes(mut self) -> Vec<String> {
        // Stable sort keeps insertion order inside a source.
        self.entries.sort_by_key(|(source, _)| *source);
        self.entries.into_iter().map(|(_, code)| code).collect()
    }
}

pub struct Pipeline {
    policy: Arc<ScoringPolicy>,
    pool: WorkerPool,
    extractor: Arc<dyn UnitExtractor>,
    fetcher: Arc<dyn PageFetcher>,
}

impl Pipeline {
    /// Builds a pipeline with the local extraction and HTTP fetch adapters.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let extractor = LocalExtractor::new(&config.extract);
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::new(
            config.policy(),
            WorkerPool::new(config.worker_count()),
            Arc::new(extractor),
            Arc::new(fetcher),
        ))
    }

    pub fn new(
        policy: ScoringPolicy,
        pool: WorkerPool,
        extractor: Arc<dyn UnitExtractor>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            policy: Arc::new(policy),
            pool,
            extractor,
            fetcher,
        }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Runs one request to completion.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestResult, IngestError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("ingest", %request_id);

        async move {
            let outcome = match request {
                IngestRequest::File(input) => self.ingest_file(input).await,
                IngestRequest::Url(url) => self.ingest_url(&url).await,
            };
            match &outcome {
                Ok(result) => tracing::info!(
                    pages = result.page_count(),
                    confidence = result.overall_confidence(),
                    noise = ?result.noise_level(),
                    mode = ?result.recommended_llm_mode(),
                    "ingest finished"
                ),
                Err(e) => tracing::warn!(code = e.code(), error = %e, "ingest failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn ingest_file(&self, input: FileInput) -> Result<IngestResult, IngestError> {
        let category = validate_file(&input)?;
        tracing::info!(
            file = %input.file_name,
            input_type = %category,
            bytes = input.size_bytes,
            "ingest started"
        );

        tracing::debug!(stage = %Stage::Collect, extractor = self.extractor.name());
        let units = self
            .extractor
            .extract(&input)
            .await
            .map_err(|e| IngestError::ExtractionFailure(e.to_string()))?;
        if units.is_empty() && !input.bytes.is_empty() {
            return Err(IngestError::ExtractionFailure(format!(
                "no extractable content in {} ({} bytes)",
                input.file_name, input.size_bytes
            )));
        }

        let source = SourceDescriptor {
            category,
            file_name: input.file_name.clone(),
            file_extension: input.effective_extension(),
            file_size_bytes: input.size_bytes,
            source_url: None,
        };
        self.run_units(source, units).await
    }

    async fn ingest_url(&self, url: &str) -> Result<IngestResult, IngestError> {
        let parsed = validate_url(url)?;
        tracing::info!(url = %parsed, input_type = %InputCategory::Url, "ingest started");

        tracing::debug!(stage = %Stage::Collect, "fetching page");
        let page = self
            .fetcher
            .fetch(parsed.as_str())
            .await
            .map_err(|e| IngestError::ExtractionFailure(e.to_string()))?;

        let file_name = reqwest::Url::parse(&page.final_url)
            .ok()
            .and_then(|u| url_file_name(&u))
            .or_else(|| url_file_name(&parsed))
            .unwrap_or_else(|| page.final_url.clone());

        let source = SourceDescriptor {
            category: InputCategory::Url,
            file_name,
            file_extension: "html".to_string(),
            file_size_bytes: page.body_bytes,
            source_url: Some(page.final_url),
        };
        self.run_units(source, vec![RawUnit::text(0, page.text)])
            .await
    }

    /// Runs the scoring stages on units that were extracted elsewhere.
    pub async fn ingest_units(
        &self,
        source: SourceDescriptor,
        units: Vec<RawUnit>,
    ) -> Result<IngestResult, IngestError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("ingest", %request_id);
        async move {
            tracing::info!(
                file = %source.file_name,
                input_type = %source.category,
                units = units.len(),
                "ingest started"
            );
            let outcome = self.run_units(source, units).await;
            if let Err(e) = &outcome {
                tracing::warn!(code = e.code(), error = %e, "ingest failed");
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_units(
        &self,
        source: SourceDescriptor,
        units: Vec<RawUnit>,
    ) -> Result<IngestResult, IngestError> {
        check_collected(&units)?;
        let units = Arc::new(units);
        let page_count = units.len();
        let mut warnings = WarningLog::default();

        // SignalExtract
        tracing::debug!(stage = %Stage::SignalExtract, units = page_count);
        let signals_policy = self.policy.signals.clone();
        let signals = self
            .pool
            .map_units(&units, move |unit| extract_signals(unit, &signals_policy))
            .await
            .map_err(|e| IngestError::invariant(Stage::SignalExtract, e.to_string()))?;

        let mut records = Vec::with_capacity(signals.len());
        let mut unit_warnings = Vec::new();
        for (unit, extracted) in units.iter().zip(signals) {
            if extracted.record.unit_index != unit.unit_index {
                return Err(IngestError::invariant(
                    Stage::SignalExtract,
                    format!(
                        "record for unit {} reported index {}",
                        unit.unit_index, extracted.record.unit_index
                    ),
                ));
            }
            if unit.is_degraded() {
                tracing::warn!(unit = unit.unit_index, status = ?unit.status, "unit degraded");
            }
            records.push(extracted.record);
            unit_warnings.extend(extracted.warnings);
        }
        if records.len() != page_count {
            return Err(IngestError::invariant(
                Stage::SignalExtract,
                format!("{} records for {} units", records.len(), page_count),
            ));
        }
        warnings.extend(WarningSource::Unit, unit_warnings);

        // NoiseClassify
        let noise = classify_noise(&records, &self.policy.noise);
        tracing::debug!(
            stage = %Stage::NoiseClassify,
            average = noise.average,
            level = ?noise.level
        );
        warnings.extend(WarningSource::Content, noise.warnings.iter().cloned());

        // ConfidenceScore
        let confidence = score_confidence(&records, &noise, &self.policy.confidence);
        if !(0.0..=1.0).contains(&confidence) {
            return Err(IngestError::invariant(
                Stage::ConfidenceScore,
                format!("confidence {} outside [0, 1]", confidence),
            ));
        }
        tracing::debug!(stage = %Stage::ConfidenceScore, confidence);

        // Normalize
        let normalized = self
            .pool
            .map_units(&units, |unit| {
                if unit.is_degraded() {
                    String::new()
                } else {
                    normalize_text(&unit.raw_text)
                }
            })
            .await
            .map_err(|e| IngestError::invariant(Stage::Normalize, e.to_string()))?;
        if normalized.len() != page_count {
            return Err(IngestError::invariant(
                Stage::Normalize,
                format!("{} texts for {} units", normalized.len(), page_count),
            ));
        }
        let text = join_units(&normalized);
        let text_chars = text.chars().count();
        tracing::debug!(stage = %Stage::Normalize, chars = text_chars);

        // Guide
        let guidance = resolve_guidance(
            confidence,
            noise.level,
            source.category,
            text_chars,
            &self.policy.guidance,
        );
        tracing::debug!(stage = %Stage::Guide, mode = ?guidance.mode);
        warnings.extend(WarningSource::Guidance, guidance.warnings);

        // Finalize
        let avg_chars_per_page = if page_count == 0 {
            0.0
        } else {
            round1(text_chars as f64 / page_count as f64)
        };
        let assessment = AggregateAssessment {
            overall_confidence: confidence,
            noise_level: noise.level,
            text_density: text_density(avg_chars_per_page, &self.policy.guidance),
            avg_chars_per_page,
            warnings: warnings.into_codes(),
        };
        tracing::debug!(stage = %Stage::Finalize, warnings = assessment.warnings.len());

        Ok(IngestResult::new(
            text,
            assessment,
            guidance.mode,
            page_count,
            source,
            Utc::now(),
        ))
    }
}

/// Checks a unit sequence before any scoring happens.
fn check_collected(units: &[RawUnit]) -> Result<(), IngestError> {
    for (position, unit) in units.iter().enumerate() {
        if unit.unit_index != position {
            return Err(IngestError::invariant(
                Stage::Collect,
                format!("unit at position {} has index {}", position, unit.unit_index),
            ));
        }
    }
    if !units.is_empty() && units.iter().all(RawUnit::is_degraded) {
        return Err(IngestError::ExtractionFailure(format!(
            "none of the {} units could be extracted",
            units.len()
        )));
    }
    Ok(())
}

fn validate_file(input: &FileInput) -> Result<InputCategory, IngestError> {
    if input.file_name.trim().is_empty() {
        return Err(IngestError::InvalidInput(
            "file name must not be empty".to_string(),
        ));
    }
    if input.size_bytes != input.bytes.len() as u64 {
        return Err(IngestError::InvalidInput(format!(
            "declared size {} does not match payload length {}",
            input.size_bytes,
            input.bytes.len()
        )));
    }
    let extension = input.effective_extension();
    if extension.is_empty() {
        return Err(IngestError::InvalidInput(format!(
            "cannot determine file type of '{}'",
            input.file_name
        )));
    }
    InputCategory::from_extension(&extension)
        .ok_or_else(|| IngestError::InvalidInput(format!("unsupported file type: .{}", extension)))
}

fn validate_url(url: &str) -> Result<reqwest::Url, IngestError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(IngestError::InvalidInput("url must not be empty".to_string()));
    }
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| IngestError::InvalidInput(format!("invalid url '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(IngestError::InvalidInput(format!(
            "unsupported url scheme: {}",
            other
        ))),
    }
}

/// Last non-empty path segment, or the host.
fn url_file_name(url: &reqwest::Url) -> Option<String> {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
