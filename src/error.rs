//! Request-level error taxonomy.
//!
//! Every failure of a pipeline run surfaces as one [`IngestError`] and no
//! partial result. The request-handling layer maps [`IngestError::code`] to a
//! JSON body and [`IngestError::status`] to an HTTP status.
//!
//! ```json
//! { "error": { "code": "extraction_failed", "message": "PDF extraction failed: ..." } }
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Missing or malformed request. Raised before the pipeline starts.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The extraction or fetch collaborator could not produce units.
    #[error("extraction failed: {0}")]
    ExtractionFailure(String),

    /// An internal consistency check failed between stages.
    #[error("aggregation invariant violated at {stage}: {detail}")]
    AggregationInvariantViolation { stage: Stage, detail: String },
}

impl IngestError {
    pub fn invariant(stage: Stage, detail: impl Into<String>) -> Self {
        Self::AggregationInvariantViolation {
            stage,
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::InvalidInput(_) => "bad_input",
            IngestError::ExtractionFailure(_) => "extraction_failed",
            IngestError::AggregationInvariantViolation { .. } => "internal",
        }
    }

    /// HTTP status the request-handling layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            IngestError::InvalidInput(_) => 400,
            IngestError::ExtractionFailure(_) | IngestError::AggregationInvariantViolation { .. } => {
                500
            }
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
