//! Collaborator traits at the pipeline boundary.
//!
//! The pipeline never reads files or talks to the network itself. It asks a
//! [`UnitExtractor`] for the units of a file and a [`PageFetcher`] for the
//! body of a URL, then runs the same scoring pipeline on whatever comes back.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ UnitExtractor│   │ PageFetcher  │
//! │ text/pdf/ocr │   │ http + html  │
//! └──────┬───────┘   └──────┬───────┘
//!        └────────┬─────────┘
//!                 ▼
//!         Vec<RawUnit> → Pipeline
//! ```
//!
//! The built-in implementations are [`LocalExtractor`](crate::extract::LocalExtractor)
//! and [`HttpFetcher`](crate::fetch::HttpFetcher). Tests and embedders can
//! supply their own.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use unified_ingest::extract::ExtractError;
//! use unified_ingest::models::{FileInput, RawUnit};
//! use unified_ingest::traits::UnitExtractor;
//!
//! pub struct UppercaseExtractor;
//!
//! #[async_trait]
//! impl UnitExtractor for UppercaseExtractor {
//!     fn name(&self) -> &str { "uppercase" }
//!
//!     async fn extract(&self, input: &FileInput) -> Result<Vec<RawUnit>, ExtractError> {
//!         let text = String::from_utf8_lossy(&input.bytes).to_uppercase();
//!         Ok(vec![RawUnit::text(0, text)])
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::extract::ExtractError;
use crate::fetch::FetchError;
use crate::models::{FileInput, RawUnit};

/// Produces the ordered units of a file.
///
/// Returned units must carry contiguous `unit_index` values starting at 0.
/// A unit that cannot be read should be returned as
/// [`RawUnit::degraded`]; an `Err` fails the whole request.
#[async_trait]
pub trait UnitExtractor: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn extract(&self, input: &FileInput) -> Result<Vec<RawUnit>, ExtractError>;
}

/// A fetched webpage reduced to text.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: String,
    pub text: String,
    /// Size of the response body in bytes.
    pub body_bytes: u64,
}

/// Fetches a URL and returns its body as one text unit.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}
