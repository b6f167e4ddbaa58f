//! # Unified Ingest
//!
//! Turns uploaded documents and webpages into one normalized block of text,
//! scored for how much a language model should trust it.
//!
//! Every input, whatever its format, becomes an ordered list of units (pages,
//! slides, sheets, or a single fetched page). Each unit is measured, the
//! measurements are folded into a noise level and an overall confidence, and
//! the result recommends how strictly a downstream model should stick to the
//! text.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ LocalExtract │   │ HttpFetcher  │
//! │ pdf/ooxml/ocr│   │ html → text  │
//! └──────┬───────┘   └──────┬───────┘
//!        └────────┬─────────┘
//!                 ▼  Vec<RawUnit>
//!        ┌─────────────────┐    ┌────────────┐
//!        │    Pipeline     │◀──▶│ WorkerPool │
//!        │ signals → noise │    │ (per unit) │
//!        │ → confidence →  │    └────────────┘
//!        │ normalize → mode│
//!        └────────┬────────┘
//!                 ▼
//!           IngestResult (JSON, schema 1.3)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ingest file ./report.pdf          # score a local document
//! ingest url https://example.com/   # score a webpage
//! ingest policy                     # print the effective scoring policy
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and the scoring policy |
//! | [`models`] | Units, records, and the result contract |
//! | [`error`] | Request-level error taxonomy |
//! | [`traits`] | Extraction and fetch collaborator traits |
//! | [`extract`] | Local file extraction (text, PDF, OOXML, OCR, ZIP) |
//! | [`fetch`] | HTTP fetch and HTML-to-text |
//! | [`signals`] | Per-unit signal extraction |
//! | [`noise`] | Noise classification |
//! | [`confidence`] | Overall confidence scoring |
//! | [`normalize`] | Text normalization and joining |
//! | [`guidance`] | Recommended model mode and input warnings |
//! | [`pool`] | Bounded per-unit worker pool |
//! | [`pipeline`] | Request orchestration |

pub mod confidence;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod guidance;
pub mod models;
pub mod noise;
pub mod normalize;
pub mod pipeline;
pub mod pool;
pub mod signals;
pub mod traits;
