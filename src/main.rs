//! # Unified Ingest CLI (`ingest`)
//!
//! Runs the ingestion pipeline from the command line and prints the result
//! as JSON on stdout. Logs go to stderr and are filtered with `RUST_LOG`.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest file <PATH>` | Extract and score a local file |
//! | `ingest url <URL>` | Fetch and score a webpage |
//! | `ingest units <JSON>` | Score pre-extracted units (`-` reads stdin) |
//! | `ingest policy` | Print the effective scoring policy |
//!
//! ## Exit codes
//!
//! `0` on success, `2` when the request is rejected as bad input, `1` for
//! every other failure. Failed requests still print a JSON error body:
//!
//! ```json
//! { "error": { "code": "bad_input", "message": "invalid input: unsupported file type: .exe" } }
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use unified_ingest::config::{self, Config};
use unified_ingest::error::IngestError;
use unified_ingest::models::{
    FileInput, IngestRequest, IngestResult, InputCategory, RawUnit, SourceDescriptor,
};
use unified_ingest::pipeline::Pipeline;

/// Unified Ingest: normalize documents and webpages into scored text for
/// language models.
#[derive(Parser)]
#[command(name = "ingest", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and score a local file.
    File {
        path: PathBuf,

        /// File name to report instead of the path's own name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Fetch and score a webpage.
    Url { url: String },

    /// Score units that were extracted elsewhere.
    ///
    /// Reads a JSON array of units:
    /// `[{"unit_index": 0, "raw_text": "..."}, ...]`.
    Units {
        /// JSON file, or `-` for stdin.
        json: PathBuf,

        /// Input type to report (text, pdf, image, office, archive, url).
        #[arg(long, value_parser = parse_input_type)]
        input_type: Option<InputCategory>,

        /// File name to report.
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the effective scoring policy as JSON.
    Policy,
}

fn parse_input_type(s: &str) -> Result<InputCategory, String> {
    [
        InputCategory::Text,
        InputCategory::Pdf,
        InputCategory::Image,
        InputCategory::Office,
        InputCategory::Archive,
        InputCategory::Url,
    ]
    .into_iter()
    .find(|c| c.as_str() == s.to_ascii_lowercase())
    .ok_or_else(|| format!("unknown input type '{}'", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    let pipeline = || Pipeline::from_config(&cfg);
    let outcome = match cli.command {
        Commands::Policy => {
            println!("{}", serde_json::to_string_pretty(&cfg.policy())?);
            return Ok(ExitCode::SUCCESS);
        }
        Commands::File { path, name } => match read_file_input(&path, name).await {
            Ok(input) => pipeline()?.ingest(IngestRequest::File(input)).await,
            Err(e) => Err(e),
        },
        Commands::Url { url } => pipeline()?.ingest(IngestRequest::Url(url)).await,
        Commands::Units {
            json,
            input_type,
            name,
        } => match read_units(&json) {
            Ok(units) => {
                let source = units_source(&json, input_type, name, &units);
                pipeline()?.ingest_units(source, units).await
            }
            Err(e) => Err(e),
        },
    };

    report(outcome)
}

fn report(outcome: Result<IngestResult, IngestError>) -> anyhow::Result<ExitCode> {
    match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_body())?);
            Ok(match e {
                IngestError::InvalidInput(_) => ExitCode::from(2),
                _ => ExitCode::from(1),
            })
        }
    }
}

async fn read_file_input(path: &Path, name: Option<String>) -> Result<FileInput, IngestError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        IngestError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })?;
    let file_name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    Ok(FileInput::new(file_name, bytes))
}

fn read_units(path: &Path) -> Result<Vec<RawUnit>, IngestError> {
    let mut raw = String::new();
    let read = if path.as_os_str() == "-" {
        std::io::stdin().read_to_string(&mut raw).map(|_| ())
    } else {
        std::fs::read_to_string(path).map(|s| raw = s)
    };
    read.map_err(|e| IngestError::InvalidInput(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| IngestError::InvalidInput(format!("invalid units JSON: {}", e)))
}

fn units_source(
    path: &Path,
    input_type: Option<InputCategory>,
    name: Option<String>,
    units: &[RawUnit],
) -> SourceDescriptor {
    let file_name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "stdin".to_string())
    });
    let file_extension = Path::new(&file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let category = input_type
        .or_else(|| InputCategory::from_extension(&file_extension))
        .unwrap_or(InputCategory::Text);
    SourceDescriptor {
        category,
        file_name,
        file_extension,
        file_size_bytes: units.iter().map(|u| u.raw_text.len() as u64).sum(),
        source_url: None,
    }
}
