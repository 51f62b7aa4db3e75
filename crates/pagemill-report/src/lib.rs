//! Turns an extracted document into an on-disk result artifact.
//!
//! CSV and Parquet share a flattened row model (one row per page line, see
//! [`rows`]); JSON keeps the full nested document. An unknown format
//! degrades to CSV, and a failed write degrades to a single-row diagnostic
//! file before the caller ever sees an error.

pub mod rows;

mod export;

pub use export::write_document;
pub use rows::{RowSet, build_rows};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to encode result: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output formats a result file can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Parquet,
}

impl OutputFormat {
    pub fn all() -> &'static [OutputFormat] {
        &[OutputFormat::Csv, OutputFormat::Json, OutputFormat::Parquet]
    }

    /// Parse a user-supplied format name, case-insensitively. Unknown
    /// names yield `None`; the writer treats those as CSV.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            "parquet" => Some(OutputFormat::Parquet),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Parquet => "parquet",
        }
    }

    /// Content type for serving a file of this format over HTTP.
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Parquet => "application/octet-stream",
        }
    }
}
