//! PDF text extraction with ordered strategy fallback.
//!
//! The [`Extractor`] validates an input file, runs it through one or more
//! [`ExtractionStrategy`] implementations and returns cleaned per-page text
//! plus best-effort document metadata as an [`ExtractedDocument`].
//!
//! Strategies are tried in registration order. When a strategy fails the
//! next one restarts from scratch; there is no partial-result carryover.
//! A failure on a single page does not fail the attempt: it is recorded
//! inline on that page's [`PageRecord`].

pub mod cleaning;
pub mod metadata;
pub mod strategy;
mod validate;

pub use strategy::{ExtractionStrategy, RawPage, StrategyError};
pub use validate::validate_pdf;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("file not found: {0}")]
    Missing(std::path::PathBuf),

    #[error("not a PDF file: {0}")]
    BadExtension(std::path::PathBuf),

    #[error("missing PDF signature: {0}")]
    BadSignature(std::path::PathBuf),

    #[error("no extraction strategy registered for method '{0}'")]
    NoStrategy(&'static str),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// True for errors raised by input validation rather than extraction.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ExtractError::Missing(_) | ExtractError::BadExtension(_) | ExtractError::BadSignature(_)
        )
    }
}

// ── Domain types ────────────────────────────────────────────────────────────

/// Which strategies an extraction run may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMethod {
    /// Try every registered strategy in order until one succeeds.
    #[default]
    Auto,
    /// Only the first registered strategy, no fallback.
    Primary,
    /// Only the second registered strategy, no fallback.
    Secondary,
}

impl ExtractionMethod {
    /// Parse a user-supplied method name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "auto" => Some(ExtractionMethod::Auto),
            "primary" => Some(ExtractionMethod::Primary),
            "secondary" => Some(ExtractionMethod::Secondary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Auto => "auto",
            ExtractionMethod::Primary => "primary",
            ExtractionMethod::Secondary => "secondary",
        }
    }
}

/// One page of extracted text.
///
/// `number` is 1-based. A page that failed to extract keeps its position
/// with empty `content` and the failure text in `error`.
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub number: usize,
    pub content: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a successful extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    /// File name of the source PDF, without its directory.
    pub source_file: String,
    /// Name of the strategy that produced this result.
    pub method: String,
    /// RFC 3339 timestamp of when extraction finished.
    pub extracted_at: String,
    pub page_count: usize,
    /// Document metadata; empty when metadata was not requested or the
    /// document carries none.
    pub metadata: BTreeMap<String, String>,
    pub pages: Vec<PageRecord>,
}

impl ExtractedDocument {
    /// Total number of cleaned text lines across all pages.
    pub fn total_lines(&self) -> usize {
        self.pages.iter().map(|p| p.content.len()).sum()
    }

    /// First per-page error, if any page failed.
    pub fn first_page_error(&self) -> Option<&str> {
        self.pages.iter().find_map(|p| p.error.as_deref())
    }
}

// ── Extractor ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Documents with more pages than this are extracted in page groups
    /// of this size instead of one pass.
    pub chunk_size: usize,
    /// Files at or above this size in MiB log a warning and take the
    /// grouped path regardless of page count.
    pub max_file_mb: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            chunk_size: 1000,
            max_file_mb: 100,
        }
    }
}

/// Runs extraction strategies over PDF files.
///
/// The strategy list is ordered: index 0 is the primary, index 1 the
/// secondary. [`ExtractionMethod::Auto`] walks the whole list.
pub struct Extractor {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
    config: ExtractConfig,
}

impl Extractor {
    pub fn new(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
        Self::with_config(strategies, ExtractConfig::default())
    }

    pub fn with_config(strategies: Vec<Arc<dyn ExtractionStrategy>>, config: ExtractConfig) -> Self {
        Extractor { strategies, config }
    }

    /// Names of the registered strategies, in fallback order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Validate `path` and extract its text with the strategies `method`
    /// allows.
    ///
    /// Validation failures surface as their own error variants before any
    /// strategy runs. When every permitted strategy fails, the per-strategy
    /// failures are joined into [`ExtractError::Extraction`].
    pub fn extract(
        &self,
        path: &Path,
        method: ExtractionMethod,
        include_metadata: bool,
    ) -> Result<ExtractedDocument, ExtractError> {
        validate::validate_pdf(path)?;

        let mut failures = Vec::new();
        for strategy in self.select(method)? {
            let name = strategy.name();
            tracing::debug!(strategy = name, path = %path.display(), "starting extraction");
            match self.run_strategy(strategy, path) {
                Ok((raw, page_count)) => {
                    return Ok(self.assemble(path, name, raw, page_count, include_metadata));
                }
                Err(e) => {
                    tracing::warn!(strategy = name, error = %e, "extraction strategy failed");
                    failures.push(format!("{name}: {e}"));
                }
            }
        }
        Err(ExtractError::Extraction(failures.join("; ")))
    }

    fn select(&self, method: ExtractionMethod) -> Result<Vec<&dyn ExtractionStrategy>, ExtractError> {
        match method {
            ExtractionMethod::Auto => {
                if self.strategies.is_empty() {
                    return Err(ExtractError::NoStrategy("auto"));
                }
                Ok(self.strategies.iter().map(|s| s.as_ref()).collect())
            }
            ExtractionMethod::Primary => self
                .strategies
                .first()
                .map(|s| vec![s.as_ref()])
                .ok_or(ExtractError::NoStrategy("primary")),
            ExtractionMethod::Secondary => self
                .strategies
                .get(1)
                .map(|s| vec![s.as_ref()])
                .ok_or(ExtractError::NoStrategy("secondary")),
        }
    }

    /// One full attempt with a single strategy. Any error here aborts the
    /// attempt and lets the caller move on to the next strategy.
    fn run_strategy(
        &self,
        strategy: &dyn ExtractionStrategy,
        path: &Path,
    ) -> Result<(Vec<RawPage>, usize), StrategyError> {
        let page_count = strategy.page_count(path)?;

        let file_mb = std::fs::metadata(path)
            .map(|m| m.len() / (1024 * 1024))
            .unwrap_or(0);
        let oversized = file_mb >= self.config.max_file_mb;
        if oversized {
            tracing::warn!(
                path = %path.display(),
                size_mb = file_mb,
                limit_mb = self.config.max_file_mb,
                "large input, switching to grouped page extraction"
            );
        }

        let raw = if oversized || page_count > self.config.chunk_size {
            let mut pages = Vec::with_capacity(page_count);
            let mut first = 0;
            while first < page_count {
                let last = (first + self.config.chunk_size).min(page_count);
                tracing::debug!(first = first + 1, last, "extracting page group");
                pages.extend(strategy.extract_range(path, first, last)?);
                first = last;
            }
            pages
        } else {
            strategy.extract_range(path, 0, page_count)?
        };
        Ok((raw, page_count))
    }

    fn assemble(
        &self,
        path: &Path,
        strategy_name: &str,
        raw: Vec<RawPage>,
        page_count: usize,
        include_metadata: bool,
    ) -> ExtractedDocument {
        let pages = raw
            .into_iter()
            .map(|page| match page.error {
                Some(error) => PageRecord {
                    number: page.number,
                    content: Vec::new(),
                    error: Some(error),
                },
                None => PageRecord {
                    number: page.number,
                    content: cleaning::clean_page(&page.text),
                    error: None,
                },
            })
            .collect();

        let metadata = if include_metadata {
            metadata::read_metadata(path)
        } else {
            BTreeMap::new()
        };

        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        ExtractedDocument {
            source_file,
            method: strategy_name.to_string(),
            extracted_at: chrono::Utc::now().to_rfc3339(),
            page_count,
            metadata,
            pages,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
