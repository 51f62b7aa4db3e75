//! Extraction strategy trait and built-in implementations.
//!
//! A strategy knows how to open one PDF and pull raw text out of a page
//! range. Everything above this layer (validation, fallback, cleaning,
//! metadata) is shared across strategies.

pub mod lopdf;
pub mod mock;

use std::path::Path;

use thiserror::Error;

/// Raw per-page output of a strategy, before any cleaning.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// 1-based page number.
    pub number: usize,
    pub text: String,
    /// Set when this page failed to extract; `text` is empty then.
    pub error: Option<String>,
}

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("failed to open PDF: {0}")]
    Open(String),

    #[error("failed to extract text: {0}")]
    Extract(String),
}

/// A text extraction strategy over a PDF file.
///
/// Implementations are synchronous; callers on the async runtime wrap them
/// in `spawn_blocking`. A failure on a single page is reported inline via
/// [`RawPage::error`]. An `Err` from either method fails the whole attempt
/// and lets the caller fall back to the next strategy.
pub trait ExtractionStrategy: Send + Sync {
    /// Short identifier used in logs and result provenance.
    fn name(&self) -> &'static str;

    /// Number of pages in the document.
    fn page_count(&self, path: &Path) -> Result<usize, StrategyError>;

    /// Extract raw text for the 0-based page range `first..last`.
    fn extract_range(&self, path: &Path, first: usize, last: usize)
    -> Result<Vec<RawPage>, StrategyError>;
}
