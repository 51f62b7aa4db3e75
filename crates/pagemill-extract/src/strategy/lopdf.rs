//! Pure-Rust extraction backed by `lopdf`.

use std::path::Path;

use super::{ExtractionStrategy, RawPage, StrategyError};

/// Extraction via the `lopdf` parser.
///
/// Less layout-aware than MuPDF but free of native dependencies, which
/// makes it the fallback of choice when the primary strategy chokes on a
/// document.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfStrategy;

impl LopdfStrategy {
    fn load(path: &Path) -> Result<lopdf::Document, StrategyError> {
        lopdf::Document::load(path).map_err(|e| StrategyError::Open(e.to_string()))
    }
}

impl ExtractionStrategy for LopdfStrategy {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn page_count(&self, path: &Path) -> Result<usize, StrategyError> {
        Ok(Self::load(path)?.get_pages().len())
    }

    fn extract_range(
        &self,
        path: &Path,
        first: usize,
        last: usize,
    ) -> Result<Vec<RawPage>, StrategyError> {
        let doc = Self::load(path)?;
        let mut pages = Vec::with_capacity(last.saturating_sub(first));
        for index in first..last {
            let number = index + 1;
            match doc.extract_text(&[number as u32]) {
                Ok(text) => pages.push(RawPage {
                    number,
                    text,
                    error: None,
                }),
                Err(e) => {
                    tracing::debug!(page = number, error = %e, "page extraction failed");
                    pages.push(RawPage {
                        number,
                        text: String::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        Ok(pages)
    }
}
