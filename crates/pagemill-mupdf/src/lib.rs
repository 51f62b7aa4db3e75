use std::path::Path;

use mupdf::{Document, TextPageFlags};

use pagemill_extract::{ExtractionStrategy, RawPage, StrategyError};

/// MuPDF-based implementation of [`ExtractionStrategy`].
///
/// The mupdf dependency is AGPL-3.0, so it lives behind this crate
/// boundary: callers that never register the strategy do not
/// transitively depend on it. Registered first, it is the primary
/// strategy; `lopdf` covers documents it cannot open.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfStrategy;

impl MupdfStrategy {
    pub fn new() -> Self {
        Self
    }

    fn open(path: &Path) -> Result<Document, StrategyError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| StrategyError::Open("invalid path encoding".into()))?;
        Document::open(path_str).map_err(|e| StrategyError::Open(e.to_string()))
    }

    /// Block/line iteration matches what a plain text dump of the page
    /// would produce, one line per text line.
    fn page_text(page: &mupdf::Page) -> Result<String, mupdf::Error> {
        let text_page = page.to_text_page(TextPageFlags::empty())?;
        let mut text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                text.push_str(&line_text);
                text.push('\n');
            }
        }
        Ok(text)
    }
}

impl ExtractionStrategy for MupdfStrategy {
    fn name(&self) -> &'static str {
        "mupdf"
    }

    fn page_count(&self, path: &Path) -> Result<usize, StrategyError> {
        let document = Self::open(path)?;
        Ok(document
            .pages()
            .map_err(|e| StrategyError::Extract(e.to_string()))?
            .count())
    }

    fn extract_range(
        &self,
        path: &Path,
        first: usize,
        last: usize,
    ) -> Result<Vec<RawPage>, StrategyError> {
        let document = Self::open(path)?;
        let mut pages = Vec::with_capacity(last.saturating_sub(first));

        for (index, page_result) in document
            .pages()
            .map_err(|e| StrategyError::Extract(e.to_string()))?
            .enumerate()
        {
            if index < first {
                continue;
            }
            if index >= last {
                break;
            }
            let number = index + 1;
            match page_result.and_then(|page| Self::page_text(&page)) {
                Ok(text) => pages.push(RawPage {
                    number,
                    text,
                    error: None,
                }),
                Err(e) => pages.push(RawPage {
                    number,
                    text: String::new(),
                    error: Some(e.to_string()),
                }),
            }
        }
        Ok(pages)
    }
}
