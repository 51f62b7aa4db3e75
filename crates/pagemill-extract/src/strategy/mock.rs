//! Scriptable strategy for tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ExtractionStrategy, RawPage, StrategyError};

/// Scripted outcome for one page of a [`MockStrategy`].
#[derive(Debug, Clone)]
pub enum MockPage {
    Text(String),
    Fail(String),
}

impl MockPage {
    pub fn text(text: &str) -> Self {
        MockPage::Text(text.to_string())
    }

    pub fn fail(message: &str) -> Self {
        MockPage::Fail(message.to_string())
    }
}

/// An [`ExtractionStrategy`] that returns scripted pages and counts how
/// often its range method is called. Never reads the file.
pub struct MockStrategy {
    name: &'static str,
    pages: Vec<MockPage>,
    /// When set, every call fails outright with this message.
    broken: Option<String>,
    range_calls: AtomicUsize,
}

impl MockStrategy {
    pub fn new(name: &'static str, pages: Vec<MockPage>) -> Self {
        MockStrategy {
            name,
            pages,
            broken: None,
            range_calls: AtomicUsize::new(0),
        }
    }

    /// A strategy whose every call fails, for exercising fallback.
    pub fn failing(name: &'static str, message: &str) -> Self {
        MockStrategy {
            name,
            pages: Vec::new(),
            broken: Some(message.to_string()),
            range_calls: AtomicUsize::new(0),
        }
    }

    /// Number of extraction attempts observed so far.
    pub fn call_count(&self) -> usize {
        self.range_calls.load(Ordering::SeqCst)
    }
}

impl ExtractionStrategy for MockStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn page_count(&self, _path: &Path) -> Result<usize, StrategyError> {
        match &self.broken {
            Some(message) => {
                self.range_calls.fetch_add(1, Ordering::SeqCst);
                Err(StrategyError::Open(message.clone()))
            }
            None => Ok(self.pages.len()),
        }
    }

    fn extract_range(
        &self,
        _path: &Path,
        first: usize,
        last: usize,
    ) -> Result<Vec<RawPage>, StrategyError> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.broken {
            return Err(StrategyError::Extract(message.clone()));
        }
        Ok(self.pages[first..last]
            .iter()
            .enumerate()
            .map(|(offset, page)| {
                let number = first + offset + 1;
                match page {
                    MockPage::Text(text) => RawPage {
                        number,
                        text: text.clone(),
                        error: None,
                    },
                    MockPage::Fail(message) => RawPage {
                        number,
                        text: String::new(),
                        error: Some(message.clone()),
                    },
                }
            })
            .collect())
    }
}
