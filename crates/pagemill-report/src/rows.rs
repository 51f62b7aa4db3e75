//! Flattening of extracted documents into tabular rows.
//!
//! One row per cleaned line, carrying its page number and a copy of the
//! document-level metadata in `meta_`-prefixed columns so line and
//! metadata fields cannot collide. A page that failed to extract
//! contributes one row with the error text instead of line text.

use pagemill_extract::ExtractedDocument;

/// Text placed in the diagnostic row when a document yields nothing.
pub const NO_CONTENT_NOTE: &str = "No text content extracted";

/// Column-ordered tabular view of one document, shared by the CSV and
/// Parquet writers.
#[derive(Debug, Clone)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Flatten `doc` into rows.
///
/// With `text_only` the result is a single `text` column with no page
/// numbers or metadata. Either way the row set is never empty: a document
/// with no usable lines gets one diagnostic row.
pub fn build_rows(doc: &ExtractedDocument, text_only: bool) -> RowSet {
    if text_only {
        return build_text_only(doc);
    }

    let mut columns = vec![
        "page_number".to_string(),
        "text".to_string(),
        "error".to_string(),
    ];
    columns.extend(doc.metadata.keys().map(|k| format!("meta_{k}")));
    let meta_values: Vec<&str> = doc.metadata.values().map(String::as_str).collect();

    let mut rows = Vec::new();
    for page in &doc.pages {
        if let Some(error) = &page.error {
            rows.push(make_row(page.number, "", error, &meta_values));
            continue;
        }
        for line in &page.content {
            rows.push(make_row(page.number, line, "", &meta_values));
        }
    }
    if rows.is_empty() {
        rows.push(make_row(0, NO_CONTENT_NOTE, "", &meta_values));
    }

    RowSet { columns, rows }
}

fn build_text_only(doc: &ExtractedDocument) -> RowSet {
    let mut rows: Vec<Vec<String>> = doc
        .pages
        .iter()
        .flat_map(|p| p.content.iter())
        .map(|line| vec![line.clone()])
        .collect();
    if rows.is_empty() {
        rows.push(vec![NO_CONTENT_NOTE.to_string()]);
    }
    RowSet {
        columns: vec!["text".to_string()],
        rows,
    }
}

fn make_row(page: usize, text: &str, error: &str, meta_values: &[&str]) -> Vec<String> {
    let mut row = Vec::with_capacity(3 + meta_values.len());
    row.push(page.to_string());
    row.push(text.to_string());
    row.push(error.to_string());
    row.extend(meta_values.iter().map(|v| v.to_string()));
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagemill_extract::{ExtractedDocument, PageRecord};
    use std::collections::BTreeMap;

    // ── helpers ──────────────────────────────────────────────────────

    fn make_page(number: usize, lines: &[&str]) -> PageRecord {
        PageRecord {
            number,
            content: lines.iter().map(|l| l.to_string()).collect(),
            error: None,
        }
    }

    fn make_failed_page(number: usize, error: &str) -> PageRecord {
        PageRecord {
            number,
            content: vec![],
            error: Some(error.to_string()),
        }
    }

    fn make_doc(pages: Vec<PageRecord>, metadata: &[(&str, &str)]) -> ExtractedDocument {
        let metadata: BTreeMap<String, String> = metadata
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ExtractedDocument {
            source_file: "doc.pdf".to_string(),
            method: "mock".to_string(),
            extracted_at: "2026-01-01T00:00:00Z".to_string(),
            page_count: pages.len(),
            metadata,
            pages,
        }
    }

    // ── row building ─────────────────────────────────────────────────

    #[test]
    fn test_one_row_per_line_with_page_numbers() {
        let doc = make_doc(
            vec![make_page(1, &["a", "b"]), make_page(2, &["c"])],
            &[],
        );
        let set = build_rows(&doc, false);

        assert_eq!(set.columns, vec!["page_number", "text", "error"]);
        assert_eq!(set.rows.len(), 3);
        assert_eq!(set.rows[0], vec!["1", "a", ""]);
        assert_eq!(set.rows[1], vec!["1", "b", ""]);
        assert_eq!(set.rows[2], vec!["2", "c", ""]);
    }

    #[test]
    fn test_metadata_columns_are_prefixed_and_sorted() {
        let doc = make_doc(
            vec![make_page(1, &["a"])],
            &[("title", "T"), ("author", "A")],
        );
        let set = build_rows(&doc, false);

        // BTreeMap ordering puts author before title.
        assert_eq!(
            set.columns,
            vec!["page_number", "text", "error", "meta_author", "meta_title"]
        );
        assert_eq!(set.rows[0], vec!["1", "a", "", "A", "T"]);
    }

    #[test]
    fn test_failed_page_contributes_one_error_row() {
        let doc = make_doc(
            vec![make_page(1, &["ok"]), make_failed_page(2, "boom")],
            &[],
        );
        let set = build_rows(&doc, false);

        assert_eq!(set.rows.len(), 2);
        assert_eq!(set.rows[1], vec!["2", "", "boom"]);
    }

    #[test]
    fn test_empty_document_gets_diagnostic_row() {
        let doc = make_doc(vec![], &[("title", "T")]);
        let set = build_rows(&doc, false);

        assert_eq!(set.rows.len(), 1);
        assert_eq!(set.rows[0], vec!["0", NO_CONTENT_NOTE, "", "T"]);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_pages_with_no_surviving_lines_get_diagnostic_row() {
        let doc = make_doc(vec![make_page(1, &[]), make_page(2, &[])], &[]);
        let set = build_rows(&doc, false);
        assert_eq!(set.rows.len(), 1);
        assert_eq!(set.rows[0][1], NO_CONTENT_NOTE);
    }

    // ── text-only mode ───────────────────────────────────────────────

    #[test]
    fn test_text_only_single_column() {
        let doc = make_doc(
            vec![make_page(1, &["a", "b"]), make_page(2, &["c"])],
            &[("title", "ignored")],
        );
        let set = build_rows(&doc, true);

        assert_eq!(set.columns, vec!["text"]);
        assert_eq!(set.rows, vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn test_text_only_empty_document_gets_note() {
        let doc = make_doc(vec![], &[]);
        let set = build_rows(&doc, true);
        assert_eq!(set.rows, vec![vec![NO_CONTENT_NOTE.to_string()]]);
    }
}
