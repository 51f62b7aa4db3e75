//! Writers for the supported result formats.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parquet::data_type::{ByteArray, ByteArrayType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use pagemill_extract::ExtractedDocument;

use crate::rows::{RowSet, build_rows};
use crate::{OutputFormat, ReportError};

/// Write `doc` to disk in the requested format and return the path of the
/// file actually written.
///
/// `dest` carries the intended location; its extension is replaced with
/// the one matching the format actually used, so the returned path can
/// differ from `dest` when an unknown format name degrades to CSV. When
/// the primary write fails a one-row diagnostic CSV is written next to
/// `dest` instead; only a failure of that fallback surfaces as `Err`.
pub fn write_document(
    doc: &ExtractedDocument,
    dest: &Path,
    format_name: &str,
    text_only: bool,
) -> Result<PathBuf, ReportError> {
    let format = match OutputFormat::from_name(format_name) {
        Some(format) => format,
        None => {
            tracing::warn!(format = format_name, "unknown output format, writing CSV");
            OutputFormat::Csv
        }
    };
    let path = dest.with_extension(format.extension());

    match write_as(doc, &path, format, text_only) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "result file written");
            Ok(path)
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "result write failed");
            write_fallback(doc, dest, &e)
        }
    }
}

fn write_as(
    doc: &ExtractedDocument,
    path: &Path,
    format: OutputFormat,
    text_only: bool,
) -> Result<(), ReportError> {
    match format {
        OutputFormat::Csv => write_csv(&build_rows(doc, text_only), path),
        OutputFormat::Json => write_json(doc, text_only, path),
        OutputFormat::Parquet => write_parquet(&build_rows(doc, text_only), path),
    }
}

// ── CSV ─────────────────────────────────────────────────────────────────────

fn csv_escape(s: &str) -> String {
    if s.contains('"') || s.contains(',') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn write_csv(rows: &RowSet, path: &Path) -> Result<(), ReportError> {
    let mut out = String::new();
    let header: Vec<String> = rows.columns.iter().map(|c| csv_escape(c)).collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in &rows.rows {
        let fields: Vec<String> = row.iter().map(|v| csv_escape(v)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    let mut file = File::create(path)?;
    file.write_all(out.as_bytes())?;
    Ok(())
}

// ── JSON ────────────────────────────────────────────────────────────────────

/// JSON keeps the full nested document rather than the flattened rows; in
/// text-only mode it reduces to a bare line list.
fn write_json(doc: &ExtractedDocument, text_only: bool, path: &Path) -> Result<(), ReportError> {
    let file = File::create(path)?;
    if text_only {
        let rows = build_rows(doc, true);
        let texts: Vec<&str> = rows.rows.iter().map(|r| r[0].as_str()).collect();
        serde_json::to_writer_pretty(file, &serde_json::json!({ "texts": texts }))
            .map_err(|e| ReportError::Encode(e.to_string()))?;
    } else {
        serde_json::to_writer_pretty(file, doc).map_err(|e| ReportError::Encode(e.to_string()))?;
    }
    Ok(())
}

// ── Parquet ─────────────────────────────────────────────────────────────────

/// Page numbers are the only non-string column; everything else is UTF8.
fn parquet_message(columns: &[String]) -> String {
    let mut message = String::from("message row {\n");
    for column in columns {
        if column == "page_number" {
            message.push_str(&format!("  required int64 {column};\n"));
        } else {
            message.push_str(&format!("  required binary {column} (UTF8);\n"));
        }
    }
    message.push('}');
    message
}

fn write_parquet(rows: &RowSet, path: &Path) -> Result<(), ReportError> {
    let schema = parse_message_type(&parquet_message(&rows.columns))
        .map_err(|e| ReportError::Encode(e.to_string()))?;
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path)?;

    let mut writer = SerializedFileWriter::new(file, Arc::new(schema), props)
        .map_err(|e| ReportError::Encode(e.to_string()))?;
    let mut group = writer
        .next_row_group()
        .map_err(|e| ReportError::Encode(e.to_string()))?;

    let mut index = 0;
    while let Some(mut column) = group
        .next_column()
        .map_err(|e| ReportError::Encode(e.to_string()))?
    {
        if rows.columns[index] == "page_number" {
            let values: Vec<i64> = rows
                .rows
                .iter()
                .map(|r| r[index].parse::<i64>().unwrap_or(0))
                .collect();
            column
                .typed::<Int64Type>()
                .write_batch(&values, None, None)
                .map_err(|e| ReportError::Encode(e.to_string()))?;
        } else {
            let values: Vec<ByteArray> = rows
                .rows
                .iter()
                .map(|r| ByteArray::from(r[index].as_str()))
                .collect();
            column
                .typed::<ByteArrayType>()
                .write_batch(&values, None, None)
                .map_err(|e| ReportError::Encode(e.to_string()))?;
        }
        column
            .close()
            .map_err(|e| ReportError::Encode(e.to_string()))?;
        index += 1;
    }

    group.close().map_err(|e| ReportError::Encode(e.to_string()))?;
    writer
        .close()
        .map_err(|e| ReportError::Encode(e.to_string()))?;
    Ok(())
}

// ── Fallback ────────────────────────────────────────────────────────────────

/// Last-resort artifact: a one-row CSV noting the failure, placed next to
/// the intended destination.
fn write_fallback(
    doc: &ExtractedDocument,
    dest: &Path,
    error: &ReportError,
) -> Result<PathBuf, ReportError> {
    let stem = dest
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("result");
    let path = dest.with_file_name(format!("{stem}_fallback.csv"));

    let content = format!(
        "source_file,error\n{},{}\n",
        csv_escape(&doc.source_file),
        csv_escape(&error.to_string()),
    );
    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;

    tracing::warn!(path = %path.display(), "wrote fallback diagnostic file");
    Ok(path)
}
