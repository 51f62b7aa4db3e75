//! Input validation, run before any strategy touches the file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::ExtractError;

/// PDF files open with `%PDF-` followed by the version number.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Check that `path` is an existing file, carries a `.pdf` extension and
/// starts with the PDF signature bytes. Each failure maps to its own
/// [`ExtractError`] variant so callers can tell validation problems apart
/// from extraction ones.
pub fn validate_pdf(path: &Path) -> Result<(), ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::Missing(path.to_path_buf()));
    }

    let has_pdf_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !has_pdf_ext {
        return Err(ExtractError::BadExtension(path.to_path_buf()));
    }

    let mut head = Vec::with_capacity(PDF_MAGIC.len());
    File::open(path)?
        .take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut head)?;
    if head != PDF_MAGIC {
        return Err(ExtractError::BadSignature(path.to_path_buf()));
    }
    Ok(())
}
