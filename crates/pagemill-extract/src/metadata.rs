//! Best-effort document metadata from the PDF Info dictionary.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, Object};

/// Info dictionary keys worth surfacing, with their exported names.
const INFO_KEYS: [(&[u8], &str); 8] = [
    (b"Title", "title"),
    (b"Author", "author"),
    (b"Subject", "subject"),
    (b"Keywords", "keywords"),
    (b"Creator", "creator"),
    (b"Producer", "producer"),
    (b"CreationDate", "creation_date"),
    (b"ModDate", "mod_date"),
];

/// Read the Info dictionary and page count from `path`.
///
/// This never fails: a document that cannot be parsed, or has no Info
/// dictionary, just yields fewer entries. Extraction does not depend on
/// anything returned here.
pub fn read_metadata(path: &Path) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();

    let doc = match Document::load(path) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "metadata read skipped");
            return meta;
        }
    };
    meta.insert("page_count".to_string(), doc.get_pages().len().to_string());

    let info = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => doc.get_object(*id).ok().and_then(|o| o.as_dict().ok()),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let Some(info) = info else {
        return meta;
    };

    for (raw_key, name) in INFO_KEYS {
        if let Ok(Object::String(bytes, _)) = info.get(raw_key) {
            let value = decode_text(bytes);
            if !value.is_empty() {
                meta.insert(name.to_string(), value);
            }
        }
    }
    meta
}

/// PDF text strings are UTF-16BE when they carry a BOM, otherwise
/// PDFDocEncoding, which matches Latin-1 over the printable range.
fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units).trim().to_string();
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim().to_string(),
        Err(_) => {
            let latin1: String = bytes.iter().map(|&b| b as char).collect();
            latin1.trim().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_file_yields_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.pdf");
        std::fs::write(&path, b"%PDF-1.4 but nothing else").unwrap();
        assert!(read_metadata(&path).is_empty());
    }

    #[test]
    fn missing_file_yields_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_metadata(&dir.path().join("gone.pdf")).is_empty());
    }

    #[test]
    fn decodes_plain_ascii() {
        assert_eq!(decode_text(b"  A Title "), "A Title");
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Caf\u{00E9}".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_text(&bytes), "Caf\u{00E9}");
    }

    #[test]
    fn decodes_latin1_fallback() {
        // 0xE9 is not valid UTF-8 on its own but is é in Latin-1.
        assert_eq!(decode_text(&[b'c', b'a', b'f', 0xE9]), "caf\u{00E9}");
    }
}
