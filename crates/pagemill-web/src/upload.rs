use axum::extract::Multipart;
use pagemill_core::ProcessingOptions;
use pagemill_extract::ExtractionMethod;

/// An uploaded file plus the processing options sent alongside it.
#[derive(Debug)]
pub struct UploadForm {
    pub filename: String,
    pub data: Vec<u8>,
    pub options: ProcessingOptions,
}

/// Whether a client-supplied filename names a PDF.
pub fn is_pdf_filename(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Apply one option form field to the processing options. Values are
/// lenient: anything empty or unrecognized keeps the default.
fn apply_option_field(options: &mut ProcessingOptions, name: &str, value: &str) {
    match name {
        "output_format" => {
            if !value.is_empty() {
                options.output_format = value.to_string();
            }
        }
        "extraction_method" => {
            if let Some(method) = ExtractionMethod::from_name(value) {
                options.method = method;
            }
        }
        "include_metadata" => options.include_metadata = value != "false",
        "text_only" => options.text_only = value == "true",
        _ => {}
    }
}

/// Parse a multipart form upload into the file and its options. Option
/// fields are lenient: anything missing or unrecognized keeps its default.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<UploadForm, String> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut options = ProcessingOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read file data: {}", e))?
                    .to_vec();
                file = Some((filename, data));
            }
            "output_format" | "extraction_method" | "include_metadata" | "text_only" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read {}: {}", name, e))?;
                apply_option_field(&mut options, &name, &value);
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    let (filename, data) = file.ok_or("No file uploaded")?;

    Ok(UploadForm {
        filename,
        data,
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_pdf_filenames() {
        assert!(is_pdf_filename("paper.pdf"));
        assert!(is_pdf_filename("REPORT.PDF"));
        assert!(is_pdf_filename("dir/nested.pdf"));
    }

    #[test]
    fn rejects_other_filenames() {
        assert!(!is_pdf_filename("notes.txt"));
        assert!(!is_pdf_filename("archive.pdf.zip"));
        assert!(!is_pdf_filename("pdf"));
        assert!(!is_pdf_filename(""));
    }

    #[test]
    fn unknown_method_name_keeps_auto() {
        let mut options = ProcessingOptions::default();
        apply_option_field(&mut options, "extraction_method", "turbo");
        assert_eq!(options.method, ExtractionMethod::Auto);

        apply_option_field(&mut options, "extraction_method", "secondary");
        assert_eq!(options.method, ExtractionMethod::Secondary);
    }

    #[test]
    fn include_metadata_flips_only_on_literal_false() {
        let mut options = ProcessingOptions::default();
        apply_option_field(&mut options, "include_metadata", "no");
        assert!(options.include_metadata);
        apply_option_field(&mut options, "include_metadata", "false");
        assert!(!options.include_metadata);
    }

    #[test]
    fn text_only_requires_literal_true() {
        let mut options = ProcessingOptions::default();
        apply_option_field(&mut options, "text_only", "1");
        assert!(!options.text_only);
        apply_option_field(&mut options, "text_only", "true");
        assert!(options.text_only);
    }

    #[test]
    fn empty_format_value_keeps_default() {
        let mut options = ProcessingOptions::default();
        apply_option_field(&mut options, "output_format", "");
        assert_eq!(options.output_format, "csv");
        apply_option_field(&mut options, "output_format", "parquet");
        assert_eq!(options.output_format, "parquet");
    }

    #[test]
    fn unrelated_field_names_change_nothing() {
        let mut options = ProcessingOptions::default();
        apply_option_field(&mut options, "compression", "9");
        assert_eq!(options.output_format, "csv");
        assert_eq!(options.method, ExtractionMethod::Auto);
        assert!(options.include_metadata);
        assert!(!options.text_only);
    }

    async fn form_from(body: &'static str) -> Multipart {
        use axum::extract::FromRequest;

        let request = axum::http::Request::builder()
            .header("content-type", "multipart/form-data; boundary=BOUNDARY")
            .body(axum::body::Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn parses_file_and_options_and_drains_unknown_fields() {
        let multipart = form_from(concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"scan.pdf\"\r\n",
            "Content-Type: application/pdf\r\n",
            "\r\n",
            "%PDF-1.4 stub\r\n",
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"extraction_method\"\r\n",
            "\r\n",
            "secondary\r\n",
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"compression\"\r\n",
            "\r\n",
            "9\r\n",
            "--BOUNDARY--\r\n",
        ))
        .await;

        let form = parse_multipart(multipart).await.unwrap();
        assert_eq!(form.filename, "scan.pdf");
        assert_eq!(form.data, b"%PDF-1.4 stub".to_vec());
        assert_eq!(form.options.method, ExtractionMethod::Secondary);
        assert_eq!(form.options.output_format, "csv");
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let multipart = form_from(concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"output_format\"\r\n",
            "\r\n",
            "json\r\n",
            "--BOUNDARY--\r\n",
        ))
        .await;

        let err = parse_multipart(multipart).await.unwrap_err();
        assert_eq!(err, "No file uploaded");
    }
}
