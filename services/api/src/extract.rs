//! services/api/src/extract.rs
//!
//! Upload constraints and plain-text extraction for chat file uploads.
//! Plain-text files are read verbatim; PDFs are parsed to text. Everything
//! else is rejected before any bytes are interpreted.

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("file exceeds the 5 MB upload limit")]
    TooLarge,
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("could not read file: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadKind {
    PlainText,
    Pdf,
}

/// Decides how to treat an upload from its declared content type, falling
/// back to the filename extension when the browser sent none.
fn classify(filename: &str, content_type: Option<&str>) -> Result<UploadKind, ExtractError> {
    if let Some(ct) = content_type {
        let ct = ct.split(';').next().unwrap_or(ct).trim();
        match ct {
            "text/plain" => return Ok(UploadKind::PlainText),
            "application/pdf" => return Ok(UploadKind::Pdf),
            // An octet-stream declaration tells us nothing; fall through
            // to the extension.
            "application/octet-stream" | "" => {}
            other => return Err(ExtractError::UnsupportedType(other.to_string())),
        }
    }

    let extension = filename.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match extension.as_str() {
        "txt" => Ok(UploadKind::PlainText),
        "pdf" => Ok(UploadKind::Pdf),
        _ => Err(ExtractError::UnsupportedType(filename.to_string())),
    }
}

/// Extracts the plain text of an upload.
///
/// The size cap is enforced first so an oversized file is rejected before
/// any extraction work happens.
pub fn extract_text(
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Result<String, ExtractError> {
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(ExtractError::TooLarge);
    }

    match classify(filename, content_type)? {
        UploadKind::PlainText => String::from_utf8(data.to_vec())
            .map_err(|e| ExtractError::Malformed(format!("not valid UTF-8 text: {e}"))),
        UploadKind::Pdf => pdf_extract::extract_text_from_mem(data)
            .map_err(|e| ExtractError::Malformed(e.to_string())),
    }
}
