// SPDX-License-Identifier: MIT
//! Reversible conversion between document bytes and a transport-safe
//! textual encoding
//!
//! Leaf component used by the inline container format and the auto-save
//! slot. The encoded form is bare base64 with no transport prefix; `decode`
//! tolerates and strips a `data:*;base64,` prefix from older producers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::BundleError;
use crate::model::DocumentContent;

/// Encode a document's bytes as base64 text.
///
/// Fails with [`BundleError::Encode`] if the resource is not well formed
/// (zero-length content).
pub fn encode(content: &DocumentContent) -> Result<String, BundleError> {
    if content.is_empty() {
        return Err(BundleError::Encode(format!(
            "\"{}\" has no content to encode",
            content.file_name
        )));
    }

    Ok(STANDARD.encode(&content.bytes))
}

/// Decode base64 text back into an owned binary resource.
///
/// Fails with [`BundleError::Decode`] if the text is empty, not validly
/// encoded, or decodes to zero bytes. The result is indistinguishable in
/// capability from a freshly read resource.
pub fn decode(
    text: &str,
    file_name: impl Into<String>,
    media_type: impl Into<String>,
) -> Result<DocumentContent, BundleError> {
    let file_name = file_name.into();
    let payload = strip_data_prefix(text.trim());

    if payload.is_empty() {
        return Err(BundleError::Decode(format!(
            "\"{file_name}\" has an empty encoded payload"
        )));
    }

    let bytes = STANDARD.decode(payload).map_err(|e| {
        BundleError::Decode(format!("\"{file_name}\" is not valid base64: {e}"))
    })?;

    if bytes.is_empty() {
        return Err(BundleError::Decode(format!(
            "\"{file_name}\" decoded to zero bytes"
        )));
    }

    Ok(DocumentContent::new(file_name, media_type, bytes))
}

/// Strip a `data:<media-type>;base64,` transport prefix if present.
fn strip_data_prefix(text: &str) -> &str {
    if text.starts_with("data:") {
        match text.find(',') {
            Some(comma) => &text[comma + 1..],
            None => text,
        }
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_content() -> DocumentContent {
        DocumentContent::new("scan.pdf", "application/pdf", b"%PDF-1.7 content".to_vec())
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let content = pdf_content();
        let text = encode(&content).unwrap();
        assert!(!text.starts_with("data:"));

        let decoded = decode(&text, "scan.pdf", "application/pdf").unwrap();
        assert_eq!(decoded.bytes, content.bytes);
        assert_eq!(decoded.file_name, "scan.pdf");
        assert_eq!(decoded.media_type, "application/pdf");
    }

    #[test]
    fn test_encode_rejects_empty_content() {
        let content = DocumentContent::new("empty.pdf", "application/pdf", Vec::new());
        assert!(matches!(
            encode(&content),
            Err(BundleError::Encode(_))
        ));
    }

    #[test]
    fn test_decode_strips_data_url_prefix() {
        let text = format!(
            "data:application/pdf;base64,{}",
            STANDARD.encode(b"%PDF-1.7")
        );
        let decoded = decode(&text, "scan.pdf", "application/pdf").unwrap();
        assert_eq!(decoded.bytes, b"%PDF-1.7");
    }

    #[test]
    fn test_decode_rejects_empty_text() {
        assert!(matches!(
            decode("", "scan.pdf", "application/pdf"),
            Err(BundleError::Decode(_))
        ));
        assert!(matches!(
            decode("   ", "scan.pdf", "application/pdf"),
            Err(BundleError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let err = decode("not!!valid##", "scan.pdf", "application/pdf").unwrap_err();
        assert!(err.to_string().contains("scan.pdf"));
    }
}
