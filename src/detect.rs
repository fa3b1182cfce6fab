// SPDX-License-Identifier: MIT
//! Container format auto-detection

use crate::error::BundleError;

/// Magic bytes of a zip local file header ("PK").
pub const ARCHIVE_MAGIC: [u8; 2] = [0x50, 0x4B];

/// The known container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// Multi-entry zip archive ("V3", `.cbz`).
    Archive,
    /// Single self-contained JSON record ("V2", `.json`).
    Inline,
}

impl ContainerFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerFormat::Archive => "archive",
            ContainerFormat::Inline => "inline",
        }
    }
}

/// Classify a candidate input by file name and/or leading bytes.
///
/// The extension allowlist takes precedence; failing that, the first two
/// bytes decide: the zip local-file-header signature classifies as archive
/// and anything else as inline. Content that looks like neither still
/// classifies as inline, since the inline codec schema-validates on load and
/// produces a clearer diagnostic there. [`BundleError::UnknownFormat`] is
/// returned only when byte inspection cannot be performed at all.
pub fn detect(
    source_name: Option<&str>,
    leading_bytes: Option<&[u8]>,
) -> Result<ContainerFormat, BundleError> {
    if let Some(name) = source_name {
        if let Some(format) = detect_by_extension(name) {
            return Ok(format);
        }
    }

    match leading_bytes {
        Some(bytes) if bytes.len() >= 2 && bytes[..2] == ARCHIVE_MAGIC => {
            Ok(ContainerFormat::Archive)
        }
        Some(bytes) if !bytes.is_empty() => Ok(ContainerFormat::Inline),
        Some(_) => Err(BundleError::UnknownFormat(
            "source is empty".to_string(),
        )),
        None => Err(BundleError::UnknownFormat(
            "source has no recognized extension and its content could not be read".to_string(),
        )),
    }
}

fn detect_by_extension(name: &str) -> Option<ContainerFormat> {
    let extension = name.rsplit('.').next()?.to_ascii_lowercase();
    match extension.as_str() {
        "cbz" | "zip" => Some(ContainerFormat::Archive),
        "json" => Some(ContainerFormat::Inline),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_takes_precedence() {
        // A .json name classifies as inline regardless of content.
        let format = detect(Some("bundle.json"), Some(b"PK\x03\x04")).unwrap();
        assert_eq!(format, ContainerFormat::Inline);

        let format = detect(Some("bundle.cbz"), Some(b"{\"metadata\"")).unwrap();
        assert_eq!(format, ContainerFormat::Archive);

        let format = detect(Some("BUNDLE.ZIP"), None).unwrap();
        assert_eq!(format, ContainerFormat::Archive);
    }

    #[test]
    fn test_magic_bytes_classify_archive() {
        let format = detect(None, Some(b"PK\x03\x04rest")).unwrap();
        assert_eq!(format, ContainerFormat::Archive);

        let format = detect(Some("bundle.bak"), Some(b"PK\x03\x04")).unwrap();
        assert_eq!(format, ContainerFormat::Archive);
    }

    #[test]
    fn test_unrecognized_content_defaults_to_inline() {
        let format = detect(None, Some(b"{\"metadata\":{}}")).unwrap();
        assert_eq!(format, ContainerFormat::Inline);

        // Too short for the signature check still defaults to inline.
        let format = detect(None, Some(b"x")).unwrap();
        assert_eq!(format, ContainerFormat::Inline);
    }

    #[test]
    fn test_unreadable_source_is_unknown() {
        let err = detect(Some("bundle.bak"), None).unwrap_err();
        assert!(matches!(err, BundleError::UnknownFormat(_)));

        let err = detect(None, Some(b"")).unwrap_err();
        assert!(matches!(err, BundleError::UnknownFormat(_)));
    }
}
