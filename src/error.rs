// SPDX-License-Identifier: MIT
//! Error types for bundle serialization and reconstruction

use thiserror::Error;

/// Errors that can occur while saving or loading a bundle.
///
/// All variants are terminal for the current save/load call; the core never
/// retries. Variants that reference a specific document carry that document's
/// display name so callers can render an actionable message.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to encode document content: {0}")]
    Encode(String),

    #[error("failed to decode document content: {0}")]
    Decode(String),

    #[error("could not determine container format: {0}")]
    UnknownFormat(String),

    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("archive is missing its metadata entry")]
    MissingMetadataEntry,

    #[error("unsupported container version: expected {expected}, got {found}")]
    UnsupportedVersion { expected: String, found: String },

    #[error("document \"{name}\" ({id}) is referenced by the bundle metadata but its content entry is missing from the archive")]
    ReferentialIntegrity { id: String, name: String },

    #[error("document \"{name}\" could not be restored: {reason}")]
    DocumentRestore { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
