// SPDX-License-Identifier: MIT
//! Progressive reconstruction driver
//!
//! Wraps the load path of either container codec in a cooperative state
//! machine: `Start -> ReadingMetadata -> ExtractingDocuments -> Done`.
//! Documents are decoded strictly in section order then document order, with
//! a progress notification after every one. The pauses between documents are
//! the only suspension points; they exist for responsiveness and
//! memory-pressure relief, not for overlapping work. Dropping the returned
//! future at a suspension point is the only form of cancellation and leaves
//! nothing partially materialized.

use std::time::Duration;

use tracing::debug;

use crate::codec::codec_for;
use crate::detect::{detect, ContainerFormat};
use crate::error::BundleError;
use crate::model::Bundle;

/// Phase of one load operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Start,
    ReadingMetadata,
    ExtractingDocuments,
    Done,
}

/// One progress notification.
#[derive(Debug, Clone)]
pub struct LoadProgress {
    pub phase: LoadPhase,
    /// Documents fully decoded so far. Non-decreasing across one load.
    pub processed: usize,
    /// Total documents the manifest references.
    pub total: usize,
    /// Overall percentage; the final notification always reports 100.
    pub percent: u8,
    /// Human-readable status naming the current document or milestone.
    pub status: String,
}

/// Pacing configuration for the driver.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Emit a consolidating pause after this many documents.
    pub consolidate_every: usize,
    /// Short pause after each document.
    pub document_pause: Duration,
    /// Longer pause at consolidation points so the host runtime can reclaim
    /// memory from documents already materialized.
    pub consolidate_pause: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            consolidate_every: 10,
            document_pause: Duration::from_millis(5),
            consolidate_pause: Duration::from_millis(50),
        }
    }
}

/// Serialize a bundle into the chosen container format.
///
/// Saving is not chunked: it operates on already-resident, already-validated
/// documents. Any failure aborts before durable bytes are produced.
pub fn save_bundle(bundle: &Bundle, format: ContainerFormat) -> Result<Vec<u8>, BundleError> {
    debug!(
        format = format.name(),
        documents = bundle.document_count(),
        "encoding bundle"
    );
    codec_for(format).encode(bundle)
}

/// Load a bundle from durable bytes, document by document.
///
/// The container format is auto-detected from `source_name` and the leading
/// bytes. `on_progress` is invoked after every document and at every
/// milestone; the final notification always reports 100/100. Any per-document
/// failure aborts the whole operation — no partial bundle is ever returned —
/// and the propagated error names the failing document and its position.
pub async fn load_bundle<F>(
    bytes: Vec<u8>,
    source_name: Option<&str>,
    options: &LoadOptions,
    mut on_progress: F,
) -> Result<Bundle, BundleError>
where
    F: FnMut(&LoadProgress),
{
    let mut emit = move |phase, processed: usize, total: usize, status: String| {
        let percent = match phase {
            LoadPhase::Done => 100,
            _ if total == 0 => 0,
            _ => ((processed * 100) / total).min(99) as u8,
        };
        on_progress(&LoadProgress {
            phase,
            processed,
            total,
            percent,
            status,
        });
    };

    emit(LoadPhase::Start, 0, 0, "Opening saved bundle".to_string());

    let leading = &bytes[..bytes.len().min(2)];
    let format = detect(source_name, Some(leading))?;
    debug!(format = format.name(), "detected container format");

    emit(
        LoadPhase::ReadingMetadata,
        0,
        0,
        "Reading bundle metadata".to_string(),
    );
    let codec = codec_for(format);
    let mut source = codec.open(bytes)?;
    let manifest = source.manifest().clone();
    let total = manifest.document_total();

    let mut documents: Vec<Vec<_>> = Vec::with_capacity(manifest.sections.len());
    let mut processed = 0usize;

    for (section_index, section) in manifest.sections.iter().enumerate() {
        let mut decoded = Vec::with_capacity(section.documents.len());
        for (document_index, descriptor) in section.documents.iter().enumerate() {
            let document = source
                .read_document(section_index, document_index)
                .map_err(|e| annotate(e, &descriptor.name, processed + 1, total))?;
            decoded.push(document);
            processed += 1;

            emit(
                LoadPhase::ExtractingDocuments,
                processed,
                total,
                format!("Restored \"{}\" ({processed} of {total})", descriptor.name),
            );

            let consolidate =
                processed % options.consolidate_every == 0 && processed < total;
            if consolidate {
                emit(
                    LoadPhase::ExtractingDocuments,
                    processed,
                    total,
                    "Consolidating memory".to_string(),
                );
                pause(options.consolidate_pause).await;
            } else if processed < total {
                pause(options.document_pause).await;
            }
        }
        documents.push(decoded);
    }

    let bundle = manifest.into_bundle(documents);
    emit(LoadPhase::Done, total, total, "Bundle restored".to_string());

    Ok(bundle)
}

/// Cooperative suspension point. A zero pause still yields once so the host
/// runtime gets a chance to run.
async fn pause(duration: Duration) {
    if duration.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(duration).await;
    }
}

/// Annotate a per-document failure with the document's name and position.
/// Referential-integrity errors already carry everything the caller needs
/// and pass through untouched.
fn annotate(error: BundleError, name: &str, position: usize, total: usize) -> BundleError {
    match error {
        BundleError::ReferentialIntegrity { .. } => error,
        BundleError::DocumentRestore { name, reason } => BundleError::DocumentRestore {
            name,
            reason: format!("{reason} (document {position} of {total})"),
        },
        other => BundleError::DocumentRestore {
            name: name.to_string(),
            reason: format!("{other} (document {position} of {total})"),
        },
    }
}
