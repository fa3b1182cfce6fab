// SPDX-License-Identifier: MIT
//! Archive container codec ("V3", `.cbz`)
//!
//! A renamed zip archive with one `metadata.json` entry (case, parties,
//! settings and the section tree referencing documents by identifier — never
//! bytes) plus one deflate-compressed entry per document's original content
//! and per edited variant:
//!
//! ```text
//! metadata.json
//! documents/<documentId>_original.<ext>
//! documents/<documentId>_modified.<ext>
//! ```

use std::io::{Cursor, Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::codec::{
    BundleManifest, ContainerCodec, DocumentDescriptor, DocumentSource, SectionManifest,
};
use crate::error::BundleError;
use crate::migrate::{migrate, resolve_precision, RawMetadata};
use crate::model::{
    BatesNumberSettings, Bundle, DatePrecision, Document, DocumentContent, PageNumberSettings,
};

/// Name of the structured-metadata entry.
pub const METADATA_ENTRY: &str = "metadata.json";

/// Version tag this codec reads and writes. No forward-compatibility shims.
pub const FORMAT_VERSION: &str = "3.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Original,
    Modified,
}

impl Variant {
    fn suffix(&self) -> &'static str {
        match self {
            Variant::Original => "original",
            Variant::Modified => "modified",
        }
    }
}

/// Deterministic archive entry key for one document variant.
fn entry_name(id: &str, variant: Variant, file_name: &str) -> String {
    let extension = file_name.rsplit('.').next().filter(|e| !e.is_empty() && *e != file_name);
    format!(
        "documents/{}_{}.{}",
        id,
        variant.suffix(),
        extension.unwrap_or("pdf")
    )
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveManifestRecord {
    version: String,
    metadata: RawMetadata,
    #[serde(default)]
    sections: Vec<ArchiveSectionRecord>,
    #[serde(default)]
    page_number_settings: PageNumberSettings,
    #[serde(default)]
    bates_number_settings: BatesNumberSettings,
    #[serde(default = "Utc::now")]
    saved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveSectionRecord {
    #[serde(default)]
    id: String,
    name: String,
    #[serde(default)]
    insert_divider: bool,
    order: u32,
    #[serde(default)]
    numbering_prefix: String,
    #[serde(default = "default_starting_page")]
    starting_page: u32,
    #[serde(default)]
    documents: Vec<ArchiveDocumentRecord>,
}

fn default_starting_page() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveDocumentRecord {
    id: String,
    name: String,
    page_count: u32,
    order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_precision: Option<DatePrecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected_pages: Option<Vec<u32>>,
    #[serde(default)]
    file_name: String,
    #[serde(default = "default_media_type")]
    media_type: String,
    #[serde(default)]
    has_modified: bool,
    /// Identity of the edited variant when it differs from the original's.
    /// Absent in older files; decode falls back to the original's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modified_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modified_media_type: Option<String>,
}

fn default_media_type() -> String {
    "application/pdf".to_string()
}

/// The archive container codec.
#[derive(Debug, Default)]
pub struct ArchiveCodec;

impl ArchiveCodec {
    pub fn new() -> Self {
        Self
    }

    /// Deflate options for content entries. Fast level: the payloads are PDF
    /// bytes that are compressed internally and gain little from higher
    /// effort.
    fn file_options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(1))
    }
}

impl ContainerCodec for ArchiveCodec {
    fn encode(&self, bundle: &Bundle) -> Result<Vec<u8>, BundleError> {
        // Validate every document before any byte is emitted so a failing
        // save never produces a truncated container.
        for section in &bundle.sections {
            for document in &section.documents {
                if document.content.is_empty() {
                    return Err(BundleError::Encode(format!(
                        "document \"{}\" has no original content",
                        document.name
                    )));
                }
            }
        }

        let mut sections = Vec::with_capacity(bundle.sections.len());
        for section in &bundle.sections {
            let documents = section
                .documents
                .iter()
                .map(|document| ArchiveDocumentRecord {
                    id: document.id.clone(),
                    name: document.name.clone(),
                    page_count: document.page_count,
                    order: document.order,
                    date: document.date.clone(),
                    date_precision: Some(document.date_precision),
                    custom_title: document.custom_title.clone(),
                    selected_pages: document.selected_pages.clone(),
                    file_name: document.content.file_name.clone(),
                    media_type: document.content.media_type.clone(),
                    has_modified: document.modified_content.is_some(),
                    modified_file_name: document
                        .modified_content
                        .as_ref()
                        .map(|m| m.file_name.clone()),
                    modified_media_type: document
                        .modified_content
                        .as_ref()
                        .map(|m| m.media_type.clone()),
                })
                .collect();

            sections.push(ArchiveSectionRecord {
                id: section.id.clone(),
                name: section.name.clone(),
                insert_divider: section.insert_divider,
                order: section.order,
                numbering_prefix: section.numbering_prefix.clone(),
                starting_page: section.starting_page,
                documents,
            });
        }

        let record = ArchiveManifestRecord {
            version: FORMAT_VERSION.to_string(),
            metadata: RawMetadata::from(&bundle.metadata),
            sections,
            page_number_settings: bundle.page_number_settings.clone(),
            bates_number_settings: bundle.bates_number_settings.clone(),
            saved_at: bundle.saved_at,
        };
        let metadata_json = serde_json::to_vec(&record)
            .map_err(|e| BundleError::Encode(format!("could not serialize metadata entry: {e}")))?;

        let options = Self::file_options();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        writer
            .start_file(METADATA_ENTRY, options)
            .map_err(zip_encode_error)?;
        writer.write_all(&metadata_json)?;

        for section in &bundle.sections {
            for document in &section.documents {
                let key = entry_name(
                    &document.id,
                    Variant::Original,
                    &document.content.file_name,
                );
                writer.start_file(key, options).map_err(zip_encode_error)?;
                writer.write_all(&document.content.bytes)?;

                if let Some(modified) = &document.modified_content {
                    let key =
                        entry_name(&document.id, Variant::Modified, &modified.file_name);
                    writer.start_file(key, options).map_err(zip_encode_error)?;
                    writer.write_all(&modified.bytes)?;
                }
            }
        }

        let cursor = writer.finish().map_err(zip_encode_error)?;
        Ok(cursor.into_inner())
    }

    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn DocumentSource>, BundleError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| BundleError::MalformedContainer(e.to_string()))?;

        let metadata_json = match read_entry(&mut archive, METADATA_ENTRY)? {
            Some(bytes) => bytes,
            None => return Err(BundleError::MissingMetadataEntry),
        };

        let mut record: ArchiveManifestRecord = serde_json::from_slice(&metadata_json)
            .map_err(|e| BundleError::MalformedContainer(format!("metadata entry: {e}")))?;

        // Version gate before any document extraction.
        if record.version != FORMAT_VERSION {
            return Err(BundleError::UnsupportedVersion {
                expected: FORMAT_VERSION.to_string(),
                found: record.version,
            });
        }

        record.sections.sort_by_key(|s| s.order);

        let mut sections = Vec::with_capacity(record.sections.len());
        for mut section in record.sections {
            section.documents.sort_by_key(|d| d.order);

            let documents = section
                .documents
                .into_iter()
                .map(|document| {
                    let file_name = if document.file_name.is_empty() {
                        format!("{}.pdf", document.name)
                    } else {
                        document.file_name
                    };
                    DocumentDescriptor {
                        id: document.id,
                        name: document.name,
                        page_count: document.page_count,
                        order: document.order,
                        date_precision: resolve_precision(
                            document.date.as_deref(),
                            document.date_precision,
                        ),
                        date: document.date,
                        custom_title: document.custom_title,
                        selected_pages: document.selected_pages,
                        file_name,
                        media_type: document.media_type,
                        modified_file_name: document.modified_file_name,
                        modified_media_type: document.modified_media_type,
                        has_modified: document.has_modified,
                    }
                })
                .collect();

            sections.push(SectionManifest {
                id: ensure_id(section.id),
                name: section.name,
                insert_divider: section.insert_divider,
                order: section.order,
                numbering_prefix: section.numbering_prefix,
                starting_page: section.starting_page,
                documents,
            });
        }

        let manifest = BundleManifest {
            metadata: migrate(record.metadata),
            sections,
            page_number_settings: record.page_number_settings,
            bates_number_settings: record.bates_number_settings,
            saved_at: record.saved_at,
        };

        Ok(Box::new(ArchiveSource { manifest, archive }))
    }
}

fn ensure_id(id: String) -> String {
    if id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id
    }
}

fn zip_encode_error(e: ZipError) -> BundleError {
    BundleError::Encode(format!("could not write archive entry: {e}"))
}

/// Read one entry fully, distinguishing "absent" from "broken".
fn read_entry(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    name: &str,
) -> Result<Option<Vec<u8>>, BundleError> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            Ok(Some(bytes))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(BundleError::MalformedContainer(e.to_string())),
    }
}

struct ArchiveSource {
    manifest: BundleManifest,
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl DocumentSource for ArchiveSource {
    fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    fn read_document(
        &mut self,
        section_index: usize,
        document_index: usize,
    ) -> Result<Document, BundleError> {
        let descriptor = self.manifest.sections[section_index].documents[document_index].clone();

        let original_key = entry_name(&descriptor.id, Variant::Original, &descriptor.file_name);
        let bytes = match read_entry(&mut self.archive, &original_key)? {
            Some(bytes) if !bytes.is_empty() => bytes,
            Some(_) => {
                return Err(BundleError::DocumentRestore {
                    name: descriptor.name,
                    reason: format!("archive entry {original_key} is empty"),
                })
            }
            // A referenced original that is missing would silently corrupt
            // downstream generation; refuse the whole load.
            None => {
                return Err(BundleError::ReferentialIntegrity {
                    id: descriptor.id,
                    name: descriptor.name,
                })
            }
        };
        let content = DocumentContent::new(
            descriptor.file_name.clone(),
            descriptor.media_type.clone(),
            bytes,
        );

        let modified_content = if descriptor.has_modified {
            // The entry key derives from the variant's own file name, the
            // same name the writer used.
            let modified_file_name = descriptor
                .modified_file_name
                .clone()
                .unwrap_or_else(|| descriptor.file_name.clone());
            let modified_media_type = descriptor
                .modified_media_type
                .clone()
                .unwrap_or_else(|| descriptor.media_type.clone());
            let modified_key =
                entry_name(&descriptor.id, Variant::Modified, &modified_file_name);
            match read_entry(&mut self.archive, &modified_key) {
                Ok(Some(bytes)) if !bytes.is_empty() => Some(DocumentContent::new(
                    modified_file_name,
                    modified_media_type,
                    bytes,
                )),
                Ok(_) => {
                    warn!(
                        document = %descriptor.name,
                        entry = %modified_key,
                        "edited variant entry missing or empty, keeping original"
                    );
                    None
                }
                Err(e) => {
                    warn!(
                        document = %descriptor.name,
                        error = %e,
                        "dropping unreadable edited variant, keeping original"
                    );
                    None
                }
            }
        } else {
            None
        };

        let document = Document {
            id: descriptor.id,
            name: descriptor.name,
            page_count: descriptor.page_count,
            order: descriptor.order,
            date: descriptor.date,
            date_precision: descriptor.date_precision,
            custom_title: descriptor.custom_title,
            selected_pages: descriptor.selected_pages,
            content,
            modified_content,
        };
        document.validate()?;

        Ok(document)
    }
}
