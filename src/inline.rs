// SPDX-License-Identifier: MIT
//! Inline container codec ("V2", `.json`)
//!
//! One self-contained JSON record: metadata, numbering settings, save
//! timestamp, and the full section tree with every document's bytes embedded
//! as base64 text. No external references and no explicit version field; the
//! metadata migrator resolves older field shapes on load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::binary_codec;
use crate::codec::{
    BundleManifest, ContainerCodec, DocumentDescriptor, DocumentSource, SectionManifest,
};
use crate::error::BundleError;
use crate::migrate::{migrate, resolve_precision, RawMetadata};
use crate::model::{
    BatesNumberSettings, Bundle, DatePrecision, Document, PageNumberSettings,
};

fn default_saved_at() -> DateTime<Utc> {
    Utc::now()
}

fn default_media_type() -> String {
    "application/pdf".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineBundle {
    metadata: RawMetadata,
    #[serde(default)]
    sections: Vec<InlineSection>,
    #[serde(default)]
    page_number_settings: PageNumberSettings,
    #[serde(default)]
    bates_number_settings: BatesNumberSettings,
    #[serde(default = "default_saved_at")]
    saved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineSection {
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
    documents: Vec<InlineDocument>,
}

fn default_starting_page() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineDocument {
    #[serde(default)]
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
    /// Base64-encoded original content.
    data: String,
    /// Base64-encoded edited variant, if one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modified_data: Option<String>,
    /// Identity of the edited variant when it differs from the original's.
    /// Absent in older files; decode falls back to the original's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modified_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modified_media_type: Option<String>,
}

/// The inline container codec.
#[derive(Debug, Default)]
pub struct InlineCodec;

impl InlineCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ContainerCodec for InlineCodec {
    fn encode(&self, bundle: &Bundle) -> Result<Vec<u8>, BundleError> {
        let mut sections = Vec::with_capacity(bundle.sections.len());
        for section in &bundle.sections {
            let mut documents = Vec::with_capacity(section.documents.len());
            for document in &section.documents {
                let data = binary_codec::encode(&document.content)?;
                let modified_data = document
                    .modified_content
                    .as_ref()
                    .map(binary_codec::encode)
                    .transpose()?;

                documents.push(InlineDocument {
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
                    data,
                    modified_data,
                    modified_file_name: document
                        .modified_content
                        .as_ref()
                        .map(|m| m.file_name.clone()),
                    modified_media_type: document
                        .modified_content
                        .as_ref()
                        .map(|m| m.media_type.clone()),
                });
            }

            sections.push(InlineSection {
                id: section.id.clone(),
                name: section.name.clone(),
                insert_divider: section.insert_divider,
                order: section.order,
                numbering_prefix: section.numbering_prefix.clone(),
                starting_page: section.starting_page,
                documents,
            });
        }

        let record = InlineBundle {
            metadata: RawMetadata::from(&bundle.metadata),
            sections,
            page_number_settings: bundle.page_number_settings.clone(),
            bates_number_settings: bundle.bates_number_settings.clone(),
            saved_at: bundle.saved_at,
        };

        serde_json::to_vec(&record)
            .map_err(|e| BundleError::Encode(format!("could not serialize bundle record: {e}")))
    }

    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn DocumentSource>, BundleError> {
        let mut record: InlineBundle = serde_json::from_slice(&bytes)
            .map_err(|e| BundleError::MalformedContainer(e.to_string()))?;

        record.sections.sort_by_key(|s| s.order);

        let mut sections = Vec::with_capacity(record.sections.len());
        let mut payloads = Vec::with_capacity(record.sections.len());
        for mut section in record.sections {
            section.documents.sort_by_key(|d| d.order);

            let mut descriptors = Vec::with_capacity(section.documents.len());
            let mut section_payloads = Vec::with_capacity(section.documents.len());
            for document in section.documents {
                let file_name = if document.file_name.is_empty() {
                    format!("{}.pdf", document.name)
                } else {
                    document.file_name
                };

                descriptors.push(DocumentDescriptor {
                    id: ensure_id(document.id),
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
                    has_modified: document.modified_data.is_some(),
                });
                section_payloads.push(InlinePayload {
                    data: document.data,
                    modified_data: document.modified_data,
                });
            }

            sections.push(SectionManifest {
                id: ensure_id(section.id),
                name: section.name,
                insert_divider: section.insert_divider,
                order: section.order,
                numbering_prefix: section.numbering_prefix,
                starting_page: section.starting_page,
                documents: descriptors,
            });
            payloads.push(section_payloads);
        }

        let manifest = BundleManifest {
            metadata: migrate(record.metadata),
            sections,
            page_number_settings: record.page_number_settings,
            bates_number_settings: record.bates_number_settings,
            saved_at: record.saved_at,
        };

        Ok(Box::new(InlineSource { manifest, payloads }))
    }
}

fn ensure_id(id: String) -> String {
    if id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id
    }
}

#[derive(Debug)]
struct InlinePayload {
    data: String,
    modified_data: Option<String>,
}

struct InlineSource {
    manifest: BundleManifest,
    payloads: Vec<Vec<InlinePayload>>,
}

impl DocumentSource for InlineSource {
    fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    fn read_document(
        &mut self,
        section_index: usize,
        document_index: usize,
    ) -> Result<Document, BundleError> {
        let descriptor = self.manifest.sections[section_index].documents[document_index].clone();
        let payload = &self.payloads[section_index][document_index];

        // An unreadable original makes the bundle unusable; abort the load.
        let content = binary_codec::decode(
            &payload.data,
            descriptor.file_name.clone(),
            descriptor.media_type.clone(),
        )
        .map_err(|e| BundleError::DocumentRestore {
            name: descriptor.name.clone(),
            reason: e.to_string(),
        })?;

        // A broken edited variant is dropped; the original remains usable.
        let modified_file_name = descriptor
            .modified_file_name
            .clone()
            .unwrap_or_else(|| descriptor.file_name.clone());
        let modified_media_type = descriptor
            .modified_media_type
            .clone()
            .unwrap_or_else(|| descriptor.media_type.clone());
        let modified_content = match &payload.modified_data {
            Some(text) => match binary_codec::decode(
                text,
                modified_file_name,
                modified_media_type,
            ) {
                Ok(content) => Some(content),
                Err(e) => {
                    warn!(
                        document = %descriptor.name,
                        error = %e,
                        "dropping undecodable edited variant, keeping original"
                    );
                    None
                }
            },
            None => None,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BundleMetadata, DocumentContent, Section};

    fn sample_bundle() -> Bundle {
        let mut bundle = Bundle::new(BundleMetadata {
            title: "Smith v Jones".to_string(),
            case_number: "HC-2024-001".to_string(),
            ..BundleMetadata::default()
        });

        let mut section = Section::new("Pleadings", 0);
        let mut doc = Document::new(
            "Claim Form",
            4,
            DocumentContent::new("claim.pdf", "application/pdf", b"%PDF-1.7 claim".to_vec()),
        );
        doc.date = Some("2024-03-15".to_string());
        doc.date_precision = DatePrecision::Day;
        doc.substitute_modified(DocumentContent::new(
            "claim.pdf",
            "application/pdf",
            b"%PDF-1.7 redacted".to_vec(),
        ));
        section.documents.push(doc);
        bundle.sections.push(section);
        bundle
    }

    #[test]
    fn test_round_trip() {
        let bundle = sample_bundle();
        let codec = InlineCodec::new();

        let bytes = codec.encode(&bundle).unwrap();
        let decoded = codec.decode(bytes).unwrap();

        assert_eq!(decoded, bundle);
    }

    #[test]
    fn test_modified_variant_keeps_its_own_identity() {
        let mut bundle = sample_bundle();
        bundle.sections[0].documents[0].substitute_modified(DocumentContent::new(
            "claim-redacted.png",
            "image/png",
            b"PNG redacted".to_vec(),
        ));
        let codec = InlineCodec::new();

        let decoded = codec.decode(codec.encode(&bundle).unwrap()).unwrap();

        let modified = decoded.sections[0].documents[0]
            .modified_content
            .as_ref()
            .expect("edited variant should survive the round trip");
        assert_eq!(modified.file_name, "claim-redacted.png");
        assert_eq!(modified.media_type, "image/png");
        assert_eq!(decoded, bundle);
    }

    #[test]
    fn test_structural_parse_failure_is_malformed_container() {
        let codec = InlineCodec::new();
        let err = codec.decode(b"not json at all".to_vec()).unwrap_err();
        assert!(matches!(err, BundleError::MalformedContainer(_)));
    }

    #[test]
    fn test_metadata_is_migrated_on_load() {
        let codec = InlineCodec::new();
        let json = br#"{
            "metadata": {"caseName": "Old v Older", "applicantName": "John", "respondentName": "Jane"},
            "sections": [],
            "savedAt": "2024-01-01T00:00:00Z"
        }"#;

        let decoded = codec.decode(json.to_vec()).unwrap();
        assert_eq!(decoded.metadata.title, "Old v Older");
        assert_eq!(decoded.metadata.parties.len(), 2);
    }

    #[test]
    fn test_broken_modified_variant_is_dropped() {
        let bundle = sample_bundle();
        let codec = InlineCodec::new();

        let bytes = codec.encode(&bundle).unwrap();
        let mut record: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        record["sections"][0]["documents"][0]["modifiedData"] =
            serde_json::Value::from("!!not base64!!");
        let tampered = serde_json::to_vec(&record).unwrap();

        let decoded = codec.decode(tampered).unwrap();
        let doc = &decoded.sections[0].documents[0];
        assert!(doc.modified_content.is_none());
        assert_eq!(doc.content.bytes, b"%PDF-1.7 claim");
    }

    #[test]
    fn test_broken_original_aborts_load() {
        let bundle = sample_bundle();
        let codec = InlineCodec::new();

        let bytes = codec.encode(&bundle).unwrap();
        let mut record: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        record["sections"][0]["documents"][0]["data"] = serde_json::Value::from("");
        let tampered = serde_json::to_vec(&record).unwrap();

        let err = codec.decode(tampered).unwrap_err();
        match err {
            BundleError::DocumentRestore { name, .. } => assert_eq!(name, "Claim Form"),
            other => panic!("expected DocumentRestore, got {other:?}"),
        }
    }

    #[test]
    fn test_sections_and_documents_sorted_by_order() {
        let codec = InlineCodec::new();
        let json = br#"{
            "metadata": {},
            "sections": [
                {"name": "B", "order": 1, "documents": []},
                {"name": "A", "order": 0, "documents": [
                    {"name": "second", "pageCount": 1, "order": 1, "data": "Zmlyc3Q="},
                    {"name": "first", "pageCount": 1, "order": 0, "data": "Zmlyc3Q="}
                ]}
            ]
        }"#;

        let decoded = codec.decode(json.to_vec()).unwrap();
        assert_eq!(decoded.sections[0].name, "A");
        assert_eq!(decoded.sections[1].name, "B");
        assert_eq!(decoded.sections[0].documents[0].name, "first");
    }
}
