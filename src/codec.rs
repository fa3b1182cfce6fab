// SPDX-License-Identifier: MIT
//! Common codec interface shared by both container formats
//!
//! The two formats are independent implementations behind one seam: encode a
//! [`Bundle`] to durable bytes, or open durable bytes as a staged
//! [`DocumentSource`] that yields the manifest first and then decodes one
//! document at a time. The staged shape exists so the progressive driver can
//! pace extraction; `decode` drains a source in one go for callers that do
//! not need pacing.

use chrono::{DateTime, Utc};

use crate::archive::ArchiveCodec;
use crate::detect::ContainerFormat;
use crate::error::BundleError;
use crate::inline::InlineCodec;
use crate::model::{
    BatesNumberSettings, Bundle, BundleMetadata, DatePrecision, Document, PageNumberSettings,
    Section,
};

/// A container format implementation.
pub trait ContainerCodec {
    /// Serialize a bundle to durable bytes. Fails before any bytes are
    /// produced; a partially written container is never returned.
    fn encode(&self, bundle: &Bundle) -> Result<Vec<u8>, BundleError>;

    /// Parse the container envelope and return a staged document source.
    /// Metadata is migrated here; document bytes are not touched yet.
    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn DocumentSource>, BundleError>;

    /// Decode an entire container synchronously, in section order then
    /// document order.
    fn decode(&self, bytes: Vec<u8>) -> Result<Bundle, BundleError> {
        let mut source = self.open(bytes)?;
        drain(source.as_mut())
    }
}

/// Staged access to a decoded container: the manifest up front, documents on
/// demand.
pub trait DocumentSource: Send {
    /// The migrated metadata, settings and section skeletons, already in
    /// section order then document order.
    fn manifest(&self) -> &BundleManifest;

    /// Decode one document's content (and edited variant, if any) by its
    /// position in the manifest.
    fn read_document(
        &mut self,
        section_index: usize,
        document_index: usize,
    ) -> Result<Document, BundleError>;
}

/// Everything in a container except document bytes.
#[derive(Debug, Clone)]
pub struct BundleManifest {
    pub metadata: BundleMetadata,
    pub sections: Vec<SectionManifest>,
    pub page_number_settings: PageNumberSettings,
    pub bates_number_settings: BatesNumberSettings,
    pub saved_at: DateTime<Utc>,
}

impl BundleManifest {
    pub fn document_total(&self) -> usize {
        self.sections.iter().map(|s| s.documents.len()).sum()
    }

    /// Assemble the final bundle once every document has been decoded.
    /// `documents` must mirror the manifest's section/document layout.
    pub fn into_bundle(self, documents: Vec<Vec<Document>>) -> Bundle {
        let sections = self
            .sections
            .into_iter()
            .zip(documents)
            .map(|(skeleton, documents)| Section {
                id: skeleton.id,
                name: skeleton.name,
                insert_divider: skeleton.insert_divider,
                order: skeleton.order,
                numbering_prefix: skeleton.numbering_prefix,
                starting_page: skeleton.starting_page,
                documents,
            })
            .collect();

        Bundle {
            metadata: self.metadata,
            sections,
            page_number_settings: self.page_number_settings,
            bates_number_settings: self.bates_number_settings,
            saved_at: self.saved_at,
        }
    }
}

/// A section skeleton: everything except decoded documents.
#[derive(Debug, Clone)]
pub struct SectionManifest {
    pub id: String,
    pub name: String,
    pub insert_divider: bool,
    pub order: u32,
    pub numbering_prefix: String,
    pub starting_page: u32,
    pub documents: Vec<DocumentDescriptor>,
}

/// A document as described by the manifest, before its bytes are decoded.
#[derive(Debug, Clone)]
pub struct DocumentDescriptor {
    pub id: String,
    pub name: String,
    pub page_count: u32,
    pub order: u32,
    pub date: Option<String>,
    pub date_precision: DatePrecision,
    pub custom_title: Option<String>,
    pub selected_pages: Option<Vec<u32>>,
    pub file_name: String,
    pub media_type: String,
    /// Identity of the edited variant; `None` means it shares the
    /// original's.
    pub modified_file_name: Option<String>,
    pub modified_media_type: Option<String>,
    pub has_modified: bool,
}

/// The codec for a detected container format.
pub fn codec_for(format: ContainerFormat) -> Box<dyn ContainerCodec + Send + Sync> {
    match format {
        ContainerFormat::Archive => Box::new(ArchiveCodec::new()),
        ContainerFormat::Inline => Box::new(InlineCodec::new()),
    }
}

/// Drain a document source synchronously, preserving manifest order.
pub fn drain(source: &mut dyn DocumentSource) -> Result<Bundle, BundleError> {
    let manifest = source.manifest().clone();
    let mut documents = Vec::with_capacity(manifest.sections.len());

    for (section_index, section) in manifest.sections.iter().enumerate() {
        let mut decoded = Vec::with_capacity(section.documents.len());
        for document_index in 0..section.documents.len() {
            decoded.push(source.read_document(section_index, document_index)?);
        }
        documents.push(decoded);
    }

    Ok(manifest.into_bundle(documents))
}
