// SPDX-License-Identifier: MIT
//! In-memory bundle data model
//!
//! These types are the single logical schema shared by both container
//! formats. Codecs encode and decode `Bundle` values; nothing in this module
//! knows how bundles are persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::BundleError;

/// Precision tag attached to a document date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Day,
    Month,
    Year,
    None,
}

impl Default for DatePrecision {
    fn default() -> Self {
        DatePrecision::None
    }
}

/// An opaque binary resource: a document's bytes with a logical name and
/// media type.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentContent {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentContent {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// A well-formed resource has at least one byte of content.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One logical document inside a section.
///
/// Binary content is immutable once created except by explicit substitution
/// producing `modified_content` (an edited/redacted variant).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub page_count: u32,
    pub order: u32,
    pub date: Option<String>,
    pub date_precision: DatePrecision,
    pub custom_title: Option<String>,
    pub selected_pages: Option<Vec<u32>>,
    pub content: DocumentContent,
    pub modified_content: Option<DocumentContent>,
}

impl Document {
    /// Create a new document with a fresh identifier at the end of a section.
    pub fn new(name: impl Into<String>, page_count: u32, content: DocumentContent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            page_count,
            order: 0,
            date: None,
            date_precision: DatePrecision::None,
            custom_title: None,
            selected_pages: None,
            content,
            modified_content: None,
        }
    }

    /// Check the data-model invariants: non-empty original content and, when
    /// a selected-pages list is present, unique values within
    /// `[1, page_count]`.
    pub fn validate(&self) -> Result<(), BundleError> {
        if self.content.is_empty() {
            return Err(BundleError::DocumentRestore {
                name: self.name.clone(),
                reason: "original content is empty".to_string(),
            });
        }

        if let Some(pages) = &self.selected_pages {
            let mut seen = std::collections::HashSet::new();
            for &page in pages {
                if page < 1 || page > self.page_count {
                    return Err(BundleError::DocumentRestore {
                        name: self.name.clone(),
                        reason: format!(
                            "selected page {} is outside 1..={}",
                            page, self.page_count
                        ),
                    });
                }
                if !seen.insert(page) {
                    return Err(BundleError::DocumentRestore {
                        name: self.name.clone(),
                        reason: format!("selected page {} appears more than once", page),
                    });
                }
            }
        }

        Ok(())
    }

    /// Replace the edited variant with a new one.
    pub fn substitute_modified(&mut self, content: DocumentContent) {
        self.modified_content = Some(content);
    }
}

/// An ordered container of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub insert_divider: bool,
    pub order: u32,
    pub numbering_prefix: String,
    pub starting_page: u32,
    pub documents: Vec<Document>,
}

impl Section {
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            insert_divider: false,
            order,
            numbering_prefix: String::new(),
            starting_page: 1,
            documents: Vec::new(),
        }
    }

    /// Rewrite document order values to `0..n-1`, preserving current order.
    ///
    /// After any reorder the order values inside a section must be a
    /// permutation of `0..n-1`; this restores that invariant.
    pub fn normalize_order(&mut self) {
        self.documents.sort_by_key(|d| d.order);
        for (index, document) in self.documents.iter_mut().enumerate() {
            document.order = index as u32;
        }
    }
}

/// Role of a party in the matter. Fixed vocabulary; free text goes in
/// `Party::custom_role` when the role is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Applicant,
    Respondent,
    Appellant,
    Claimant,
    Defendant,
    Other,
}

/// A named participant in the legal matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub name: String,
    pub role: PartyRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_role: Option<String>,
    pub order: u32,
}

/// Case and party information for a bundle.
///
/// The legacy shape carried two flat name fields instead of the party list;
/// the migrator reconciles this and keeps the flats total (never undefined)
/// for downstream consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMetadata {
    pub title: String,
    pub case_number: String,
    pub court: String,
    pub date: String,
    pub parties: Vec<Party>,
    pub applicant_name: String,
    pub respondent_name: String,
}

/// Placement of a page or Bates number on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberPosition {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// Page numbering configuration.
///
/// The core only round-trips these settings; document generation elsewhere
/// consumes them. Unknown fields are preserved through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageNumberSettings {
    pub enabled: bool,
    pub position: NumberPosition,
    pub font_size: u32,
    pub start_at: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for PageNumberSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            position: NumberPosition::BottomCenter,
            font_size: 10,
            start_at: 1,
            extra: Map::new(),
        }
    }
}

/// Bates numbering configuration. Pass-through, same as
/// [`PageNumberSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatesNumberSettings {
    pub enabled: bool,
    pub prefix: String,
    pub start_number: u32,
    pub digits: u32,
    pub font_size: u32,
    pub position: NumberPosition,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for BatesNumberSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            prefix: String::new(),
            start_number: 1,
            digits: 6,
            font_size: 10,
            position: NumberPosition::BottomRight,
            extra: Map::new(),
        }
    }
}

/// The complete in-memory work product: metadata, sections, documents and
/// numbering settings, plus the time it was last saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub metadata: BundleMetadata,
    pub sections: Vec<Section>,
    pub page_number_settings: PageNumberSettings,
    pub bates_number_settings: BatesNumberSettings,
    pub saved_at: DateTime<Utc>,
}

impl Bundle {
    pub fn new(metadata: BundleMetadata) -> Self {
        Self {
            metadata,
            sections: Vec::new(),
            page_number_settings: PageNumberSettings::default(),
            bates_number_settings: BatesNumberSettings::default(),
            saved_at: Utc::now(),
        }
    }

    /// Total number of documents across all sections.
    pub fn document_count(&self) -> usize {
        self.sections.iter().map(|s| s.documents.len()).sum()
    }
}
