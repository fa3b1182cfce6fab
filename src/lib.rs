// SPDX-License-Identifier: MIT
//! # Casebundle
//!
//! Persistence and serialization engine for multi-section PDF bundles:
//! encode a graph of in-memory binary documents plus structured metadata
//! into a durable container, decode it back without exhausting memory or
//! blocking the interactive thread, detect which container format is being
//! read, and transparently migrate older metadata shapes into the current
//! schema.
//!
//! ## Container Formats
//!
//! Two formats share one logical schema and one codec interface:
//!
//! | Aspect              | Inline ("V2")          | Archive ("V3")              |
//! |---------------------|------------------------|-----------------------------|
//! | File extension      | `.json`                | `.cbz` (renamed zip)        |
//! | Document bytes      | Embedded base64        | Per-document deflate entries|
//! | Version field       | None (migrator-driven) | Explicit `"3.0"` tag        |
//! | Detection           | Default                | `PK` signature / extension  |
//!
//! The format detector classifies a candidate input by extension first and
//! leading bytes second; the metadata migrator normalizes any older schema
//! shape on every load path.
//!
//! ## Progressive loading
//!
//! [`load_bundle`] reconstructs a bundle document by document, emitting a
//! progress notification after each one and pausing cooperatively so the
//! host runtime can service interaction and reclaim memory. A per-document
//! failure aborts the whole load; partial bundles are never returned.
//!
//! ## Example
//!
//! ```no_run
//! use casebundle::{
//!     load_bundle, save_bundle, Bundle, BundleMetadata, ContainerFormat, LoadOptions,
//! };
//!
//! # async fn example() -> Result<(), casebundle::BundleError> {
//! let bundle = Bundle::new(BundleMetadata::default());
//! let bytes = save_bundle(&bundle, ContainerFormat::Archive)?;
//!
//! let restored = load_bundle(bytes, Some("bundle.cbz"), &LoadOptions::default(), |p| {
//!     println!("{}% {}", p.percent, p.status);
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod autosave;
pub mod binary_codec;
pub mod codec;
pub mod detect;
pub mod error;
pub mod inline;
pub mod migrate;
pub mod model;
pub mod progressive;

// Re-export main types
pub use archive::ArchiveCodec;
pub use autosave::{AutosaveSlot, AutosaveTimer, AUTOSAVE_SLOT_NAME};
pub use codec::{codec_for, BundleManifest, ContainerCodec, DocumentSource};
pub use detect::{detect, ContainerFormat};
pub use error::BundleError;
pub use inline::InlineCodec;
pub use migrate::{infer_date_precision, migrate, RawMetadata};
pub use model::{
    BatesNumberSettings, Bundle, BundleMetadata, DatePrecision, Document, DocumentContent,
    PageNumberSettings, Party, PartyRole, Section,
};
pub use progressive::{load_bundle, save_bundle, LoadOptions, LoadPhase, LoadProgress};
