//! # Legal Precedent Catalog Engine
//!
//! ## Overview
//! This library implements the core of a catalog browser for legal precedent
//! documents (súmulas, orientações jurisprudenciais, precedentes normativos,
//! uploaded bulletins and binding theses). It merges heterogeneous source
//! collections into one uniquely-identified item collection, answers compound
//! filter/search queries with accent-insensitive matching, and maintains a
//! durable personal-annotation layer (favorites, notes, tags, and a symmetric
//! cross-reference graph).
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `identity`: deterministic, stable identifier assignment per kind + natural key
//! - `normalize`: case folding and diacritic stripping for comparison
//! - `merge`: dataset merger flattening grouped/nested source payloads
//! - `query`: compound filter engine over the merged collection
//! - `store`: durable annotation/tag/correlation/favorites store with cascading cleanup
//! - `stats`: derived counts over the case-law catalog
//! - `catalog`: the context object tying collection, index, and store together
//! - `config`: configuration management and settings
//! - `errors`: centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: dataset payloads (JSON), uploaded documents with extracted text,
//!   filter parameters
//! - **Output**: ordered result sets, catalog statistics, durable personal state
//! - **Guarantees**: stable ids across reloads, all-or-nothing dataset merges,
//!   write-through persistence for every store mutation
//!
//! ## Usage
//! ```rust
//! use precedent_catalog::{Catalog, CatalogFilters};
//! use precedent_catalog::store::MemoryBackend;
//!
//! # fn main() -> precedent_catalog::Result<()> {
//! let mut catalog = Catalog::with_backend(Box::new(MemoryBackend::default()), false)?;
//! let payload = serde_json::json!({
//!     "sumulas": [{ "numero": 331, "titulo": "Terceirização", "texto": "..." }]
//! });
//! catalog.load_dataset(&payload)?;
//! let results = catalog.search(&CatalogFilters::default());
//! assert_eq!(results.len(), 1);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod catalog;
pub mod config;
pub mod errors;
pub mod identity;
pub mod merge;
pub mod normalize;
pub mod query;
pub mod stats;
pub mod store;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use catalog::Catalog;
pub use config::Config;
pub use errors::{CatalogError, Result};
pub use query::{CatalogFilters, SearchScope, StatusFilter};
pub use stats::CatalogStats;

use serde::{Deserialize, Serialize};

/// Subkind of a binding thesis, per the repetitive-case mechanism it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeseKind {
    Irr,
    Irdr,
    Iac,
}

/// Kind of catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Sumula,
    OrientacaoJurisprudencial,
    PrecedenteNormativo,
    Informativo,
    Tese(TeseKind),
}

impl ItemKind {
    /// Raw kind tag used for identity assignment.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            ItemKind::Sumula => "sumula",
            ItemKind::OrientacaoJurisprudencial => "oj",
            ItemKind::PrecedenteNormativo => "precedente",
            ItemKind::Informativo => "informativo",
            ItemKind::Tese(_) => "tese",
        }
    }

    /// Display label. The kind filter compares against this table, so the
    /// filter UI and the stored value must both map through it.
    pub fn display_label(&self) -> &'static str {
        match self {
            ItemKind::Sumula => "Súmula",
            ItemKind::OrientacaoJurisprudencial => "Orientação Jurisprudencial",
            ItemKind::PrecedenteNormativo => "Precedente Normativo",
            ItemKind::Informativo => "Informativo",
            ItemKind::Tese(TeseKind::Irr) => "Tese (IRR)",
            ItemKind::Tese(TeseKind::Irdr) => "Tese (IRDR)",
            ItemKind::Tese(TeseKind::Iac) => "Tese (IAC)",
        }
    }
}

/// Which persisted collection owns an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceGroup {
    /// Recreated fresh from the raw dataset on every load.
    CaseLawCatalog,
    /// User-uploaded bulletin, durable across reloads.
    UploadedBulletin,
    /// User-uploaded binding thesis, durable across reloads.
    UploadedThesis,
}

/// A record from the legal dataset or a user-uploaded document.
///
/// Optional fields are explicit: `number` is absent for uploaded documents
/// (which carry `name` instead), `theme`/`representative_case` are only
/// meaningful for theses, `organ` only for orientações jurisprudenciais.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Globally unique identifier, stable across reloads.
    pub id: String,
    /// Record kind.
    pub kind: ItemKind,
    /// Owning collection.
    pub source_group: SourceGroup,
    /// Natural key used for identity and filtering.
    #[serde(default)]
    pub number: Option<String>,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Searchable body text; may be empty.
    #[serde(default)]
    pub full_text: String,
    /// Judicial body, normalized uppercase with SBDI segmentation.
    #[serde(default)]
    pub organ: Option<String>,
    /// Whether the item is no longer in legal force.
    #[serde(default)]
    pub revoked: bool,
    /// Note shown when `revoked` is set.
    #[serde(default)]
    pub revocation_note: Option<String>,
    /// Theme number, theses only.
    #[serde(default)]
    pub theme: Option<String>,
    /// Representative case reference, theses only.
    #[serde(default)]
    pub representative_case: Option<String>,
    /// Document name, uploads only.
    #[serde(default)]
    pub name: Option<String>,
    /// Extracted plain text, uploads only; `None` when extraction failed.
    #[serde(default)]
    pub extracted_text: Option<String>,
}

impl CatalogItem {
    /// Whether the item belongs to the primary case-law catalog.
    pub fn is_case_law(&self) -> bool {
        matches!(self.source_group, SourceGroup::CaseLawCatalog)
    }
}
