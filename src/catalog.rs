//! # Catalog Context Module
//!
//! ## Purpose
//! The context object owned by the application entry point: the merged item
//! collection, an O(1) id index, and the personal store. All core operations
//! flow through it, so there is no hidden module-level state and the whole
//! engine can be constructed against an in-memory backend for testing.
//!
//! ## Input/Output Specification
//! - **Input**: dataset payloads, uploaded documents, filter sets, item ids
//! - **Output**: ordered result sets, statistics, item lookups
//! - **Lifecycle**: case-law items are recreated on every `load_dataset`;
//!   uploaded documents and all personal state are durable until explicitly
//!   removed or cleared

use crate::config::Config;
use crate::errors::{CatalogError, Result};
use crate::query::{self, CatalogFilters};
use crate::stats::{self, CatalogStats};
use crate::store::{PersonalStore, SledBackend, StorageBackend};
use crate::utils::Timer;
use crate::{identity, merge, CatalogItem, ItemKind, SourceGroup, TeseKind};
use chrono::Utc;
use std::collections::HashMap;

/// The catalog engine: item collection, id index, and personal store.
pub struct Catalog {
    items: Vec<CatalogItem>,
    index: HashMap<String, usize>,
    store: PersonalStore,
}

impl Catalog {
    /// Open the catalog with the sled backend configured in `config`.
    pub fn open(config: &Config) -> Result<Self> {
        let backend = SledBackend::open(&config.storage.db_path)?;
        Self::with_backend(Box::new(backend), config.storage.enable_compression)
    }

    /// Open the catalog over an arbitrary backend. Persisted uploads are
    /// restored into the collection; case-law items arrive with
    /// [`Catalog::load_dataset`].
    pub fn with_backend(backend: Box<dyn StorageBackend>, compress: bool) -> Result<Self> {
        let store = PersonalStore::open(backend, compress)?;
        let mut catalog = Self {
            items: Vec::new(),
            index: HashMap::new(),
            store,
        };

        let bulletins = catalog.store.load_bulletins();
        let theses = catalog.store.load_theses();
        catalog.replace_items(merge::merge_with_uploads(Vec::new(), &bulletins, &theses));

        tracing::info!(
            uploads = catalog.items.len(),
            "catalog opened, restored uploaded documents"
        );
        Ok(catalog)
    }

    /// Merge a raw dataset payload into the collection, all-or-nothing: a
    /// malformed payload leaves the prior collection untouched.
    pub fn load_dataset(&mut self, payload: &serde_json::Value) -> Result<usize> {
        let timer = Timer::new("load_dataset");

        let case_law = merge::merge_dataset(payload)?;
        let bulletins = self.store.load_bulletins();
        let theses = self.store.load_theses();
        self.replace_items(merge::merge_with_uploads(case_law, &bulletins, &theses));

        timer.stop();
        tracing::info!(items = self.items.len(), "dataset loaded");
        Ok(self.items.len())
    }

    /// Register an uploaded bulletin. Its natural key is the creation
    /// timestamp combined with a random suffix, so the derived id is unique
    /// even across concurrent uploads. Extraction failure is represented by
    /// `extracted_text: None`; the document is still created.
    pub fn add_bulletin(&mut self, name: &str, extracted_text: Option<String>) -> Result<String> {
        let key = identity::upload_natural_key(Utc::now());
        let id = identity::assign_id("informativo", &key);

        let item = CatalogItem {
            id: id.clone(),
            kind: ItemKind::Informativo,
            source_group: SourceGroup::UploadedBulletin,
            number: None,
            title: name.to_string(),
            full_text: String::new(),
            organ: None,
            revoked: false,
            revocation_note: None,
            theme: None,
            representative_case: None,
            name: Some(name.to_string()),
            extracted_text,
        };

        self.push_item(item)?;
        self.persist_uploads(SourceGroup::UploadedBulletin)?;
        Ok(id)
    }

    /// Register an uploaded binding thesis, keyed by its theme number.
    pub fn add_thesis(
        &mut self,
        subkind: TeseKind,
        theme: &str,
        full_text: &str,
        representative_case: Option<String>,
    ) -> Result<String> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(CatalogError::Validation {
                field: "theme".to_string(),
                reason: "Thesis theme cannot be empty".to_string(),
            });
        }

        let id = identity::assign_id("tese", theme);
        let item = CatalogItem {
            id: id.clone(),
            kind: ItemKind::Tese(subkind),
            source_group: SourceGroup::UploadedThesis,
            number: None,
            title: String::new(),
            full_text: full_text.to_string(),
            organ: None,
            revoked: false,
            revocation_note: None,
            theme: Some(theme.to_string()),
            representative_case,
            name: None,
            extracted_text: None,
        };

        self.push_item(item)?;
        self.persist_uploads(SourceGroup::UploadedThesis)?;
        Ok(id)
    }

    /// Delete a document and cascade: the collection, favorites, annotation,
    /// tags, and every correlation edge referencing it on either side.
    pub fn remove_document(&mut self, id: &str) -> Result<()> {
        let position = *self
            .index
            .get(id)
            .ok_or_else(|| CatalogError::MissingItem { id: id.to_string() })?;

        let removed = self.items.remove(position);
        self.rebuild_index();
        self.store.remove_all_for(id)?;

        match removed.source_group {
            SourceGroup::UploadedBulletin => self.persist_uploads(SourceGroup::UploadedBulletin)?,
            SourceGroup::UploadedThesis => self.persist_uploads(SourceGroup::UploadedThesis)?,
            // case-law items reappear on the next dataset load; only the
            // personal state removal is durable
            SourceGroup::CaseLawCatalog => {}
        }

        tracing::info!(id, "document removed");
        Ok(())
    }

    /// Look up an item by id. Absence means "item no longer exists" and is
    /// reported, not fatal; callers skip the reference.
    pub fn item(&self, id: &str) -> Result<&CatalogItem> {
        self.index
            .get(id)
            .map(|&position| &self.items[position])
            .ok_or_else(|| CatalogError::MissingItem { id: id.to_string() })
    }

    /// Run the query engine over the collection.
    pub fn search(&self, filters: &CatalogFilters) -> Vec<&CatalogItem> {
        query::search_items(&self.items, filters, &self.store)
    }

    /// Derived counts over the case-law catalog.
    pub fn stats(&self) -> CatalogStats {
        stats::compute_stats(&self.items)
    }

    /// The favorited items, in insertion order, skipping ids that no longer
    /// resolve.
    pub fn favorite_items(&self) -> Vec<&CatalogItem> {
        self.store
            .favorites()
            .iter()
            .filter_map(|id| match self.item(id) {
                Ok(item) => Some(item),
                Err(_) => {
                    tracing::debug!(id = %id, "skipping favorite for missing item");
                    None
                }
            })
            .collect()
    }

    /// Read access to the personal store.
    pub fn store(&self) -> &PersonalStore {
        &self.store
    }

    /// Mutating access to the personal store (annotations, tags,
    /// correlations, favorites).
    pub fn store_mut(&mut self) -> &mut PersonalStore {
        &mut self.store
    }

    /// Explicit data-clear: every personal collection and every uploaded
    /// document is dropped; case-law items stay until the next load.
    pub fn clear_personal_data(&mut self) -> Result<()> {
        self.store.clear()?;
        self.items.retain(CatalogItem::is_case_law);
        self.rebuild_index();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    fn replace_items(&mut self, items: Vec<CatalogItem>) {
        self.items = items;
        self.rebuild_index();
    }

    fn push_item(&mut self, item: CatalogItem) -> Result<()> {
        if self.index.contains_key(&item.id) {
            return Err(CatalogError::Validation {
                field: "id".to_string(),
                reason: format!("An item with id '{}' already exists", item.id),
            });
        }
        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    fn persist_uploads(&self, group: SourceGroup) -> Result<()> {
        let owned: Vec<CatalogItem> = self
            .items
            .iter()
            .filter(|i| i.source_group == group)
            .cloned()
            .collect();

        match group {
            SourceGroup::UploadedBulletin => self.store.save_bulletins(&owned),
            SourceGroup::UploadedThesis => self.store.save_theses(&owned),
            SourceGroup::CaseLawCatalog => Ok(()),
        }
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| (item.id.clone(), position))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use serde_json::json;
    use std::sync::Arc;

    fn payload() -> serde_json::Value {
        json!({
            "sumulas": [
                { "numero": 1, "titulo": "Prazo", "texto": "dano moral" },
                { "numero": 2, "titulo": "Férias", "texto": "férias", "cancelada": true }
            ],
            "ojs": {
                "SBDI1": [{ "numero": 394, "titulo": "Horas", "texto": "horas extras" }]
            },
            "precedentes_normativos": [
                { "numero": 119, "titulo": "Contribuição", "texto": "contribuição" }
            ]
        })
    }

    fn open_memory() -> Catalog {
        Catalog::with_backend(Box::new(MemoryBackend::default()), false).expect("open")
    }

    #[test]
    fn test_load_dataset_and_index() {
        let mut catalog = open_memory();
        let count = catalog.load_dataset(&payload()).unwrap();
        assert_eq!(count, 4);
        assert_eq!(catalog.item("sumula_1").unwrap().title, "Prazo");
        assert_eq!(
            catalog.item("oj_394").unwrap().organ.as_deref(),
            Some("SBDI-1")
        );
    }

    #[test]
    fn test_malformed_payload_keeps_prior_state() {
        let mut catalog = open_memory();
        catalog.load_dataset(&payload()).unwrap();

        let err = catalog.load_dataset(&json!("not an object")).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedDataset { .. }));
        assert_eq!(catalog.len(), 4);
        assert!(catalog.item("sumula_1").is_ok());
    }

    #[test]
    fn test_stats_from_catalog() {
        let mut catalog = open_memory();
        catalog.load_dataset(&payload()).unwrap();
        let stats = catalog.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.revoked, 1);
        assert_eq!(stats.total, stats.active + stats.revoked);
    }

    #[test]
    fn test_uploads_survive_reload_and_reopen() {
        let backend = Arc::new(MemoryBackend::default());

        let thesis_id = {
            let mut catalog =
                Catalog::with_backend(Box::new(backend.clone()), false).unwrap();
            catalog.load_dataset(&payload()).unwrap();
            let id = catalog
                .add_thesis(TeseKind::Irr, "1046", "tese vinculante", None)
                .unwrap();
            assert_eq!(id, "tese-1046");

            // a reload recreates case law but keeps the uploaded thesis
            catalog.load_dataset(&payload()).unwrap();
            assert!(catalog.item(&id).is_ok());
            id
        };

        let catalog = Catalog::with_backend(Box::new(backend), false).unwrap();
        let thesis = catalog.item(&thesis_id).unwrap();
        assert_eq!(thesis.theme.as_deref(), Some("1046"));
    }

    #[test]
    fn test_duplicate_thesis_theme_rejected() {
        let mut catalog = open_memory();
        catalog
            .add_thesis(TeseKind::Irdr, "10", "primeira", None)
            .unwrap();
        let err = catalog
            .add_thesis(TeseKind::Irdr, "10", "segunda", None)
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }));
    }

    #[test]
    fn test_bulletin_created_even_without_extraction() {
        let mut catalog = open_memory();
        let id = catalog.add_bulletin("boletim.pdf", None).unwrap();
        let item = catalog.item(&id).unwrap();
        assert!(item.extracted_text.is_none());
        assert_eq!(item.name.as_deref(), Some("boletim.pdf"));
        assert!(id.starts_with("informativo_"));
    }

    #[test]
    fn test_remove_document_cascades() {
        let mut catalog = open_memory();
        catalog.load_dataset(&payload()).unwrap();
        let id = catalog.add_bulletin("boletim.pdf", Some("texto".into())).unwrap();

        catalog.store_mut().add_favorite(&id).unwrap();
        catalog.store_mut().set_annotation(&id, "nota").unwrap();
        catalog.store_mut().add_tag(&id, "tag").unwrap();
        catalog.store_mut().add_correlation(&id, "sumula_1").unwrap();

        catalog.remove_document(&id).unwrap();

        assert!(catalog.item(&id).is_err());
        assert!(!catalog.store().is_favorite(&id));
        assert_eq!(catalog.store().annotation_for(&id), None);
        assert!(catalog.store().tags_for(&id).is_empty());
        assert!(catalog.store().correlations_for(&id).is_empty());
        assert!(catalog.store().correlations_for("sumula_1").is_empty());
        assert!(catalog.store().load_bulletins().is_empty());
    }

    #[test]
    fn test_remove_missing_document() {
        let mut catalog = open_memory();
        let err = catalog.remove_document("sumula_999").unwrap_err();
        assert!(matches!(err, CatalogError::MissingItem { .. }));
    }

    #[test]
    fn test_favorite_items_skip_missing_ids() {
        let mut catalog = open_memory();
        catalog.load_dataset(&payload()).unwrap();
        catalog.store_mut().add_favorite("sumula_1").unwrap();
        catalog.store_mut().add_favorite("sumula_999").unwrap();

        let favorites = catalog.favorite_items();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, "sumula_1");
    }

    #[test]
    fn test_clear_personal_data() {
        let mut catalog = open_memory();
        catalog.load_dataset(&payload()).unwrap();
        catalog.add_bulletin("boletim.pdf", None).unwrap();
        catalog.store_mut().add_favorite("sumula_1").unwrap();

        catalog.clear_personal_data().unwrap();

        assert_eq!(catalog.len(), 4);
        assert!(catalog.store().favorites().is_empty());
        assert!(catalog.store().load_bulletins().is_empty());
    }
}
