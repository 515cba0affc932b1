//! # Personal Store Module
//!
//! ## Purpose
//! Durable key-value layer for the user's personal state: favorites,
//! annotations, tags, the symmetric correlation graph, and the uploaded
//! bulletin/thesis collections. Every mutation updates in-memory state and its
//! durable representation before returning, so a subsequent read never
//! observes a partially-applied change.
//!
//! ## Input/Output Specification
//! - **Input**: item ids, annotation text, tags, correlation pairs, uploaded items
//! - **Output**: persisted JSON blobs, one independent key per collection
//! - **Recovery**: a corrupted blob resets only its own collection; the other
//!   collections still load
//!
//! ## Key Features
//! - Pluggable backend: sled for production, in-memory for tests
//! - Write-through persistence on every mutation
//! - Symmetric correlation edges with cascading cleanup
//! - Optional gzip compression for uploaded-document collections

use crate::errors::{CatalogError, Result};
use crate::CatalogItem;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

const FAVORITES_KEY: &str = "favorites";
const ANNOTATIONS_KEY: &str = "annotations";
const TAGS_KEY: &str = "tags";
const CORRELATIONS_KEY: &str = "correlations";
const BULLETINS_KEY: &str = "informativos";
const THESES_KEY: &str = "teses";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Durable string-keyed blob storage.
pub trait StorageBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn write(&self, key: &str, value: &[u8]) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Sled-backed storage used in production.
pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    /// Open (or create) the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = sled::open(path)?;
        Ok(Self { db })
    }
}

impl StorageBackend for SledBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.db.get(key).map_err(|e| CatalogError::Persistence {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(value.map(|ivec| ivec.to_vec()))
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.db
            .insert(key, value)
            .map_err(|e| CatalogError::Persistence {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        self.db.flush().map_err(|e| CatalogError::Persistence {
            key: key.to_string(),
            reason: format!("flush failed: {}", e),
        })?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.db
            .remove(key)
            .map_err(|e| CatalogError::Persistence {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        self.db.flush().map_err(|e| CatalogError::Persistence {
            key: key.to_string(),
            reason: format!("flush failed: {}", e),
        })?;
        Ok(())
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<B> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).write(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().expect("backend lock").get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .lock()
            .expect("backend lock")
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().expect("backend lock").remove(key);
        Ok(())
    }
}

/// The personal annotation/tag/correlation/favorites store.
///
/// Collections are cached in memory and written through on every mutation.
/// Absence of an id in a map means "no annotation"/"no tags"/"no
/// correlations" — empty values are never stored.
pub struct PersonalStore {
    backend: Box<dyn StorageBackend>,
    compress_documents: bool,
    favorites: Vec<String>,
    annotations: HashMap<String, String>,
    tags: HashMap<String, Vec<String>>,
    correlations: HashMap<String, Vec<String>>,
}

impl PersonalStore {
    /// Load the store from the backend. One corrupted collection resets to
    /// empty without preventing the others from loading.
    pub fn open(backend: Box<dyn StorageBackend>, compress_documents: bool) -> Result<Self> {
        let favorites = load_collection(backend.as_ref(), FAVORITES_KEY);
        let annotations = load_collection(backend.as_ref(), ANNOTATIONS_KEY);
        let tags = load_collection(backend.as_ref(), TAGS_KEY);
        let correlations = load_collection(backend.as_ref(), CORRELATIONS_KEY);

        Ok(Self {
            backend,
            compress_documents,
            favorites,
            annotations,
            tags,
            correlations,
        })
    }

    // ---- annotations ----

    /// Store the annotation for an item. Empty or whitespace-only text
    /// removes the key instead.
    pub fn set_annotation(&mut self, id: &str, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.annotations.remove(id);
        } else {
            self.annotations.insert(id.to_string(), trimmed.to_string());
        }
        self.persist(ANNOTATIONS_KEY, &self.annotations)
    }

    pub fn annotation_for(&self, id: &str) -> Option<&str> {
        self.annotations.get(id).map(String::as_str)
    }

    // ---- tags ----

    /// Add a tag to an item. No-op when the trimmed tag is empty or already
    /// present. Presence is a case-sensitive exact match; only the query-side
    /// tag filter matches accent/case-insensitively.
    pub fn add_tag(&mut self, id: &str, tag: &str) -> Result<()> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(());
        }
        let entry = self.tags.entry(id.to_string()).or_default();
        if entry.iter().any(|t| t == tag) {
            return Ok(());
        }
        entry.push(tag.to_string());
        self.persist(TAGS_KEY, &self.tags)
    }

    /// Remove a tag; the whole entry is deleted when its set empties.
    pub fn remove_tag(&mut self, id: &str, tag: &str) -> Result<()> {
        if let Some(entry) = self.tags.get_mut(id) {
            entry.retain(|t| t != tag);
            if entry.is_empty() {
                self.tags.remove(id);
            }
        }
        self.persist(TAGS_KEY, &self.tags)
    }

    pub fn tags_for(&self, id: &str) -> &[String] {
        self.tags.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    // ---- correlations ----

    /// Add a symmetric correlation edge. Self-correlation is rejected as a
    /// caller bug (logged, not an error).
    pub fn add_correlation(&mut self, id1: &str, id2: &str) -> Result<()> {
        if id1 == id2 {
            tracing::warn!(id = id1, "ignoring self-correlation");
            return Ok(());
        }
        insert_edge(&mut self.correlations, id1, id2);
        insert_edge(&mut self.correlations, id2, id1);
        self.persist(CORRELATIONS_KEY, &self.correlations)
    }

    /// Remove both directions of a correlation edge.
    pub fn remove_correlation(&mut self, id1: &str, id2: &str) -> Result<()> {
        remove_edge(&mut self.correlations, id1, id2);
        remove_edge(&mut self.correlations, id2, id1);
        self.persist(CORRELATIONS_KEY, &self.correlations)
    }

    /// Correlated ids for an item; items with no entry yield an empty slice.
    pub fn correlations_for(&self, id: &str) -> &[String] {
        self.correlations.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    // ---- favorites ----

    /// Append to the favorites set; insertion order is display order.
    pub fn add_favorite(&mut self, id: &str) -> Result<()> {
        if !self.favorites.iter().any(|f| f == id) {
            self.favorites.push(id.to_string());
        }
        self.persist(FAVORITES_KEY, &self.favorites)
    }

    pub fn remove_favorite(&mut self, id: &str) -> Result<()> {
        self.favorites.retain(|f| f != id);
        self.persist(FAVORITES_KEY, &self.favorites)
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.iter().any(|f| f == id)
    }

    pub fn favorites(&self) -> &[String] {
        &self.favorites
    }

    // ---- uploaded documents ----

    pub fn save_bulletins(&self, items: &[CatalogItem]) -> Result<()> {
        self.write_documents(BULLETINS_KEY, items)
    }

    pub fn load_bulletins(&self) -> Vec<CatalogItem> {
        self.read_documents(BULLETINS_KEY)
    }

    pub fn save_theses(&self, items: &[CatalogItem]) -> Result<()> {
        self.write_documents(THESES_KEY, items)
    }

    pub fn load_theses(&self) -> Vec<CatalogItem> {
        self.read_documents(THESES_KEY)
    }

    // ---- lifecycle ----

    /// Cascade removal of every piece of personal state referencing an id:
    /// its annotation, tags, favorite entry, its own correlation entry, and
    /// its membership in every other item's correlation set.
    pub fn remove_all_for(&mut self, id: &str) -> Result<()> {
        self.favorites.retain(|f| f != id);
        self.annotations.remove(id);
        self.tags.remove(id);

        self.correlations.remove(id);
        self.correlations.retain(|_, related| {
            related.retain(|r| r != id);
            !related.is_empty()
        });

        self.persist(FAVORITES_KEY, &self.favorites)?;
        self.persist(ANNOTATIONS_KEY, &self.annotations)?;
        self.persist(TAGS_KEY, &self.tags)?;
        self.persist(CORRELATIONS_KEY, &self.correlations)
    }

    /// Explicit data-clear: drops every collection, in memory and durably.
    pub fn clear(&mut self) -> Result<()> {
        self.favorites.clear();
        self.annotations.clear();
        self.tags.clear();
        self.correlations.clear();

        for key in [
            FAVORITES_KEY,
            ANNOTATIONS_KEY,
            TAGS_KEY,
            CORRELATIONS_KEY,
            BULLETINS_KEY,
            THESES_KEY,
        ] {
            self.backend.delete(key)?;
        }
        Ok(())
    }

    // ---- internals ----

    fn persist<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let blob = serde_json::to_vec(value)?;
        self.backend.write(key, &blob)
    }

    fn write_documents(&self, key: &str, items: &[CatalogItem]) -> Result<()> {
        let json = serde_json::to_vec(items)?;
        let blob = if self.compress_documents {
            compress(&json)?
        } else {
            json
        };
        self.backend.write(key, &blob)
    }

    fn read_documents(&self, key: &str) -> Vec<CatalogItem> {
        let blob = match self.backend.read(key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key, "failed to read uploaded documents: {}", e);
                return Vec::new();
            }
        };

        // the blob self-describes compression, so toggling the config option
        // between runs still reads existing data
        let json = if blob.starts_with(&GZIP_MAGIC) {
            match decompress(&blob) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(key, "corrupted compressed collection, resetting: {}", e);
                    return Vec::new();
                }
            }
        } else {
            blob
        };

        match serde_json::from_slice(&json) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(key, "corrupted stored collection, resetting: {}", e);
                Vec::new()
            }
        }
    }
}

/// Load one collection key, resetting it to default on corruption.
fn load_collection<T: DeserializeOwned + Default>(backend: &dyn StorageBackend, key: &str) -> T {
    match backend.read(key) {
        Ok(Some(blob)) => match serde_json::from_slice(&blob) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, "corrupted stored collection, resetting: {}", e);
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!(key, "failed to read stored collection, resetting: {}", e);
            T::default()
        }
    }
}

fn insert_edge(graph: &mut HashMap<String, Vec<String>>, from: &str, to: &str) {
    let entry = graph.entry(from.to_string()).or_default();
    if !entry.iter().any(|r| r == to) {
        entry.push(to.to_string());
    }
}

fn remove_edge(graph: &mut HashMap<String, Vec<String>>, from: &str, to: &str) {
    if let Some(entry) = graph.get_mut(from) {
        entry.retain(|r| r != to);
        if entry.is_empty() {
            graph.remove(from);
        }
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>> {
    use std::io::Write;

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    use std::io::Read;

    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemKind, SourceGroup};

    fn memory_store() -> PersonalStore {
        PersonalStore::open(Box::new(MemoryBackend::default()), false).expect("open store")
    }

    fn bulletin(id: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            kind: ItemKind::Informativo,
            source_group: SourceGroup::UploadedBulletin,
            number: None,
            title: "Informativo".to_string(),
            full_text: String::new(),
            organ: None,
            revoked: false,
            revocation_note: None,
            theme: None,
            representative_case: None,
            name: Some("informativo.pdf".to_string()),
            extracted_text: Some("texto extraído do boletim".to_string()),
        }
    }

    #[test]
    fn test_annotation_empty_text_removes_key() {
        let mut store = memory_store();
        store.set_annotation("sumula_1", "nota importante").unwrap();
        assert_eq!(store.annotation_for("sumula_1"), Some("nota importante"));

        store.set_annotation("sumula_1", "   ").unwrap();
        assert_eq!(store.annotation_for("sumula_1"), None);
    }

    #[test]
    fn test_tags_ordered_and_duplicate_free() {
        let mut store = memory_store();
        store.add_tag("sumula_1", "urgente").unwrap();
        store.add_tag("sumula_1", "revisar").unwrap();
        store.add_tag("sumula_1", "urgente").unwrap();
        assert_eq!(store.tags_for("sumula_1"), ["urgente", "revisar"]);

        // identity is case-sensitive: a differently-cased tag is a new tag
        store.add_tag("sumula_1", "Urgente").unwrap();
        assert_eq!(store.tags_for("sumula_1").len(), 3);
    }

    #[test]
    fn test_remove_last_tag_deletes_entry() {
        let mut store = memory_store();
        store.add_tag("oj_394", "comum").unwrap();
        store.remove_tag("oj_394", "comum").unwrap();
        assert!(store.tags_for("oj_394").is_empty());
        assert!(!store.tags.contains_key("oj_394"));
    }

    #[test]
    fn test_correlation_symmetry() {
        let mut store = memory_store();
        store.add_correlation("a", "b").unwrap();
        assert_eq!(store.correlations_for("a"), ["b"]);
        assert_eq!(store.correlations_for("b"), ["a"]);

        store.remove_correlation("a", "b").unwrap();
        assert!(store.correlations_for("a").is_empty());
        assert!(store.correlations_for("b").is_empty());
    }

    #[test]
    fn test_self_correlation_rejected() {
        let mut store = memory_store();
        store.add_correlation("a", "a").unwrap();
        assert!(store.correlations_for("a").is_empty());
    }

    #[test]
    fn test_cascade_delete_clears_reverse_edges() {
        let mut store = memory_store();
        store.add_favorite("x").unwrap();
        store.set_annotation("x", "nota").unwrap();
        store.add_tag("x", "tag").unwrap();
        store.add_correlation("x", "y").unwrap();
        store.add_correlation("z", "x").unwrap();

        store.remove_all_for("x").unwrap();

        assert!(!store.is_favorite("x"));
        assert_eq!(store.annotation_for("x"), None);
        assert!(store.tags_for("x").is_empty());
        assert!(store.correlations_for("x").is_empty());
        // the reverse edges are gone too, not just x's own entry
        assert!(store.correlations_for("y").is_empty());
        assert!(store.correlations_for("z").is_empty());
    }

    #[test]
    fn test_favorites_preserve_insertion_order() {
        let mut store = memory_store();
        store.add_favorite("b").unwrap();
        store.add_favorite("a").unwrap();
        store.add_favorite("b").unwrap();
        assert_eq!(store.favorites(), ["b", "a"]);
    }

    #[test]
    fn test_round_trip_across_reopen() {
        let backend = std::sync::Arc::new(MemoryBackend::default());

        {
            let mut store =
                PersonalStore::open(Box::new(backend.clone()), false).unwrap();
            store.set_annotation("sumula_1", "nota").unwrap();
            store.add_tag("sumula_1", "urgente").unwrap();
            store.add_correlation("sumula_1", "oj_394").unwrap();
            store.add_favorite("sumula_1").unwrap();
        }

        let store = PersonalStore::open(Box::new(backend), false).unwrap();
        assert_eq!(store.annotation_for("sumula_1"), Some("nota"));
        assert_eq!(store.tags_for("sumula_1"), ["urgente"]);
        assert_eq!(store.correlations_for("oj_394"), ["sumula_1"]);
        assert_eq!(store.favorites(), ["sumula_1"]);
    }

    #[test]
    fn test_corrupted_collection_resets_alone() {
        let backend = MemoryBackend::default();
        backend.write(TAGS_KEY, b"{not json").unwrap();
        backend
            .write(FAVORITES_KEY, br#"["sumula_1"]"#)
            .unwrap();

        let store = PersonalStore::open(Box::new(backend), false).unwrap();
        assert!(store.tags_for("sumula_1").is_empty());
        assert_eq!(store.favorites(), ["sumula_1"]);
    }

    #[test]
    fn test_documents_round_trip_compressed() {
        let store = PersonalStore::open(Box::new(MemoryBackend::default()), true).unwrap();
        store.save_bulletins(&[bulletin("informativo_1")]).unwrap();

        let loaded = store.load_bulletins();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "informativo_1");
        assert_eq!(
            loaded[0].extracted_text.as_deref(),
            Some("texto extraído do boletim")
        );
    }

    #[test]
    fn test_sled_backend_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.db");

        {
            let backend = SledBackend::open(&path).expect("open sled");
            let mut store = PersonalStore::open(Box::new(backend), true).unwrap();
            store.set_annotation("precedente_119", "ver conexos").unwrap();
            store.save_theses(&[]).unwrap();
        }

        // the first handle is dropped, so reopening sees the flushed writes
        let backend = SledBackend::open(&path).expect("reopen sled");
        let store = PersonalStore::open(Box::new(backend), true).unwrap();
        assert_eq!(store.annotation_for("precedente_119"), Some("ver conexos"));
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut store = memory_store();
        store.add_favorite("a").unwrap();
        store.add_tag("a", "t").unwrap();
        store.clear().unwrap();
        assert!(store.favorites().is_empty());
        assert!(store.tags_for("a").is_empty());
        assert!(store.load_bulletins().is_empty());
    }
}
