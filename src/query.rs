//! # Query Engine Module
//!
//! ## Purpose
//! Applies compound filters (status, kind, organ, exact number, required
//! tags, free text) to the merged item collection, producing an ordered
//! result set. Matching is accent- and case-insensitive; result order is the
//! input order, never re-sorted by relevance.
//!
//! ## Input/Output Specification
//! - **Input**: item collection, filter set, the personal store (for tags and
//!   annotations)
//! - **Output**: references to the matching items, input order preserved
//! - **Semantics**: AND across filters, AND across free-text tokens and
//!   required tags

use crate::normalize::contains_normalized;
use crate::store::PersonalStore;
use crate::CatalogItem;
use serde::{Deserialize, Serialize};

/// Free-text tokens at or below this length are discarded.
const MIN_TOKEN_LENGTH: usize = 3;

/// Revocation-status restriction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    /// Excludes revoked items.
    Active,
    /// Requires revoked items.
    Revoked,
}

/// Which view the query runs in.
///
/// The primary case-law tab always restricts the candidate set to case-law
/// items. Other views search the entire merged collection only when free text
/// is present; without free text they also restrict to case-law. The
/// asymmetry is part of the UI contract and is preserved exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchScope {
    #[default]
    CaseLaw,
    Everything,
}

/// Compound filter set; every field is optional and defaults to "no
/// restriction".
#[derive(Debug, Clone, Default)]
pub struct CatalogFilters {
    pub status: StatusFilter,
    /// Display-kind label (see `ItemKind::display_label`).
    pub kind: Option<String>,
    /// Organ containment, applied to orientações jurisprudenciais only.
    pub organ: Option<String>,
    /// Exact natural-key match.
    pub number: Option<String>,
    /// Comma-separated required tags; AND across tags, normalized substring
    /// match per tag.
    pub tags: Option<String>,
    /// Whitespace-separated tokens; AND across tokens.
    pub free_text: Option<String>,
    pub scope: SearchScope,
}

/// Run the filters over the collection. Pure with respect to its inputs
/// aside from reading tags and annotations from the store.
pub fn search_items<'a>(
    items: &'a [CatalogItem],
    filters: &CatalogFilters,
    store: &PersonalStore,
) -> Vec<&'a CatalogItem> {
    let free_text = filters.free_text.as_deref().map(str::trim).unwrap_or("");
    let tokens: Vec<&str> = free_text
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LENGTH)
        .collect();

    let required_tags: Vec<&str> = filters
        .tags
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    items
        .iter()
        .filter(|item| in_scope(item, filters.scope, !free_text.is_empty()))
        .filter(|item| matches_status(item, filters.status))
        .filter(|item| matches_kind(item, filters.kind.as_deref()))
        .filter(|item| matches_organ(item, filters.organ.as_deref()))
        .filter(|item| matches_number(item, filters.number.as_deref()))
        .filter(|item| matches_tags(item, &required_tags, store))
        .filter(|item| matches_free_text(item, &tokens, store))
        .collect()
}

fn in_scope(item: &CatalogItem, scope: SearchScope, has_free_text: bool) -> bool {
    match scope {
        SearchScope::CaseLaw => item.is_case_law(),
        SearchScope::Everything => has_free_text || item.is_case_law(),
    }
}

fn matches_status(item: &CatalogItem, status: StatusFilter) -> bool {
    match status {
        StatusFilter::All => true,
        StatusFilter::Active => !item.revoked,
        StatusFilter::Revoked => item.revoked,
    }
}

fn matches_kind(item: &CatalogItem, kind: Option<&str>) -> bool {
    match kind {
        None => true,
        Some(label) => item.kind.display_label() == label.trim(),
    }
}

fn matches_organ(item: &CatalogItem, organ: Option<&str>) -> bool {
    let Some(filter) = organ else { return true };
    if !matches!(item.kind, crate::ItemKind::OrientacaoJurisprudencial) {
        return true;
    }
    item.organ
        .as_deref()
        .unwrap_or("")
        .to_uppercase()
        .contains(&filter.to_uppercase())
}

fn matches_number(item: &CatalogItem, number: Option<&str>) -> bool {
    match number {
        None => true,
        Some(number) => item.number.as_deref() == Some(number),
    }
}

fn matches_tags(item: &CatalogItem, required: &[&str], store: &PersonalStore) -> bool {
    if required.is_empty() {
        return true;
    }
    let stored = store.tags_for(&item.id);
    required
        .iter()
        .all(|needed| stored.iter().any(|tag| contains_normalized(tag, needed)))
}

fn matches_free_text(item: &CatalogItem, tokens: &[&str], store: &PersonalStore) -> bool {
    if tokens.is_empty() {
        return true;
    }

    let haystack = [
        item.number.as_deref().unwrap_or(""),
        &item.title,
        &item.full_text,
        item.extracted_text.as_deref().unwrap_or(""),
        store.annotation_for(&item.id).unwrap_or(""),
    ]
    .join(" ");

    tokens
        .iter()
        .all(|token| contains_normalized(&haystack, token))
}
