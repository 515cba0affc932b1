//! # Dataset Merger Module
//!
//! ## Purpose
//! Ingests the heterogeneous source payload (flat collections plus the
//! organ-grouped OJ mapping) and produces one flat, uniquely-identified item
//! collection. Uploaded bulletins and theses are concatenated after the
//! case-law items, keeping any id they already carry so personal state
//! survives across merges.
//!
//! ## Input/Output Specification
//! - **Input**: JSON payload `{ sumulas: [], ojs: { organ: [] }, precedentes_normativos: [] }`,
//!   persisted uploaded collections
//! - **Output**: `Vec<CatalogItem>` with unique ids, ordered súmulas → OJs →
//!   precedentes → bulletins → theses
//! - **Failure**: a non-object payload yields `MalformedDataset` and leaves
//!   prior state untouched; missing or non-array collections default to empty

use crate::errors::{CatalogError, Result};
use crate::{identity, CatalogItem, ItemKind, SourceGroup};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

/// A single record as it appears in the raw dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    /// Natural key; the dataset carries it as either a number or a string.
    #[serde(default)]
    pub numero: Option<Value>,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub texto: Option<String>,
    #[serde(default)]
    pub cancelada: bool,
    #[serde(default)]
    pub observacao: Option<String>,
}

/// Merge the raw dataset payload into a flat case-law item collection.
///
/// Ordering is súmulas, then OJ groups (stable group iteration order, list
/// order within a group), then precedentes normativos.
pub fn merge_dataset(payload: &Value) -> Result<Vec<CatalogItem>> {
    let root = payload.as_object().ok_or_else(|| CatalogError::MalformedDataset {
        details: "expected a JSON object at the top level".to_string(),
    })?;

    let mut items = Vec::new();

    for record in collection(root.get("sumulas")) {
        if let Some(item) = record_to_item(record, ItemKind::Sumula, None) {
            items.push(item);
        }
    }

    if let Some(groups) = root.get("ojs").and_then(Value::as_object) {
        for (organ_name, group) in groups {
            let organ = normalize_organ(organ_name);
            for record in collection(Some(group)) {
                if let Some(item) = record_to_item(
                    record,
                    ItemKind::OrientacaoJurisprudencial,
                    Some(organ.clone()),
                ) {
                    items.push(item);
                }
            }
        }
    }

    for record in collection(root.get("precedentes_normativos")) {
        if let Some(item) = record_to_item(record, ItemKind::PrecedenteNormativo, None) {
            items.push(item);
        }
    }

    Ok(dedupe_by_id(items))
}

/// Concatenate uploaded collections after the case-law items.
///
/// Uploaded items carrying a persisted id keep it; recomputation never wins
/// over an existing id.
pub fn merge_with_uploads(
    case_law: Vec<CatalogItem>,
    bulletins: &[CatalogItem],
    theses: &[CatalogItem],
) -> Vec<CatalogItem> {
    let mut items = case_law;

    for bulletin in bulletins {
        items.push(bulletin.clone());
    }

    for thesis in theses {
        let mut thesis = thesis.clone();
        if thesis.id.is_empty() {
            let theme = thesis.theme.clone().unwrap_or_default();
            thesis.id = identity::assign_item_id(&thesis.kind, &theme);
        }
        items.push(thesis);
    }

    dedupe_by_id(items)
}

/// Normalize an organ name: uppercase, `_` becomes `-`, and a digit glued to
/// `SBDI` is segmented (`SBDI1` -> `SBDI-1`, `SBDI2` -> `SBDI-2`).
pub fn normalize_organ(name: &str) -> String {
    static SBDI: OnceLock<Regex> = OnceLock::new();
    let sbdi = SBDI.get_or_init(|| Regex::new(r"SBDI(\d)").expect("valid SBDI pattern"));

    let upper = name.to_uppercase().replace('_', "-");
    sbdi.replace_all(&upper, "SBDI-$1").into_owned()
}

/// View an optional value as a record list, defaulting to empty.
///
/// Elements that fail to deserialize are skipped with a warning rather than
/// failing the whole merge.
fn collection(value: Option<&Value>) -> Vec<RawRecord> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<RawRecord>(entry.clone()) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("skipping malformed dataset record: {}", e),
        }
    }
    records
}

fn record_to_item(record: RawRecord, kind: ItemKind, organ: Option<String>) -> Option<CatalogItem> {
    let number = match record.numero.as_ref().and_then(natural_key) {
        Some(number) => number,
        None => {
            tracing::warn!(kind = kind.kind_tag(), "skipping record without a natural key");
            return None;
        }
    };

    Some(CatalogItem {
        id: identity::assign_item_id(&kind, &number),
        kind,
        source_group: SourceGroup::CaseLawCatalog,
        number: Some(number),
        title: record.titulo.unwrap_or_default(),
        full_text: record.texto.unwrap_or_default(),
        organ,
        revoked: record.cancelada,
        revocation_note: record.observacao,
        theme: None,
        representative_case: None,
        name: None,
        extracted_text: None,
    })
}

fn natural_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Drop later duplicates so the id-uniqueness invariant holds on output.
fn dedupe_by_id(items: Vec<CatalogItem>) -> Vec<CatalogItem> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.id.clone()) {
            unique.push(item);
        } else {
            tracing::warn!(id = %item.id, "dropping duplicate item id during merge");
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TeseKind;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "sumulas": [
                { "numero": 1, "titulo": "Prazo", "texto": "..." },
                { "numero": 2, "titulo": "Férias", "texto": "..." },
                { "numero": 3, "titulo": "Aviso prévio", "texto": "..." },
                { "numero": 4, "titulo": "Equiparação", "texto": "..." },
                { "numero": 5, "titulo": "Adicional", "texto": "...", "cancelada": true }
            ],
            "ojs": {
                "sbdi1": [
                    { "numero": 394, "titulo": "Horas extras", "texto": "..." },
                    { "numero": 400, "titulo": "Turnos", "texto": "..." }
                ],
                "sbdi2": [
                    { "numero": 54, "titulo": "Ação rescisória", "texto": "..." }
                ]
            },
            "precedentes_normativos": [
                { "numero": 119, "titulo": "Contribuição", "texto": "..." },
                { "numero": 120, "titulo": "Sentença normativa", "texto": "..." }
            ]
        })
    }

    #[test]
    fn test_merge_totals_and_unique_ids() {
        let items = merge_dataset(&sample_payload()).expect("merge");
        assert_eq!(items.len(), 10);

        let ids: HashSet<_> = items.iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_merge_ordering() {
        let items = merge_dataset(&sample_payload()).expect("merge");
        assert_eq!(items[0].kind, ItemKind::Sumula);
        assert_eq!(items[5].kind, ItemKind::OrientacaoJurisprudencial);
        assert_eq!(items[8].kind, ItemKind::PrecedenteNormativo);
    }

    #[test]
    fn test_oj_groups_receive_computed_organ() {
        let items = merge_dataset(&sample_payload()).expect("merge");
        let oj = items
            .iter()
            .find(|i| i.id == "oj_394")
            .expect("oj present");
        assert_eq!(oj.organ.as_deref(), Some("SBDI-1"));
    }

    #[test]
    fn test_organ_normalization() {
        assert_eq!(normalize_organ("sbdi1"), "SBDI-1");
        assert_eq!(normalize_organ("SBDI_2"), "SBDI-2");
        assert_eq!(normalize_organ("tribunal_pleno"), "TRIBUNAL-PLENO");
        // already segmented names stay put
        assert_eq!(normalize_organ("SBDI-1"), "SBDI-1");
    }

    #[test]
    fn test_non_object_payload_is_malformed() {
        let err = merge_dataset(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedDataset { .. }));
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let items = merge_dataset(&json!({})).expect("merge");
        assert!(items.is_empty());

        // non-array collection is treated as empty, not an error
        let items = merge_dataset(&json!({ "sumulas": "oops" })).expect("merge");
        assert!(items.is_empty());
    }

    #[test]
    fn test_ids_stable_across_merges() {
        let first = merge_dataset(&sample_payload()).expect("merge");
        let second = merge_dataset(&sample_payload()).expect("merge");
        let first_ids: Vec<_> = first.iter().map(|i| i.id.clone()).collect();
        let second_ids: Vec<_> = second.iter().map(|i| i.id.clone()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_uploaded_items_keep_existing_id() {
        let case_law = merge_dataset(&sample_payload()).expect("merge");
        let thesis = CatalogItem {
            id: "tese-1046".to_string(),
            kind: ItemKind::Tese(TeseKind::Irr),
            source_group: SourceGroup::UploadedThesis,
            number: None,
            title: String::new(),
            full_text: "Tese vinculante".to_string(),
            organ: None,
            revoked: false,
            revocation_note: None,
            theme: Some("1046".to_string()),
            representative_case: None,
            name: None,
            extracted_text: None,
        };

        let merged = merge_with_uploads(case_law, &[], &[thesis]);
        let last = merged.last().expect("thesis appended");
        assert_eq!(last.id, "tese-1046");
        assert_eq!(last.source_group, SourceGroup::UploadedThesis);
    }
}
