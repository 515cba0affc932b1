//! # Identity Assignment Module
//!
//! ## Purpose
//! Derives a stable identifier for any catalog record from its kind and a
//! natural key. The same `(kind, key)` pair always yields the same id across
//! process restarts; this is what keeps favorites, annotations, and tags valid
//! after the dataset reloads.
//!
//! ## Input/Output Specification
//! - **Input**: Kind tag, natural key (number, theme, or upload timestamp key)
//! - **Output**: `"{prefix}_{cleaned_key}"` (theses: `"tese-{cleaned_key}"`)
//! - **Determinism**: pure function of its arguments; uniqueness for uploads
//!   comes from the caller combining a timestamp with a random suffix

use crate::ItemKind;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Derive the stable identifier for a record.
///
/// Strips every non-alphanumeric character from the natural key. Thesis ids
/// use a hyphen separator instead of the underscore every other kind uses;
/// persisted user data already references those ids, so the inconsistency is
/// kept for compatibility.
///
/// An unknown kind tag is non-fatal: the id falls back to the generic
/// `"{tag}_{key}"` shape and a warning is logged.
pub fn assign_id(kind_tag: &str, natural_key: &str) -> String {
    let cleaned: String = natural_key.chars().filter(|c| c.is_alphanumeric()).collect();

    match kind_tag {
        "sumula" => format!("sumula_{}", cleaned),
        "oj" => format!("oj_{}", cleaned),
        "precedente" => format!("precedente_{}", cleaned),
        "informativo" => format!("informativo_{}", cleaned),
        "tese" => format!("tese-{}", cleaned),
        other => {
            tracing::warn!(kind = other, "unknown item kind, using generic id prefix");
            format!("{}_{}", other, cleaned)
        }
    }
}

/// Typed wrapper over [`assign_id`] for records that already carry an
/// [`ItemKind`].
pub fn assign_item_id(kind: &ItemKind, natural_key: &str) -> String {
    assign_id(kind.kind_tag(), natural_key)
}

/// Natural key for a user-uploaded document lacking a stable one.
///
/// Combines the creation timestamp with a random suffix so concurrent uploads
/// within the same millisecond stay unique. The randomness lives here, at the
/// call site of [`assign_id`], keeping the assigner itself pure.
pub fn upload_natural_key(created_at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", created_at.timestamp_millis(), &suffix[..8])
}
