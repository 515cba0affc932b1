//! # Statistics Aggregation Module
//!
//! ## Purpose
//! Derives counts from the merged collection, restricted to case-law items.
//! Pure function, no side effects; `total == active + revoked` always holds.

use crate::CatalogItem;
use serde::{Deserialize, Serialize};

/// Derived counts over the case-law catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total: usize,
    pub active: usize,
    pub revoked: usize,
}

/// Count case-law items by revocation status.
pub fn compute_stats(items: &[CatalogItem]) -> CatalogStats {
    let mut active = 0;
    let mut revoked = 0;

    for item in items.iter().filter(|i| i.is_case_law()) {
        if item.revoked {
            revoked += 1;
        } else {
            active += 1;
        }
    }

    CatalogStats {
        total: active + revoked,
        active,
        revoked,
    }
}
