//! # Text Normalization Module
//!
//! ## Purpose
//! Case folding and diacritic stripping for comparison. All search matching in
//! the query engine goes through this module, so "Súmula" and "sumula" compare
//! equal while the stored text keeps its accents.
//!
//! ## Input/Output Specification
//! - **Input**: Arbitrary text, including empty strings
//! - **Output**: Lowercased, accent-free, trimmed text; never panics

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, decompose accented characters, drop combining marks, and trim.
///
/// `normalize("")` returns `""`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Substring containment with both sides normalized.
///
/// An empty needle or haystack never matches.
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    let haystack = normalize(haystack);
    let needle = normalize(needle);
    if haystack.is_empty() || needle.is_empty() {
        return false;
    }
    haystack.contains(&needle)
}
