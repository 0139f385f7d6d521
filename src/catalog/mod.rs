//! Category normalization.
//!
//! Raw category labels arrive from the repository with inconsistent casing and
//! punctuation. This module turns a label into a stable slug and a canonical
//! display name, and holds the fallback catalogue shown when the store has no
//! categories to offer.

use crate::models::Category;

/// Canonical display names for category labels known to appear in the
/// repository, keyed by the exact stored value.
pub const CATEGORY_NAMES: [(&str, &str); 5] = [
    ("cai", "CAI (E-Learning/Computer-Aided Instruction Systems)"),
    ("website", "Website"),
    ("mobile application", "Mobile Application"),
    ("information system", "Information System"),
    ("game development", "Game Development"),
];

/// Raw names of the catalogue shown when the store is unreachable or empty.
pub const DEFAULT_CATEGORIES: [&str; 5] = [
    "CAI (E-Learning/Computer-Aided Instruction Systems)",
    "Website",
    "Mobile Application",
    "Information System",
    "Game Development",
];

/// Derive a URL-safe identifier from a raw category label.
///
/// The label is lowercased, every run of characters outside `[a-z0-9]` becomes
/// a single `-`, and leading or trailing hyphens are dropped.
///
/// # Example
/// ```
/// use paper_discovery::catalog::slugify;
/// assert_eq!(
///     slugify("CAI (E-Learning/Computer-Aided Instruction Systems)"),
///     "cai-e-learning-computer-aided-instruction-systems"
/// );
/// ```
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for c in raw.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Canonical label for a raw category, or the raw value itself when the label
/// is not in [`CATEGORY_NAMES`].
pub fn display_name(raw: &str) -> &str {
    CATEGORY_NAMES
        .iter()
        .find(|(key, _)| *key == raw)
        .map(|(_, name)| *name)
        .unwrap_or(raw)
}

/// The fixed fallback catalogue: five categories with no papers.
pub fn default_catalog() -> Vec<Category> {
    DEFAULT_CATEGORIES.iter().map(|raw| Category::empty(raw)).collect()
}
