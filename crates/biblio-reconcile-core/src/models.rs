//! Core data models shared by the reconciliation pipeline.
//!
//! Records, items and membership rows are produced by the application's
//! extractors; collection statistics are produced by [`crate::stats`].

use serde::Serialize;

use crate::normalize::normalize_title;

/// A bibliographic record from one library's record export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub title: String,
    /// Derived from `title` via [`normalize_title`].
    pub normalized_title: String,
    pub library: String,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub year: Option<String>,
}

impl Record {
    /// Create a record with only a title; the normalized title is derived.
    pub fn new(library: &str, title: &str) -> Self {
        Self {
            title: title.to_string(),
            normalized_title: normalize_title(title),
            library: library.to_string(),
            item_type: None,
            authors: Vec::new(),
            journal: None,
            year: None,
        }
    }
}

/// An item of a library export, addressed by the ids used in memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryItem {
    pub item_id: String,
    pub title: String,
    pub normalized_title: String,
}

impl LibraryItem {
    pub fn new(item_id: &str, title: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            title: title.to_string(),
            normalized_title: normalize_title(title),
        }
    }
}

/// Association between an item and a collection of the same library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CollectionMembership {
    pub collection_id: String,
    pub item_id: String,
    pub library: String,
}

impl CollectionMembership {
    pub fn new(library: &str, collection_id: &str, item_id: &str) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            item_id: item_id.to_string(),
            library: library.to_string(),
        }
    }
}

/// Per-collection overlap statistics.
///
/// Serialized field names match the exported stat table columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionStat {
    pub library: String,
    pub collection_path: String,
    pub collection_title: String,
    pub collection_depth: usize,
    pub total_items: usize,
    pub overlap_items: usize,
    /// `None` when `total_items == 0`.
    pub overlap_percentage: Option<f64>,
}

impl CollectionStat {
    /// Build a stat row, deriving the percentage from the two counts.
    pub fn new(
        library: &str,
        collection_path: &str,
        collection_title: &str,
        collection_depth: usize,
        total_items: usize,
        overlap_items: usize,
    ) -> Self {
        Self {
            library: library.to_string(),
            collection_path: collection_path.to_string(),
            collection_title: collection_title.to_string(),
            collection_depth,
            total_items,
            overlap_items,
            overlap_percentage: overlap_percentage(overlap_items, total_items),
        }
    }
}

/// `overlap / total * 100`, rounded to two decimals. `None` for an empty total.
pub fn overlap_percentage(overlap: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let pct = overlap as f64 / total as f64 * 100.0;
    Some((pct * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_new_normalizes() {
        let r = Record::new("Portal", "  Salmon   HABITAT! ");
        assert_eq!(r.normalized_title, "salmon habitat");
        assert_eq!(r.title, "  Salmon   HABITAT! ");
        assert_eq!(r.library, "Portal");
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(overlap_percentage(1, 3), Some(33.33));
        assert_eq!(overlap_percentage(2, 3), Some(66.67));
        assert_eq!(overlap_percentage(3, 3), Some(100.0));
        assert_eq!(overlap_percentage(0, 7), Some(0.0));
    }

    #[test]
    fn test_percentage_undefined_for_empty_total() {
        assert_eq!(overlap_percentage(0, 0), None);
        let stat = CollectionStat::new("Search", "Fish", "Fish", 0, 0, 0);
        assert!(stat.overlap_percentage.is_none());
    }
}
