//! Cross-library overlap on normalized titles.
//!
//! Each library contributes the set of normalized titles of its records.
//! The intersection of the two sets is the overlap; everything else is
//! library-only. Records with an empty normalized title (punctuation-only or
//! missing titles) cannot identify a work and are left out of both sets.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::Record;

/// Title-level overlap between two libraries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapSummary {
    pub left_library: String,
    pub right_library: String,
    /// Distinct titles only in the left library.
    pub left_only: usize,
    /// Distinct titles only in the right library.
    pub right_only: usize,
    /// Distinct titles in both.
    pub overlap: usize,
    pub left_total: usize,
    pub right_total: usize,
    #[serde(skip)]
    pub common_titles: BTreeSet<String>,
}

impl OverlapSummary {
    pub fn is_common(&self, normalized_title: &str) -> bool {
        self.common_titles.contains(normalized_title)
    }

    pub fn common_total(&self) -> usize {
        self.common_titles.len()
    }
}

/// Distinct non-empty normalized titles of one library's records.
pub fn library_titles(records: &[Record], library: &str) -> BTreeSet<String> {
    records
        .iter()
        .filter(|r| r.library == library && !r.normalized_title.is_empty())
        .map(|r| r.normalized_title.clone())
        .collect()
}

/// Compute the overlap between `left` and `right` over a mixed record list.
///
/// Records of any other library are ignored. An empty library simply has no
/// titles; the overlap is then zero.
pub fn compute_overlap(records: &[Record], left: &str, right: &str) -> OverlapSummary {
    let left_titles = library_titles(records, left);
    let right_titles = library_titles(records, right);
    let common_titles: BTreeSet<String> = left_titles
        .intersection(&right_titles)
        .cloned()
        .collect();

    let ignored = records
        .iter()
        .filter(|r| r.library != left && r.library != right)
        .count();
    if ignored > 0 {
        tracing::debug!(ignored, left, right, "records from other libraries ignored");
    }

    OverlapSummary {
        left_library: left.to_string(),
        right_library: right.to_string(),
        left_only: left_titles.len() - common_titles.len(),
        right_only: right_titles.len() - common_titles.len(),
        overlap: common_titles.len(),
        left_total: left_titles.len(),
        right_total: right_titles.len(),
        common_titles,
    }
}

/// Records split by overlap membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition<'a> {
    pub left_only: Vec<&'a Record>,
    pub right_only: Vec<&'a Record>,
    /// Records of either library whose title is in both.
    pub overlap: Vec<&'a Record>,
}

/// Partition the full record set into library-only and overlap subsets.
///
/// Records with an empty normalized title, or from a third library, land
/// in no subset.
pub fn partition<'a>(records: &'a [Record], summary: &OverlapSummary) -> Partition<'a> {
    let mut out = Partition::default();
    for record in records {
        if record.normalized_title.is_empty() {
            continue;
        }
        if summary.is_common(&record.normalized_title) {
            if record.library == summary.left_library || record.library == summary.right_library {
                out.overlap.push(record);
            }
        } else if record.library == summary.left_library {
            out.left_only.push(record);
        } else if record.library == summary.right_library {
            out.right_only.push(record);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::new("Portal", "Salmon Habitat"),
            Record::new("Portal", "salmon   HABITAT!"),
            Record::new("Portal", "Water Quality"),
            Record::new("Search", "Salmon Habitat"),
            Record::new("Search", "Forest Fire Risk"),
        ]
    }

    #[test]
    fn test_salmon_scenario() {
        let s = compute_overlap(&records(), "Portal", "Search");
        assert_eq!(
            s.common_titles,
            BTreeSet::from(["salmon habitat".to_string()])
        );
        assert_eq!(s.left_only, 1);
        assert_eq!(s.right_only, 1);
        assert_eq!(s.overlap, 1);
        assert_eq!(s.left_total, 2);
        assert_eq!(s.right_total, 2);
        assert_eq!(s.common_total(), 1);
    }

    #[test]
    fn test_symmetric() {
        let recs = records();
        let ab = compute_overlap(&recs, "Portal", "Search");
        let ba = compute_overlap(&recs, "Search", "Portal");
        assert_eq!(ab.common_titles, ba.common_titles);
        assert_eq!(ab.left_only, ba.right_only);
        assert_eq!(ab.right_only, ba.left_only);
        assert_eq!(ab.left_only + ab.overlap, ab.left_total);
        assert_eq!(ab.right_only + ab.overlap, ab.right_total);
    }

    #[test]
    fn test_empty_library_zero_overlap() {
        let recs = vec![Record::new("Portal", "Water Quality")];
        let s = compute_overlap(&recs, "Portal", "Search");
        assert_eq!(s.overlap, 0);
        assert_eq!(s.left_only, 1);
        assert_eq!(s.right_only, 0);

        let s = compute_overlap(&[], "Portal", "Search");
        assert_eq!(s.overlap, 0);
        assert_eq!(s.left_total, 0);
    }

    #[test]
    fn test_empty_normalized_titles_ignored() {
        let recs = vec![
            Record::new("Portal", "!!!"),
            Record::new("Search", "???"),
        ];
        let s = compute_overlap(&recs, "Portal", "Search");
        assert_eq!(s.overlap, 0);
        assert_eq!(s.left_total, 0);
        let p = partition(&recs, &s);
        assert!(p.overlap.is_empty() && p.left_only.is_empty() && p.right_only.is_empty());
    }

    #[test]
    fn test_partition() {
        let recs = records();
        let s = compute_overlap(&recs, "Portal", "Search");
        let p = partition(&recs, &s);
        assert_eq!(p.overlap.len(), 3);
        assert_eq!(p.left_only.len(), 1);
        assert_eq!(p.left_only[0].title, "Water Quality");
        assert_eq!(p.right_only.len(), 1);
        assert_eq!(p.right_only[0].title, "Forest Fire Risk");
    }

    #[test]
    fn test_third_library_ignored() {
        let mut recs = records();
        recs.push(Record::new("Archive", "Water Quality"));
        let s = compute_overlap(&recs, "Portal", "Search");
        assert_eq!(s.overlap, 1);
        let p = partition(&recs, &s);
        assert_eq!(p.left_only.len(), 1);
    }
}
