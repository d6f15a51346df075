//! Coverage-gap ranking.
//!
//! A collection that is well populated in one library but barely present in
//! the other has a low overlap percentage. Ranking ascending by percentage
//! surfaces those collections first.

use std::cmp::Ordering;

use crate::models::CollectionStat;

/// Rank collections with at least `min_items` titles by ascending overlap.
///
/// Rows with an undefined percentage are excluded. Ties are broken by
/// collection path, then library, then title, so the order is fully
/// deterministic.
pub fn rank_gaps(stats: &[CollectionStat], min_items: usize) -> Vec<CollectionStat> {
    let mut ranked: Vec<CollectionStat> = stats
        .iter()
        .filter(|s| s.total_items >= min_items && s.overlap_percentage.is_some())
        .cloned()
        .collect();
    ranked.sort_by(compare_gap);
    ranked
}

fn compare_gap(a: &CollectionStat, b: &CollectionStat) -> Ordering {
    let pa = a.overlap_percentage.unwrap_or(f64::INFINITY);
    let pb = b.overlap_percentage.unwrap_or(f64::INFINITY);
    pa.total_cmp(&pb)
        .then_with(|| a.collection_path.cmp(&b.collection_path))
        .then_with(|| a.library.cmp(&b.library))
        .then_with(|| a.collection_title.cmp(&b.collection_title))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(library: &str, path: &str, total: usize, overlap: usize) -> CollectionStat {
        let title = path.rsplit('/').next().unwrap_or(path);
        let depth = path.matches('/').count();
        CollectionStat::new(library, path, title, depth, total, overlap)
    }

    fn sample() -> Vec<CollectionStat> {
        vec![
            stat("Portal", "Water", 10, 5),
            stat("Portal", "Fish/Salmon", 8, 0),
            stat("Search", "Fish", 20, 2),
            stat("Portal", "Birds", 4, 0),
            stat("Search", "Air", 6, 0),
            stat("Search", "Empty", 0, 0),
        ]
    }

    #[test]
    fn test_filters_and_orders() {
        let ranked = rank_gaps(&sample(), 5);
        let paths: Vec<&str> = ranked.iter().map(|s| s.collection_path.as_str()).collect();
        assert_eq!(paths, vec!["Air", "Fish/Salmon", "Fish", "Water"]);
    }

    #[test]
    fn test_zero_total_never_ranked() {
        let ranked = rank_gaps(&sample(), 0);
        assert!(ranked.iter().all(|s| s.total_items > 0));
        assert_eq!(ranked.len(), 5);
    }

    #[test]
    fn test_deterministic_under_input_order() {
        let mut reversed = sample();
        reversed.reverse();
        assert_eq!(rank_gaps(&sample(), 1), rank_gaps(&reversed, 1));
        assert_eq!(rank_gaps(&sample(), 1), rank_gaps(&sample(), 1));
    }

    #[test]
    fn test_tie_break_by_path_then_library() {
        let stats = vec![
            stat("Search", "Same", 5, 0),
            stat("Portal", "Same", 5, 0),
            stat("Portal", "Alpha", 5, 0),
        ];
        let ranked = rank_gaps(&stats, 1);
        let keys: Vec<(&str, &str)> = ranked
            .iter()
            .map(|s| (s.collection_path.as_str(), s.library.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("Alpha", "Portal"), ("Same", "Portal"), ("Same", "Search")]
        );
    }
}
