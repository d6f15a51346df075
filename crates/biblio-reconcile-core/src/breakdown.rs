//! Secondary breakdowns of a pass.
//!
//! [`type_distribution`] counts records per library and document type.
//! [`collection_overlap_matrix`] crosses the largest collections of one
//! library with the largest collections of the other: each cell is the share
//! of the row collection's titles that are also filed under the column
//! collection.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{overlap_percentage, Record};
use crate::stats::{CollectionKey, GroupedTitles};

/// Collections per matrix axis.
pub const MATRIX_COLLECTIONS: usize = 15;

/// Number of records of one document type in one library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub library: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub count: usize,
}

/// Count records per `(library, type)`.
///
/// Records without a type are not counted. Rows are sorted by library, then
/// by descending count, then by type.
pub fn type_distribution(records: &[Record]) -> Vec<TypeCount> {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for r in records {
        let Some(item_type) = r.item_type.as_deref().map(str::trim) else {
            continue;
        };
        if item_type.is_empty() {
            continue;
        }
        *counts.entry((r.library.as_str(), item_type)).or_default() += 1;
    }

    let mut rows: Vec<TypeCount> = counts
        .into_iter()
        .map(|((library, item_type), count)| TypeCount {
            library: library.to_string(),
            item_type: item_type.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.library
            .cmp(&b.library)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.item_type.cmp(&b.item_type))
    });
    rows
}

/// One collection on a matrix axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixAxis {
    pub collection_path: String,
    pub collection_title: String,
    pub collection_depth: usize,
    pub total_items: usize,
}

/// Collection × collection overlap between two libraries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapMatrix {
    pub row_library: String,
    pub column_library: String,
    pub rows: Vec<MatrixAxis>,
    pub columns: Vec<MatrixAxis>,
    /// `cells[i][j]`: percentage of `rows[i]`'s titles also filed under
    /// `columns[j]`, rounded to two decimals.
    pub cells: Vec<Vec<f64>>,
}

/// Which collections take part in a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixOptions {
    /// Minimum distinct titles for a collection to be placed on an axis.
    pub min_items: usize,
    /// Collections shallower than this are left off both axes.
    pub min_depth: usize,
    /// Maximum collections per axis.
    pub limit: usize,
}

/// Cross the largest collections of `rows` with those of `columns`.
pub fn collection_overlap_matrix(
    row_library: &str,
    rows: &GroupedTitles,
    column_library: &str,
    columns: &GroupedTitles,
    options: MatrixOptions,
) -> OverlapMatrix {
    let row_keys = largest(rows, options);
    let column_keys = largest(columns, options);

    let cells = row_keys
        .iter()
        .map(|(_, row_titles)| {
            column_keys
                .iter()
                .map(|(_, column_titles)| {
                    let shared = row_titles.intersection(column_titles).count();
                    overlap_percentage(shared, row_titles.len()).unwrap_or(0.0)
                })
                .collect()
        })
        .collect();

    OverlapMatrix {
        row_library: row_library.to_string(),
        column_library: column_library.to_string(),
        rows: row_keys.iter().map(|(k, t)| axis(k, t.len())).collect(),
        columns: column_keys.iter().map(|(k, t)| axis(k, t.len())).collect(),
        cells,
    }
}

type Entry<'a> = (&'a CollectionKey, &'a BTreeSet<String>);

/// Eligible collections, largest first, ties by path.
fn largest(groups: &GroupedTitles, options: MatrixOptions) -> Vec<Entry<'_>> {
    let mut eligible: Vec<Entry<'_>> = groups
        .iter()
        .filter(|(key, titles)| {
            !titles.is_empty() && titles.len() >= options.min_items && key.depth >= options.min_depth
        })
        .collect();
    eligible.sort_by(|(ka, ta), (kb, tb)| tb.len().cmp(&ta.len()).then_with(|| ka.cmp(kb)));
    eligible.truncate(options.limit);
    eligible
}

fn axis(key: &CollectionKey, total_items: usize) -> MatrixAxis {
    MatrixAxis {
        collection_path: key.path.clone(),
        collection_title: key.title.clone(),
        collection_depth: key.depth,
        total_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(library: &str, title: &str, item_type: Option<&str>) -> Record {
        let mut r = Record::new(library, title);
        r.item_type = item_type.map(str::to_string);
        r
    }

    fn key(path: &str, depth: usize) -> CollectionKey {
        CollectionKey {
            path: path.to_string(),
            title: path.rsplit('/').next().unwrap_or(path).to_string(),
            depth,
        }
    }

    fn titles(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn options(min_items: usize) -> MatrixOptions {
        MatrixOptions {
            min_items,
            min_depth: 0,
            limit: MATRIX_COLLECTIONS,
        }
    }

    #[test]
    fn test_type_distribution_counts_per_library() {
        let records = vec![
            typed("Search", "a", Some("Journal Article")),
            typed("Portal", "b", Some("book")),
            typed("Portal", "c", Some("journalArticle")),
            typed("Portal", "d", Some("journalArticle")),
            typed("Portal", "e", None),
            typed("Search", "f", Some("  ")),
        ];
        let rows = type_distribution(&records);
        let flat: Vec<(&str, &str, usize)> = rows
            .iter()
            .map(|r| (r.library.as_str(), r.item_type.as_str(), r.count))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("Portal", "journalArticle", 2),
                ("Portal", "book", 1),
                ("Search", "Journal Article", 1),
            ]
        );
    }

    #[test]
    fn test_type_distribution_empty() {
        assert!(type_distribution(&[]).is_empty());
    }

    #[test]
    fn test_matrix_cells_are_row_share() {
        let portal = GroupedTitles::from([
            (key("Fish", 0), titles(&["a", "b", "c", "d"])),
            (key("Water", 0), titles(&["e", "f"])),
        ]);
        let search = GroupedTitles::from([
            (key("Rivers", 0), titles(&["a", "e", "x"])),
            (key("Lakes", 0), titles(&["b"])),
        ]);
        let m = collection_overlap_matrix("Portal", &portal, "Search", &search, options(1));

        let rows: Vec<&str> = m.rows.iter().map(|a| a.collection_path.as_str()).collect();
        let cols: Vec<&str> = m.columns.iter().map(|a| a.collection_path.as_str()).collect();
        assert_eq!(rows, vec!["Fish", "Water"]);
        assert_eq!(cols, vec!["Rivers", "Lakes"]);
        assert_eq!(m.cells, vec![vec![25.0, 25.0], vec![50.0, 0.0]]);
        assert_eq!(m.rows[0].total_items, 4);
    }

    #[test]
    fn test_matrix_filters_and_limits_axes() {
        let mut portal = GroupedTitles::new();
        for i in 0..20 {
            let members: Vec<String> = (0..=i).map(|n| format!("t{}", n)).collect();
            portal.insert(key(&format!("C{:02}", i), 1), members.into_iter().collect());
        }
        portal.insert(key("Root", 0), titles(&["t0", "t1", "t2", "t3", "t4", "t5"]));
        let search = GroupedTitles::from([(key("All", 0), titles(&["t0", "t1"]))]);

        let opts = MatrixOptions {
            min_items: 2,
            min_depth: 1,
            limit: MATRIX_COLLECTIONS,
        };
        let m = collection_overlap_matrix("Portal", &portal, "Search", &search, opts);
        assert_eq!(m.rows.len(), MATRIX_COLLECTIONS);
        assert_eq!(m.rows[0].collection_path, "C19");
        assert!(m.rows.iter().all(|a| a.collection_depth >= 1));
        // Search's only collection sits above min_depth.
        assert!(m.columns.is_empty());
        assert!(m.cells.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_matrix_empty_inputs() {
        let m = collection_overlap_matrix(
            "Portal",
            &GroupedTitles::new(),
            "Search",
            &GroupedTitles::new(),
            options(5),
        );
        assert!(m.rows.is_empty());
        assert!(m.columns.is_empty());
        assert!(m.cells.is_empty());
    }
}
