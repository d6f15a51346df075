//! Title → collections index across libraries.
//!
//! For each normalized title filed in at least one collection, lists the
//! collection paths it appears under in every library, and whether the title
//! belongs to the overlap.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::hierarchy::LibraryHierarchy;
use crate::models::{CollectionMembership, LibraryItem, Record};
use crate::overlap::OverlapSummary;

/// Borrowed view of one library's collection data.
#[derive(Debug, Clone, Copy)]
pub struct LibraryView<'a> {
    pub hierarchy: &'a LibraryHierarchy,
    pub items: &'a [LibraryItem],
    pub memberships: &'a [CollectionMembership],
}

/// Collections a single work is filed under, per library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleCollections {
    /// A representative raw title (first record, else first item).
    pub title: String,
    pub normalized_title: String,
    /// `library -> sorted collection paths`.
    pub collections: BTreeMap<String, Vec<String>>,
    pub is_overlap: bool,
}

/// Build the title index, sorted by normalized title.
pub fn title_collections(
    libraries: &[LibraryView<'_>],
    records: &[Record],
    summary: &OverlapSummary,
) -> Vec<TitleCollections> {
    let mut index: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();
    let mut display: HashMap<String, String> = HashMap::new();

    for view in libraries {
        let library = view.hierarchy.library();
        let items: HashMap<&str, &LibraryItem> = view
            .items
            .iter()
            .filter(|i| !i.normalized_title.is_empty())
            .map(|i| (i.item_id.as_str(), i))
            .collect();

        for m in view.memberships.iter().filter(|m| m.library == library) {
            let (Some(item), Some(node)) = (
                items.get(m.item_id.as_str()),
                view.hierarchy.get(&m.collection_id),
            ) else {
                continue;
            };
            display
                .entry(item.normalized_title.clone())
                .or_insert_with(|| item.title.clone());
            index
                .entry(item.normalized_title.clone())
                .or_default()
                .entry(library.to_string())
                .or_default()
                .insert(node.path_string());
        }
    }

    let mut record_titles: HashMap<&str, &str> = HashMap::new();
    for r in records {
        record_titles
            .entry(r.normalized_title.as_str())
            .or_insert(r.title.as_str());
    }

    index
        .into_iter()
        .map(|(normalized, per_library)| {
            let title = record_titles
                .get(normalized.as_str())
                .map(|t| t.to_string())
                .or_else(|| display.get(&normalized).cloned())
                .unwrap_or_else(|| normalized.clone());
            TitleCollections {
                title,
                is_overlap: summary.is_common(&normalized),
                collections: per_library
                    .into_iter()
                    .map(|(lib, paths)| (lib, paths.into_iter().collect()))
                    .collect(),
                normalized_title: normalized,
            }
        })
        .collect()
}
