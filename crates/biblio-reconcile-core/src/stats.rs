//! Per-collection overlap statistics.
//!
//! Membership rows are joined to their collection's resolved path and to
//! their item's normalized title. A collection's `total_items` is the number
//! of distinct normalized titles reachable through its rows, and
//! `overlap_items` the subset that also appears in the other library.
//!
//! [`aggregate`] reports each collection on its own. [`roll_up`] additionally
//! folds every descendant's titles into its ancestors. Folding unions title
//! sets rather than adding counts, so an item filed in both a collection and
//! one of its sub-collections is counted once.
//!
//! Only collections with at least one title produce a row.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::hierarchy::LibraryHierarchy;
use crate::models::{CollectionMembership, CollectionStat, LibraryItem};

/// `item id -> normalized title` for one library.
pub type ItemIndex = HashMap<String, String>;

/// Index items by id. Items whose normalized title is empty are left out.
pub fn item_index(items: &[LibraryItem]) -> ItemIndex {
    items
        .iter()
        .filter(|i| !i.normalized_title.is_empty())
        .map(|i| (i.item_id.clone(), i.normalized_title.clone()))
        .collect()
}

/// A displayed collection: stat rows and matrix axes are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionKey {
    pub path: String,
    pub title: String,
    pub depth: usize,
}

/// Distinct normalized titles per displayed collection.
pub type GroupedTitles = BTreeMap<CollectionKey, BTreeSet<String>>;

/// Per-collection statistics, no ancestor roll-up.
pub fn aggregate(
    hierarchy: &LibraryHierarchy,
    memberships: &[CollectionMembership],
    items: &ItemIndex,
    common_titles: &BTreeSet<String>,
) -> Vec<CollectionStat> {
    let sets = collection_titles(hierarchy, memberships, items);
    stats_from_groups(hierarchy.library(), &group_titles(hierarchy, &sets), common_titles)
}

/// Per-collection statistics where every collection also includes the
/// titles of all its descendants.
pub fn roll_up(
    hierarchy: &LibraryHierarchy,
    memberships: &[CollectionMembership],
    items: &ItemIndex,
    common_titles: &BTreeSet<String>,
) -> Vec<CollectionStat> {
    let sets = rolled_titles(hierarchy, memberships, items);
    stats_from_groups(hierarchy.library(), &group_titles(hierarchy, &sets), common_titles)
}

/// Like [`collection_titles`], with every descendant's titles folded into
/// its ancestors.
pub fn rolled_titles(
    hierarchy: &LibraryHierarchy,
    memberships: &[CollectionMembership],
    items: &ItemIndex,
) -> HashMap<String, BTreeSet<String>> {
    let mut sets = collection_titles(hierarchy, memberships, items);

    // Children before parents: reverse breadth-first order.
    for id in hierarchy.breadth_first().iter().rev() {
        let Some(parent) = hierarchy.get(id).and_then(|n| n.parent_id.clone()) else {
            continue;
        };
        let Some(child_titles) = sets.get(id).cloned() else {
            continue;
        };
        sets.entry(parent).or_default().extend(child_titles);
    }
    sets
}

/// Distinct normalized titles per collection id.
pub fn collection_titles(
    hierarchy: &LibraryHierarchy,
    memberships: &[CollectionMembership],
    items: &ItemIndex,
) -> HashMap<String, BTreeSet<String>> {
    let mut sets: HashMap<String, BTreeSet<String>> = HashMap::new();
    let mut foreign = 0usize;
    let mut unknown_collection = 0usize;
    let mut unknown_item = 0usize;

    for m in memberships {
        if m.library != hierarchy.library() {
            foreign += 1;
            continue;
        }
        if !hierarchy.contains(&m.collection_id) {
            unknown_collection += 1;
            continue;
        }
        let Some(title) = items.get(&m.item_id) else {
            unknown_item += 1;
            continue;
        };
        sets.entry(m.collection_id.clone())
            .or_default()
            .insert(title.clone());
    }

    if foreign + unknown_collection + unknown_item > 0 {
        tracing::debug!(
            library = hierarchy.library(),
            foreign,
            unknown_collection,
            unknown_item,
            "membership rows dropped"
        );
    }
    sets
}

/// Group title sets by `(path, title, depth)`.
///
/// Distinct collections can share a display path (for example two
/// unresolved collections with the same title); their titles are unioned.
/// Collections without titles are left out.
pub fn group_titles(
    hierarchy: &LibraryHierarchy,
    sets: &HashMap<String, BTreeSet<String>>,
) -> GroupedTitles {
    let mut groups = GroupedTitles::new();
    for (id, titles) in sets {
        let Some(node) = hierarchy.get(id) else {
            continue;
        };
        if titles.is_empty() {
            continue;
        }
        let key = CollectionKey {
            path: node.path_string(),
            title: node.title.clone(),
            depth: node.depth,
        };
        groups.entry(key).or_default().extend(titles.iter().cloned());
    }
    groups
}

/// One stat row per grouped collection.
pub fn stats_from_groups(
    library: &str,
    groups: &GroupedTitles,
    common_titles: &BTreeSet<String>,
) -> Vec<CollectionStat> {
    groups
        .iter()
        .map(|(key, titles)| {
            let overlap = titles.iter().filter(|t| common_titles.contains(*t)).count();
            CollectionStat::new(library, &key.path, &key.title, key.depth, titles.len(), overlap)
        })
        .collect()
}

/// Sort rows by library, then collection path, for hierarchical display.
pub fn sort_for_display(stats: &mut [CollectionStat]) {
    stats.sort_by(|a, b| {
        a.library
            .cmp(&b.library)
            .then_with(|| a.collection_path.cmp(&b.collection_path))
            .then_with(|| a.collection_title.cmp(&b.collection_title))
    });
}
