//! Dual-source hierarchy reconciliation.
//!
//! The same library's collection tree is serialized twice: once with parent
//! references (the primary tree) and once as a flattened `id -> "A/B/C"` map
//! taken from the website. The two views skew: the website may omit
//! collections, and may place a collection under a different parent.
//!
//! Policy:
//!
//! - A node present in both takes the secondary path and depth.
//! - If the secondary path names a different existing parent, the edge is
//!   moved to that parent (the flattened source wins) and the disagreement
//!   is recorded as a [`ParentConflict`]. A move that would create a cycle is
//!   refused and recorded with `applied = false`.
//! - A node missing from the secondary map falls back to `path = [title]`,
//!   `depth = 0`, flagged [`PathResolution::Unresolved`]. Its primary parent
//!   edge is kept.
//! - Secondary ids unknown to the primary tree are reported, not added.
//!
//! Reconciliation never fails; partial coverage only degrades placement.

use std::collections::{HashMap, HashSet};

use crate::error::ParentConflict;
use crate::hierarchy::{split_path, CollectionNode, LibraryHierarchy, PathMap, PathResolution};

/// Parse a JSON object of `collection id -> path string`.
pub fn parse_path_map(json: &str) -> Result<PathMap, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reconcile `primary` against a secondary path map of the same library.
pub fn reconcile(mut primary: LibraryHierarchy, secondary: &PathMap) -> LibraryHierarchy {
    let library = primary.library.clone();
    let order = primary.order.clone();

    // Valid secondary placements for ids the primary tree knows.
    let mut placements: HashMap<String, Vec<String>> = HashMap::new();
    for id in &order {
        match secondary.get(id).map(|p| split_path(p)) {
            Some(Some(segments)) => {
                placements.insert(id.clone(), segments);
            }
            Some(None) => {
                tracing::warn!(library = %library, id = %id, "ignoring malformed secondary path");
            }
            None => {}
        }
    }

    for id in &order {
        let Some(node) = primary.nodes.get_mut(id) else {
            continue;
        };
        match placements.get(id) {
            Some(segments) => {
                node.path = segments.clone();
                node.depth = segments.len() - 1;
                node.resolution = PathResolution::Secondary;
            }
            None => {
                node.path = vec![node.title.clone()];
                node.depth = 0;
                node.resolution = PathResolution::Unresolved;
                primary.diagnostics.unresolved.push(id.clone());
            }
        }
    }

    let conflicts = adopt_secondary_parents(&mut primary.nodes, &order, &placements);
    primary.diagnostics.parent_conflicts.extend(conflicts);

    let known: HashSet<&str> = order.iter().map(String::as_str).collect();
    primary.diagnostics.secondary_only.extend(
        secondary
            .keys()
            .filter(|id| !known.contains(id.as_str()))
            .cloned(),
    );

    primary.rebuild_index();

    let diag = &primary.diagnostics;
    if !diag.unresolved.is_empty() {
        tracing::warn!(
            library = %library,
            count = diag.unresolved.len(),
            "collections without a secondary path placed at the root"
        );
    }
    tracing::info!(
        library = %library,
        secondary = placements.len(),
        unresolved = diag.unresolved.len(),
        conflicts = diag.parent_conflicts.len(),
        secondary_only = diag.secondary_only.len(),
        "reconciled collection hierarchy"
    );

    primary
}

/// Move parent edges to the parents named by the secondary paths.
fn adopt_secondary_parents(
    nodes: &mut HashMap<String, CollectionNode>,
    order: &[String],
    placements: &HashMap<String, Vec<String>>,
) -> Vec<ParentConflict> {
    let mut by_path: HashMap<String, Vec<&str>> = HashMap::new();
    for (id, segments) in placements {
        by_path.entry(segments.join("/")).or_default().push(id.as_str());
    }

    let mut conflicts = Vec::new();
    for id in order {
        let Some(segments) = placements.get(id) else {
            continue;
        };
        let secondary_parent = match segments.len() {
            1 => None,
            n => match by_path.get(&segments[..n - 1].join("/")) {
                Some(ids) if ids.len() == 1 => Some(ids[0].to_string()),
                // Unknown or ambiguous parent path: nothing to adopt.
                _ => continue,
            },
        };

        let primary_parent = nodes.get(id).and_then(|n| n.parent_id.clone());
        if primary_parent == secondary_parent {
            continue;
        }

        let applied = match &secondary_parent {
            Some(candidate) => !is_ancestor_or_self(nodes, id, candidate),
            None => true,
        };
        if applied {
            if let Some(node) = nodes.get_mut(id) {
                node.parent_id = secondary_parent.clone();
            }
        }
        conflicts.push(ParentConflict {
            id: id.clone(),
            primary_parent,
            secondary_parent,
            applied,
        });
    }
    conflicts
}

/// Whether `id` is `candidate` or one of its ancestors.
fn is_ancestor_or_self(nodes: &HashMap<String, CollectionNode>, id: &str, candidate: &str) -> bool {
    let mut current = Some(candidate);
    let mut steps = 0;
    while let Some(cur) = current {
        if cur == id {
            return true;
        }
        steps += 1;
        if steps > nodes.len() {
            return true;
        }
        current = nodes.get(cur).and_then(|n| n.parent_id.as_deref());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{build, RawNode, SourceKind};

    fn relation_tree() -> LibraryHierarchy {
        build(
            "Portal",
            vec![
                RawNode::related("a", "Fish", None),
                RawNode::related("b", "Salmon", Some("a")),
                RawNode::related("c", "Habitat", Some("b")),
                RawNode::related("d", "Water", None),
            ],
            SourceKind::Relation,
        )
        .unwrap()
    }

    fn map(entries: &[(&str, &str)]) -> PathMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_secondary_paths_take_precedence() {
        let secondary = map(&[
            ("a", "Fish"),
            ("b", "Fish/Salmon"),
            ("c", "Fish/Salmon/Spawning Habitat"),
            ("d", "Water"),
        ]);
        let h = reconcile(relation_tree(), &secondary);
        let c = h.get("c").unwrap();
        assert_eq!(c.path, vec!["Fish", "Salmon", "Spawning Habitat"]);
        assert_eq!(c.depth, 2);
        assert_eq!(c.resolution, PathResolution::Secondary);
        assert!(h.diagnostics().unresolved.is_empty());
        assert!(h.diagnostics().parent_conflicts.is_empty());
    }

    #[test]
    fn test_partial_coverage_falls_back_to_root() {
        let secondary = map(&[("a", "Fish"), ("b", "Fish/Salmon")]);
        let h = reconcile(relation_tree(), &secondary);
        let c = h.get("c").unwrap();
        assert_eq!(c.path, vec!["Habitat"]);
        assert_eq!(c.depth, 0);
        assert_eq!(c.resolution, PathResolution::Unresolved);
        // Primary edge is kept for unresolved nodes.
        assert_eq!(c.parent_id.as_deref(), Some("b"));
        assert_eq!(h.diagnostics().unresolved, vec!["c", "d"]);
    }

    #[test]
    fn test_empty_secondary_marks_everything_unresolved() {
        let h = reconcile(relation_tree(), &PathMap::new());
        assert_eq!(h.diagnostics().unresolved.len(), 4);
        assert!(h.iter().all(|n| n.depth == 0));
        assert_eq!(h.len(), 4);
    }

    #[test]
    fn test_secondary_parent_wins() {
        // Website files Habitat directly under Water.
        let secondary = map(&[
            ("a", "Fish"),
            ("b", "Fish/Salmon"),
            ("c", "Water/Habitat"),
            ("d", "Water"),
        ]);
        let h = reconcile(relation_tree(), &secondary);
        assert_eq!(h.get("c").unwrap().parent_id.as_deref(), Some("d"));
        let kids: Vec<&str> = h.children("d").map(|n| n.id.as_str()).collect();
        assert_eq!(kids, vec!["c"]);
        assert_eq!(
            h.diagnostics().parent_conflicts,
            vec![ParentConflict {
                id: "c".to_string(),
                primary_parent: Some("b".to_string()),
                secondary_parent: Some("d".to_string()),
                applied: true,
            }]
        );
        assert!(h.invariant_violations().is_empty());
    }

    #[test]
    fn test_secondary_root_detaches_node() {
        let secondary = map(&[("a", "Fish"), ("b", "Salmon")]);
        let h = reconcile(relation_tree(), &secondary);
        assert_eq!(h.get("b").unwrap().parent_id, None);
        let roots: Vec<&str> = h.roots().map(|n| n.id.as_str()).collect();
        assert!(roots.contains(&"b"));
    }

    #[test]
    fn test_cycle_creating_parent_is_refused() {
        // Secondary claims Fish lives under Habitat, which descends from Fish.
        let secondary = map(&[("c", "Habitat"), ("a", "Habitat/Fish")]);
        let h = reconcile(relation_tree(), &secondary);
        let conflict = h
            .diagnostics()
            .parent_conflicts
            .iter()
            .find(|c| c.id == "a")
            .unwrap();
        assert!(!conflict.applied);
        assert_eq!(h.get("a").unwrap().parent_id, None);
        assert_eq!(h.breadth_first().len(), h.len());
    }

    #[test]
    fn test_secondary_only_ids_reported() {
        let secondary = map(&[("a", "Fish"), ("zz", "Ghost")]);
        let h = reconcile(relation_tree(), &secondary);
        assert_eq!(h.diagnostics().secondary_only, vec!["zz"]);
        assert!(!h.contains("zz"));
    }

    #[test]
    fn test_parse_path_map() {
        let m = parse_path_map(r#"{"K1": "Fish", "K2": "Fish/Salmon"}"#).unwrap();
        assert_eq!(m.get("K2").map(String::as_str), Some("Fish/Salmon"));
        assert!(parse_path_map("[1, 2]").is_err());
    }
}
