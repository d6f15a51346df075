//! Errors and diagnostics produced while building collection hierarchies.
//!
//! Structural failures ([`HierarchyError`]) abort the hierarchy of one
//! library. Node-local problems never abort anything; they are collected in
//! [`Diagnostics`] and travel with the hierarchy.

use serde::Serialize;
use thiserror::Error;

/// A failure that makes a library's hierarchy unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// No parent-before-child order exists for these nodes.
    #[error("collection cycle in library '{library}' involving {} node(s): {}", .ids.len(), .ids.join(", "))]
    Cycle { library: String, ids: Vec<String> },

    /// Several nodes claim the same flattened path.
    #[error("ambiguous collection path '{path}' in library '{library}' claimed by: {}", .ids.join(", "))]
    AmbiguousPath {
        library: String,
        path: String,
        ids: Vec<String>,
    },
}

impl HierarchyError {
    /// Short machine-friendly label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            HierarchyError::Cycle { .. } => "cycle",
            HierarchyError::AmbiguousPath { .. } => "ambiguous_path",
        }
    }
}

/// Why a raw node was dropped before tree assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyId,
    EmptyTitle,
    DuplicateId,
    /// The node's hint does not belong to the requested source kind.
    HintMismatch,
    /// Empty path or a path with an empty segment.
    MalformedPath,
}

/// A raw node that failed to parse and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNode {
    pub id: String,
    pub reason: SkipReason,
}

/// A node whose parent could not be found; it was placed as a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingParent {
    pub id: String,
    /// The unresolvable reference: parent id, parent path, the id of a
    /// skipped enclosing node, or empty for nesting-mode nodes without one.
    pub parent: String,
}

/// A node whose parent edge was replaced by the secondary path source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentConflict {
    pub id: String,
    pub primary_parent: Option<String>,
    pub secondary_parent: Option<String>,
    /// `false` when the secondary parent was rejected because adopting it
    /// would have created a cycle.
    pub applied: bool,
}

/// Node-level findings accumulated while building and reconciling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub skipped: Vec<SkippedNode>,
    pub missing_parents: Vec<MissingParent>,
    /// Ids that had no secondary path and fell back to shallow placement.
    pub unresolved: Vec<String>,
    pub parent_conflicts: Vec<ParentConflict>,
    /// Secondary path-map ids with no counterpart in the primary tree.
    pub secondary_only: Vec<String>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
            && self.missing_parents.is_empty()
            && self.unresolved.is_empty()
            && self.parent_conflicts.is_empty()
            && self.secondary_only.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_ids() {
        let err = HierarchyError::Cycle {
            library: "Search".to_string(),
            ids: vec!["A".to_string(), "B".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Search"));
        assert!(msg.contains("2 node(s)"));
        assert!(msg.contains("A, B"));
        assert_eq!(err.kind(), "cycle");
    }

    #[test]
    fn test_default_diagnostics_clean() {
        assert!(Diagnostics::default().is_clean());
    }
}
