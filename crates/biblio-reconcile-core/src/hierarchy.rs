//! Collection hierarchy construction.
//!
//! Collection trees arrive in three inconsistent encodings: a nesting level
//! per node in document order (the website tree), an explicit parent
//! reference per node (RDF `isPartOf` edges), or a full `A/B/C` path per node
//! (the flattened website mapping). All three are expressed as [`RawNode`]s
//! with a tagged [`NodeHint`] and assembled by one entry point, [`build`].
//!
//! # Algorithm
//!
//! 1. Drop malformed nodes (empty id or title, duplicate id, wrong hint kind,
//!    malformed path) and record each one in [`Diagnostics::skipped`].
//! 2. Resolve every node's parent id according to the source kind.
//!    Unresolvable parents make the node a root and are recorded in
//!    [`Diagnostics::missing_parents`].
//! 3. Derive the children index in one pass from the parent ids.
//! 4. Resolve paths top-down: roots first, breadth order, each child's path is
//!    its parent's path plus its own title.
//! 5. Nodes never reached from a root sit on (or below) a referential cycle;
//!    the build fails with [`HierarchyError::Cycle`].

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::{Diagnostics, HierarchyError, MissingParent, SkipReason, SkippedNode};

/// Separator used by flattened collection paths.
pub const PATH_SEPARATOR: char = '/';

/// `collection id -> "A/B/C"` mapping, as produced by the website parser.
pub type PathMap = BTreeMap<String, String>;

/// The encoding a raw node list was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Document order plus an `aria-level`-like nesting level.
    Nesting,
    /// Explicit parent references.
    Relation,
    /// Full slash-delimited paths.
    FlattenedPath,
}

/// Source-specific placement information carried by a [`RawNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeHint {
    /// Nesting level; `None` defaults to the shallowest observed level.
    Level(Option<i64>),
    /// Parent collection id; `None` for top-level collections.
    ParentRef(Option<String>),
    /// Full path from the root, `/`-delimited.
    Path(String),
}

impl NodeHint {
    pub fn kind(&self) -> SourceKind {
        match self {
            NodeHint::Level(_) => SourceKind::Nesting,
            NodeHint::ParentRef(_) => SourceKind::Relation,
            NodeHint::Path(_) => SourceKind::FlattenedPath,
        }
    }
}

/// A collection node as handed over by a document parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    pub id: String,
    pub title: String,
    pub hint: NodeHint,
}

impl RawNode {
    pub fn nested(id: &str, title: &str, level: Option<i64>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            hint: NodeHint::Level(level),
        }
    }

    pub fn related(id: &str, title: &str, parent: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            hint: NodeHint::ParentRef(parent.map(str::to_string)),
        }
    }

    /// A flattened-path node; its title is the last path segment.
    pub fn flattened(id: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            title: String::new(),
            hint: NodeHint::Path(path.to_string()),
        }
    }
}

/// How a node's `path`/`depth` were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathResolution {
    /// Resolved top-down from the node's own tree.
    Derived,
    /// Taken from a secondary path map during reconciliation.
    Secondary,
    /// No secondary path; placed at the root with `path = [title]`.
    Unresolved,
}

/// A collection in a canonical library hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionNode {
    pub id: String,
    pub title: String,
    pub parent_id: Option<String>,
    pub path: Vec<String>,
    pub depth: usize,
    pub resolution: PathResolution,
}

impl CollectionNode {
    /// The path joined for display, e.g. `"Fish/Salmon/Habitat"`.
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }
}

/// The canonical collection tree of one library.
///
/// Nodes are stored in a table keyed by id; `children` and `roots` are a
/// derived index, rebuilt whenever parent edges change.
#[derive(Debug, Clone)]
pub struct LibraryHierarchy {
    pub(crate) library: String,
    pub(crate) source: SourceKind,
    pub(crate) nodes: HashMap<String, CollectionNode>,
    /// Accepted ids in input order.
    pub(crate) order: Vec<String>,
    pub(crate) children: HashMap<String, Vec<String>>,
    pub(crate) roots: Vec<String>,
    pub(crate) diagnostics: Diagnostics,
}

impl LibraryHierarchy {
    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CollectionNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Nodes in input order.
    pub fn iter(&self) -> impl Iterator<Item = &CollectionNode> + '_ {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn roots(&self) -> impl Iterator<Item = &CollectionNode> + '_ {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn children(&self, id: &str) -> impl Iterator<Item = &CollectionNode> + '_ {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.nodes.get(child))
    }

    pub fn parent(&self, id: &str) -> Option<&CollectionNode> {
        self.nodes
            .get(id)
            .and_then(|n| n.parent_id.as_deref())
            .and_then(|p| self.nodes.get(p))
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<&CollectionNode> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            if !seen.insert(node.id.as_str()) {
                break;
            }
            out.push(node);
            current = self.parent(&node.id);
        }
        out
    }

    /// Ids in breadth-first order from the roots (parents before children).
    pub fn breadth_first(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut queue: VecDeque<&str> = self.roots.iter().map(String::as_str).collect();
        while let Some(id) = queue.pop_front() {
            out.push(id.to_string());
            if let Some(kids) = self.children.get(id) {
                queue.extend(kids.iter().map(String::as_str));
            }
        }
        out
    }

    /// `id -> "A/B/C"` for every node.
    pub fn path_map(&self) -> PathMap {
        self.nodes
            .values()
            .map(|n| (n.id.clone(), n.path_string()))
            .collect()
    }

    /// Describe every node violating the path/depth invariants.
    ///
    /// A freshly built hierarchy has none. After reconciliation, nodes
    /// placed by the secondary source may legitimately disagree with their
    /// parent edge; those show up here.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        for node in self.iter() {
            if node.path.is_empty() || node.depth + 1 != node.path.len() {
                out.push(format!(
                    "{}: depth {} does not match path length {}",
                    node.id,
                    node.depth,
                    node.path.len()
                ));
                continue;
            }
            match self.parent(&node.id) {
                None if node.depth != 0 => {
                    out.push(format!("{}: root at depth {}", node.id, node.depth));
                }
                Some(parent) => {
                    let mut expected = parent.path.clone();
                    expected.push(node.title.clone());
                    if node.path != expected {
                        out.push(format!(
                            "{}: path '{}' is not parent path '{}' + title",
                            node.id,
                            node.path_string(),
                            parent.path_string()
                        ));
                    }
                }
                None => {}
            }
        }
        out
    }

    /// Recompute `children` and `roots` from the nodes' parent ids.
    pub(crate) fn rebuild_index(&mut self) {
        self.children.clear();
        self.roots.clear();
        for id in &self.order {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            match &node.parent_id {
                Some(parent) => self
                    .children
                    .entry(parent.clone())
                    .or_default()
                    .push(id.clone()),
                None => self.roots.push(id.clone()),
            }
        }
    }
}

/// A node that survived validation, with its normalized placement hint.
struct Accepted {
    id: String,
    title: String,
    hint: NodeHint,
}

/// A skipped nesting-mode node. It keeps its level open so the nodes it
/// enclosed become reported roots instead of moving up a level.
struct Placeholder {
    /// Index of the first accepted node that follows it.
    before: usize,
    id: String,
    level: Option<i64>,
}

/// An open ancestor while walking a nesting-mode node list.
enum Open {
    Node(usize),
    Skipped(String),
}

/// Build the canonical hierarchy of one library from raw nodes.
///
/// Nodes whose hint does not match `kind` are skipped as malformed.
pub fn build(
    library: &str,
    nodes: Vec<RawNode>,
    kind: SourceKind,
) -> Result<LibraryHierarchy, HierarchyError> {
    let mut diagnostics = Diagnostics::default();
    let (accepted, placeholders) = accept_nodes(library, nodes, kind, &mut diagnostics);

    let parents = match kind {
        SourceKind::Nesting => nesting_parents(&accepted, &placeholders, &mut diagnostics),
        SourceKind::Relation => relation_parents(&accepted, &mut diagnostics),
        SourceKind::FlattenedPath => path_parents(library, &accepted, &mut diagnostics)?,
    };

    for missing in &diagnostics.missing_parents {
        tracing::warn!(
            library,
            id = %missing.id,
            parent = %missing.parent,
            "collection parent not found; placing at root"
        );
    }

    assemble(library, kind, accepted, parents, diagnostics)
}

fn accept_nodes(
    library: &str,
    nodes: Vec<RawNode>,
    kind: SourceKind,
    diagnostics: &mut Diagnostics,
) -> (Vec<Accepted>, Vec<Placeholder>) {
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(nodes.len());
    let mut placeholders = Vec::new();

    for raw in nodes {
        let id = raw.id.trim().to_string();
        let mut title = raw.title.trim().to_string();
        let mut hint = raw.hint;

        let reason = if id.is_empty() {
            Some(SkipReason::EmptyId)
        } else if hint.kind() != kind {
            Some(SkipReason::HintMismatch)
        } else {
            check_node(&id, &mut title, &mut hint, &seen)
        };

        match reason {
            Some(reason) => {
                tracing::warn!(library, id = %id, reason = ?reason, "skipping malformed collection node");
                if let (SourceKind::Nesting, NodeHint::Level(level)) = (kind, &hint) {
                    placeholders.push(Placeholder {
                        before: accepted.len(),
                        id: id.clone(),
                        level: *level,
                    });
                }
                diagnostics.skipped.push(SkippedNode { id, reason });
            }
            None => {
                seen.insert(id.clone());
                accepted.push(Accepted { id, title, hint });
            }
        }
    }
    (accepted, placeholders)
}

/// Normalize a flattened path in place (its last segment becomes the title)
/// and report why the node is unusable, if it is.
fn check_node(
    id: &str,
    title: &mut String,
    hint: &mut NodeHint,
    seen: &HashSet<String>,
) -> Option<SkipReason> {
    if let NodeHint::Path(path) = hint {
        let Some(segments) = split_path(path) else {
            return Some(SkipReason::MalformedPath);
        };
        if let Some(last) = segments.last() {
            *title = last.clone();
        }
        *path = segments.join("/");
    }
    if title.is_empty() {
        Some(SkipReason::EmptyTitle)
    } else if seen.contains(id) {
        Some(SkipReason::DuplicateId)
    } else {
        None
    }
}

/// Split a flattened path into trimmed segments; `None` if any is empty.
pub fn split_path(path: &str) -> Option<Vec<String>> {
    let segments: Vec<String> = path
        .split(PATH_SEPARATOR)
        .map(|s| s.trim().to_string())
        .collect();
    if segments.iter().any(String::is_empty) {
        None
    } else {
        Some(segments)
    }
}

fn nesting_parents(
    accepted: &[Accepted],
    placeholders: &[Placeholder],
    diagnostics: &mut Diagnostics,
) -> Vec<Option<String>> {
    let levels: Vec<Option<i64>> = accepted
        .iter()
        .map(|a| match a.hint {
            NodeHint::Level(level) => level,
            _ => None,
        })
        .collect();
    let min_level = levels
        .iter()
        .chain(placeholders.iter().map(|p| &p.level))
        .flatten()
        .copied()
        .min()
        .unwrap_or(0);

    // Currently open ancestors, shallowest first.
    let mut stack: Vec<(i64, Open)> = Vec::new();
    let mut pending = placeholders.iter().peekable();
    let mut parents = Vec::with_capacity(accepted.len());

    for (i, node) in accepted.iter().enumerate() {
        while let Some(skipped) = pending.next_if(|p| p.before == i) {
            let level = skipped.level.unwrap_or(min_level);
            close_to(&mut stack, level);
            stack.push((level, Open::Skipped(skipped.id.clone())));
        }

        let level = levels[i].unwrap_or(min_level);
        close_to(&mut stack, level);
        let parent = match stack.last() {
            Some((_, Open::Node(j))) => Some(accepted[*j].id.clone()),
            Some((_, Open::Skipped(skipped))) => {
                diagnostics.missing_parents.push(MissingParent {
                    id: node.id.clone(),
                    parent: skipped.clone(),
                });
                None
            }
            None => {
                if level > min_level {
                    diagnostics.missing_parents.push(MissingParent {
                        id: node.id.clone(),
                        parent: String::new(),
                    });
                }
                None
            }
        };
        parents.push(parent);
        stack.push((level, Open::Node(i)));
    }
    parents
}

/// Pop every open ancestor at `level` or deeper.
fn close_to(stack: &mut Vec<(i64, Open)>, level: i64) {
    while stack.last().is_some_and(|(open, _)| *open >= level) {
        stack.pop();
    }
}

fn relation_parents(accepted: &[Accepted], diagnostics: &mut Diagnostics) -> Vec<Option<String>> {
    let ids: HashSet<&str> = accepted.iter().map(|a| a.id.as_str()).collect();
    accepted
        .iter()
        .map(|node| {
            let reference = match &node.hint {
                NodeHint::ParentRef(Some(p)) if !p.trim().is_empty() => p.trim(),
                _ => return None,
            };
            if ids.contains(reference) {
                Some(reference.to_string())
            } else {
                diagnostics.missing_parents.push(MissingParent {
                    id: node.id.clone(),
                    parent: reference.to_string(),
                });
                None
            }
        })
        .collect()
}

fn path_parents(
    library: &str,
    accepted: &[Accepted],
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Option<String>>, HierarchyError> {
    let mut by_path: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for node in accepted {
        if let NodeHint::Path(path) = &node.hint {
            by_path.entry(path.as_str()).or_default().push(node.id.as_str());
        }
    }

    if let Some((path, ids)) = by_path.iter().find(|(_, ids)| ids.len() > 1) {
        let mut ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        ids.sort();
        return Err(HierarchyError::AmbiguousPath {
            library: library.to_string(),
            path: path.to_string(),
            ids,
        });
    }

    Ok(accepted
        .iter()
        .map(|node| {
            let NodeHint::Path(path) = &node.hint else {
                return None;
            };
            let (parent_path, _) = path.rsplit_once(PATH_SEPARATOR)?;
            match by_path.get(parent_path) {
                Some(ids) => ids.first().map(|id| id.to_string()),
                None => {
                    diagnostics.missing_parents.push(MissingParent {
                        id: node.id.clone(),
                        parent: parent_path.to_string(),
                    });
                    None
                }
            }
        })
        .collect())
}

fn assemble(
    library: &str,
    source: SourceKind,
    accepted: Vec<Accepted>,
    parents: Vec<Option<String>>,
    diagnostics: Diagnostics,
) -> Result<LibraryHierarchy, HierarchyError> {
    let mut hierarchy = LibraryHierarchy {
        library: library.to_string(),
        source,
        nodes: HashMap::with_capacity(accepted.len()),
        order: Vec::with_capacity(accepted.len()),
        children: HashMap::new(),
        roots: Vec::new(),
        diagnostics,
    };

    for (node, parent_id) in accepted.into_iter().zip(parents) {
        hierarchy.order.push(node.id.clone());
        hierarchy.nodes.insert(
            node.id.clone(),
            CollectionNode {
                id: node.id,
                title: node.title,
                parent_id,
                path: Vec::new(),
                depth: 0,
                resolution: PathResolution::Derived,
            },
        );
    }
    hierarchy.rebuild_index();

    let order = hierarchy.breadth_first();
    if order.len() < hierarchy.nodes.len() {
        let reached: HashSet<&str> = order.iter().map(String::as_str).collect();
        let mut ids: Vec<String> = hierarchy
            .order
            .iter()
            .filter(|id| !reached.contains(id.as_str()))
            .cloned()
            .collect();
        ids.sort();
        return Err(HierarchyError::Cycle {
            library: library.to_string(),
            ids,
        });
    }

    for id in &order {
        let parent_path = hierarchy
            .get(id)
            .and_then(|n| n.parent_id.as_deref())
            .and_then(|p| hierarchy.get(p))
            .map(|p| p.path.clone())
            .unwrap_or_default();
        if let Some(node) = hierarchy.nodes.get_mut(id) {
            let mut path = parent_path;
            path.push(node.title.clone());
            node.depth = path.len() - 1;
            node.path = path;
        }
    }

    Ok(hierarchy)
}
