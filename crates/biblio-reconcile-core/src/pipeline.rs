//! One reconciliation pass over two libraries.
//!
//! Stages run in order: build each library's hierarchy (reconciling it with
//! its secondary path map when one is supplied), compute the title overlap
//! over both record sets, aggregate per-collection statistics for every
//! library whose hierarchy is usable, then rank gaps, index titles and count
//! document types. The collection overlap matrix is derived on demand from
//! the kept per-collection title sets.
//!
//! A structural failure in one library's hierarchy (cycle, ambiguous path)
//! only marks that library's statistics as unavailable. The overlap is
//! computed from records and never depends on hierarchies.

use crate::breakdown::{
    collection_overlap_matrix, type_distribution, MatrixOptions, OverlapMatrix, TypeCount,
};
use crate::error::{Diagnostics, HierarchyError};
use crate::gaps::rank_gaps;
use crate::hierarchy::{build, LibraryHierarchy, PathMap, RawNode, SourceKind};
use crate::models::{CollectionMembership, CollectionStat, LibraryItem, Record};
use crate::overlap::{compute_overlap, partition, OverlapSummary, Partition};
use crate::reconcile::reconcile;
use crate::stats::{
    collection_titles, group_titles, item_index, rolled_titles, sort_for_display,
    stats_from_groups, GroupedTitles,
};
use crate::titles::{title_collections, LibraryView, TitleCollections};

/// Everything known about one library before the pass.
#[derive(Debug, Clone)]
pub struct LibraryInput {
    pub name: String,
    pub source: SourceKind,
    pub nodes: Vec<RawNode>,
    /// Secondary `id -> path` map to reconcile the built tree against.
    pub secondary: Option<PathMap>,
    pub records: Vec<Record>,
    pub items: Vec<LibraryItem>,
    pub memberships: Vec<CollectionMembership>,
}

impl LibraryInput {
    pub fn new(name: &str, source: SourceKind) -> Self {
        Self {
            name: name.to_string(),
            source,
            nodes: Vec::new(),
            secondary: None,
            records: Vec::new(),
            items: Vec::new(),
            memberships: Vec::new(),
        }
    }
}

/// Tuning for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Minimum titles for a collection to be ranked as a gap.
    pub min_items: usize,
    /// Fold descendant titles into ancestors before reporting.
    pub roll_up: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_items: 5,
            roll_up: false,
        }
    }
}

/// Outcome of the pass for one library.
#[derive(Debug, Clone)]
pub struct LibraryReport {
    pub library: String,
    pub hierarchy: Result<LibraryHierarchy, HierarchyError>,
    /// `None` when the hierarchy could not be built.
    pub stats: Option<Vec<CollectionStat>>,
    /// Distinct titles behind each stat row; `None` alongside `stats`.
    pub collection_titles: Option<GroupedTitles>,
    pub record_count: usize,
    pub items: Vec<LibraryItem>,
    pub memberships: Vec<CollectionMembership>,
}

impl LibraryReport {
    pub fn is_available(&self) -> bool {
        self.hierarchy.is_ok()
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.hierarchy.as_ref().ok().map(LibraryHierarchy::diagnostics)
    }
}

/// Result of a full pass.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub overlap: OverlapSummary,
    /// Records of both libraries, left first.
    pub records: Vec<Record>,
    /// Left library, then right library.
    pub libraries: Vec<LibraryReport>,
    /// Stats of all available libraries, sorted by library then path.
    pub stats: Vec<CollectionStat>,
    pub gaps: Vec<CollectionStat>,
    pub titles: Vec<TitleCollections>,
    /// Records per library and document type.
    pub types: Vec<TypeCount>,
    pub options: AnalysisOptions,
}

impl Analysis {
    pub fn library(&self, name: &str) -> Option<&LibraryReport> {
        self.libraries.iter().find(|l| l.library == name)
    }

    /// Records split into left-only, right-only and overlap subsets.
    pub fn partition(&self) -> Partition<'_> {
        partition(&self.records, &self.overlap)
    }

    /// Left-library collections crossed with right-library collections.
    ///
    /// Uses the pass's `min_items`; `None` unless both hierarchies are
    /// available.
    pub fn overlap_matrix(&self, min_depth: usize, limit: usize) -> Option<OverlapMatrix> {
        let [left, right] = self.libraries.as_slice() else {
            return None;
        };
        let (Some(rows), Some(columns)) = (&left.collection_titles, &right.collection_titles)
        else {
            return None;
        };
        let options = MatrixOptions {
            min_items: self.options.min_items,
            min_depth,
            limit,
        };
        Some(collection_overlap_matrix(
            &left.library,
            rows,
            &right.library,
            columns,
            options,
        ))
    }
}

/// Build a library's hierarchy and reconcile it with its secondary map.
pub fn build_library(
    name: &str,
    source: SourceKind,
    nodes: Vec<RawNode>,
    secondary: Option<&PathMap>,
) -> Result<LibraryHierarchy, HierarchyError> {
    let built = build(name, nodes, source)?;
    Ok(match secondary {
        Some(map) => reconcile(built, map),
        None => built,
    })
}

/// Run the full pass over `left` and `right`.
pub fn analyze(left: LibraryInput, right: LibraryInput, options: AnalysisOptions) -> Analysis {
    let left_name = left.name.clone();
    let right_name = right.name.clone();

    let mut records = Vec::with_capacity(left.records.len() + right.records.len());
    let mut libraries = Vec::with_capacity(2);
    for input in [left, right] {
        let hierarchy = build_library(
            &input.name,
            input.source,
            input.nodes,
            input.secondary.as_ref(),
        );
        match &hierarchy {
            Ok(h) => tracing::info!(library = %input.name, collections = h.len(), "hierarchy built"),
            Err(e) => tracing::warn!(library = %input.name, error = %e, "hierarchy unavailable"),
        }
        libraries.push(LibraryReport {
            library: input.name,
            hierarchy,
            stats: None,
            collection_titles: None,
            record_count: input.records.len(),
            items: input.items,
            memberships: input.memberships,
        });
        records.extend(input.records);
    }

    // Both libraries are complete; overlap needs the two full record sets.
    let overlap = compute_overlap(&records, &left_name, &right_name);
    tracing::info!(
        left_only = overlap.left_only,
        right_only = overlap.right_only,
        overlap = overlap.overlap,
        "title overlap computed"
    );

    let mut stats = Vec::new();
    for report in &mut libraries {
        let Ok(hierarchy) = &report.hierarchy else {
            continue;
        };
        let index = item_index(&report.items);
        let sets = if options.roll_up {
            rolled_titles(hierarchy, &report.memberships, &index)
        } else {
            collection_titles(hierarchy, &report.memberships, &index)
        };
        let groups = group_titles(hierarchy, &sets);
        let rows = stats_from_groups(&report.library, &groups, &overlap.common_titles);
        stats.extend(rows.iter().cloned());
        report.stats = Some(rows);
        report.collection_titles = Some(groups);
    }
    sort_for_display(&mut stats);

    let gaps = rank_gaps(&stats, options.min_items);

    let views: Vec<LibraryView<'_>> = libraries
        .iter()
        .filter_map(|report| {
            report.hierarchy.as_ref().ok().map(|hierarchy| LibraryView {
                hierarchy,
                items: &report.items,
                memberships: &report.memberships,
            })
        })
        .collect();
    let titles = title_collections(&views, &records, &overlap);
    let types = type_distribution(&records);

    Analysis {
        overlap,
        records,
        libraries,
        stats,
        gaps,
        titles,
        types,
        options,
    }
}
