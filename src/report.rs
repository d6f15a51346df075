//! Human-readable reports printed to stdout.

use biblio_reconcile_core::hierarchy::{LibraryHierarchy, PathResolution};
use biblio_reconcile_core::models::CollectionStat;
use biblio_reconcile_core::pipeline::LibraryReport;

use crate::analyze::{ExtractSummary, Run, SecondarySource};

/// Gap rows shown by `bibrec analyze`.
const SUMMARY_GAPS: usize = 10;

/// Print the overlap summary, per-library status and the top gaps.
pub fn print_summary(run: &Run) {
    let overlap = &run.analysis.overlap;

    println!("Biblio Reconcile — Analysis");
    println!("===========================");
    println!();
    println!(
        "  {:<24} {:>8} {:>8}",
        "LIBRARY", "TITLES", "ONLY"
    );
    println!("  {}", "-".repeat(42));
    println!(
        "  {:<24} {:>8} {:>8}",
        overlap.left_library, overlap.left_total, overlap.left_only
    );
    println!(
        "  {:<24} {:>8} {:>8}",
        overlap.right_library, overlap.right_total, overlap.right_only
    );
    println!();
    println!("  Overlap:     {} titles", overlap.overlap);

    if !run.analysis.types.is_empty() {
        println!();
        println!("  Document types:");
        for t in &run.analysis.types {
            println!(
                "    {:<24} {:<28} {:>6}",
                truncate(&t.library, 24),
                truncate(&t.item_type, 28),
                t.count
            );
        }
    }

    for report in &run.analysis.libraries {
        println!();
        print_library_status(report, run.extraction(&report.library));
    }

    let gaps = run.reported_gaps();
    if !gaps.is_empty() {
        println!();
        println!(
            "  Top gaps (min {} items):",
            run.analysis.options.min_items
        );
        print_gap_table(gaps.into_iter().take(SUMMARY_GAPS));
    }
    println!();
}

fn print_library_status(report: &LibraryReport, extraction: Option<&ExtractSummary>) {
    println!("  {}:", report.library);
    if let Some(e) = extraction {
        println!(
            "    records: {}   items: {}   collections: {}   memberships: {}",
            e.records, e.items, e.collections, e.memberships
        );
        let skipped = e.skipped_collections + e.skipped_records + e.skipped_containers;
        if skipped > 0 {
            println!(
                "    skipped while reading: {} collection(s), {} record(s), {} website node(s)",
                e.skipped_collections, e.skipped_records, e.skipped_containers
            );
        }
        match e.secondary {
            SecondarySource::None => {}
            SecondarySource::Map | SecondarySource::Html => match &e.secondary_error {
                Some(err) => println!("    secondary hierarchy unusable: {}", err),
                None => println!("    secondary hierarchy: {} path(s)", e.secondary_paths),
            },
        }
    }

    match &report.hierarchy {
        Ok(h) => {
            let d = h.diagnostics();
            let stats = report.stats.as_ref().map_or(0, Vec::len);
            println!("    hierarchy: {} collection(s), {} with items", h.len(), stats);
            if !d.is_clean() {
                println!(
                    "    diagnostics: {} skipped, {} missing parent(s), {} unresolved, {} parent conflict(s), {} secondary-only",
                    d.skipped.len(),
                    d.missing_parents.len(),
                    d.unresolved.len(),
                    d.parent_conflicts.len(),
                    d.secondary_only.len()
                );
            }
        }
        Err(e) => {
            println!("    hierarchy: UNAVAILABLE ({})", e);
            println!("    collection statistics: unavailable");
        }
    }
}

/// Print a ranked gap table.
pub fn print_gap_table<'a>(gaps: impl IntoIterator<Item = &'a CollectionStat>) {
    println!(
        "  {:<12} {:<44} {:>6} {:>8} {:>8}",
        "LIBRARY", "COLLECTION", "ITEMS", "OVERLAP", "PCT"
    );
    println!("  {}", "-".repeat(82));
    for s in gaps {
        println!(
            "  {:<12} {:<44} {:>6} {:>8} {:>7.2}%",
            truncate(&s.library, 12),
            truncate(&s.collection_path, 44),
            s.total_items,
            s.overlap_items,
            s.overlap_percentage.unwrap_or(0.0)
        );
    }
}

/// Print one library's collection tree with per-collection stats.
pub fn print_tree(report: &LibraryReport) {
    let hierarchy = match &report.hierarchy {
        Ok(h) => h,
        Err(e) => {
            println!("{}: hierarchy unavailable ({})", report.library, e);
            return;
        }
    };

    println!("{} — {} collection(s)", hierarchy.library(), hierarchy.len());
    println!();
    for root in hierarchy.roots() {
        print_subtree(hierarchy, report.stats.as_deref().unwrap_or(&[]), &root.id, 0);
    }
}

fn print_subtree(hierarchy: &LibraryHierarchy, stats: &[CollectionStat], id: &str, indent: usize) {
    let Some(node) = hierarchy.get(id) else {
        return;
    };
    let path = node.path_string();
    let counts = stats
        .iter()
        .find(|s| s.collection_path == path && s.collection_title == node.title)
        .map(|s| format!("  [{} / {}]", s.overlap_items, s.total_items))
        .unwrap_or_default();
    let flag = match node.resolution {
        PathResolution::Derived | PathResolution::Secondary => "",
        PathResolution::Unresolved => "  (unresolved)",
    };
    println!(
        "{}{}  depth={}{}{}",
        "  ".repeat(indent),
        node.title,
        node.depth,
        counts,
        flag
    );
    for child in hierarchy.children(id) {
        print_subtree(hierarchy, stats, &child.id, indent + 1);
    }
}

/// Shorten `s` to at most `max` characters, marking the cut with `…`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}
