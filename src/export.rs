//! JSON exports of an analysis run.
//!
//! `bibrec analyze` writes one file per view into the output directory:
//!
//! | File | Content |
//! |------|---------|
//! | `analysis_results.json` | overlap summary keyed by library name |
//! | `collection_analysis.json` | per-collection stat rows |
//! | `gap_analysis.json` | gap-ranked stat rows |
//! | `matched_records.json` | records whose title is in both libraries |
//! | `title_collections.json` | collections each title is filed under |
//! | `website_hierarchy.json` | reconciled hierarchy rows per library |
//! | `document_types.json` | record counts per library and document type |
//! | `collection_overlap_matrix.json` | largest collections of one library crossed with the other's, `null` when a hierarchy is unavailable |
//! | `diagnostics.json` | per-library status, extraction and hierarchy diagnostics |

use anyhow::{Context, Result};
use biblio_reconcile_core::error::Diagnostics;
use biblio_reconcile_core::hierarchy::{LibraryHierarchy, PathResolution};
use biblio_reconcile_core::overlap::OverlapSummary;
use biblio_reconcile_core::titles::TitleCollections;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analyze::{ExtractSummary, Run};
use crate::config::key_prefix;

/// One collection of a reconciled hierarchy.
#[derive(Debug, Serialize, PartialEq)]
pub struct HierarchyRow {
    pub library: String,
    pub collection_id: String,
    pub title: String,
    pub path: String,
    pub depth: usize,
    pub parent_id: Option<String>,
    pub parent_path: Option<String>,
    pub resolution: PathResolution,
}

#[derive(Serialize)]
struct TitleRow<'a> {
    title: &'a str,
    normalized_title: &'a str,
    #[serde(flatten)]
    collections: BTreeMap<String, String>,
    is_overlap: bool,
}

#[derive(Serialize)]
struct DiagnosticsExport<'a> {
    generated_at: String,
    libraries: Vec<LibraryDiagnostics<'a>>,
}

#[derive(Serialize)]
struct LibraryDiagnostics<'a> {
    library: &'a str,
    status: &'static str,
    error: Option<ErrorDetail>,
    extraction: Option<&'a ExtractSummary>,
    hierarchy: Option<&'a Diagnostics>,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

/// Overlap summary with library-named keys, e.g. `portal_only`.
pub fn summary_json(summary: &OverlapSummary) -> Value {
    let left = key_prefix(&summary.left_library);
    let right = key_prefix(&summary.right_library);
    let mut map = Map::new();
    map.insert(format!("{}_only", left), summary.left_only.into());
    map.insert(format!("{}_only", right), summary.right_only.into());
    map.insert("overlap".to_string(), summary.overlap.into());
    map.insert(format!("{}_total", left), summary.left_total.into());
    map.insert(format!("{}_total", right), summary.right_total.into());
    map.insert("common_total".to_string(), summary.common_total().into());
    Value::Object(map)
}

/// Flatten a hierarchy into rows, in input order.
pub fn hierarchy_rows(hierarchy: &LibraryHierarchy) -> Vec<HierarchyRow> {
    hierarchy
        .iter()
        .map(|node| {
            let parent = hierarchy.parent(&node.id);
            HierarchyRow {
                library: hierarchy.library().to_string(),
                collection_id: node.id.clone(),
                title: node.title.clone(),
                path: node.path_string(),
                depth: node.depth,
                parent_id: node.parent_id.clone(),
                parent_path: parent.map(|p| p.path_string()),
                resolution: node.resolution,
            }
        })
        .collect()
}

fn title_rows<'a>(titles: &'a [TitleCollections], libraries: &[&str]) -> Vec<TitleRow<'a>> {
    titles
        .iter()
        .map(|t| TitleRow {
            title: &t.title,
            normalized_title: &t.normalized_title,
            collections: libraries
                .iter()
                .map(|lib| {
                    let paths = t.collections.get(*lib).map(|p| p.join("; "));
                    (
                        format!("{}_collections", key_prefix(lib)),
                        paths.unwrap_or_default(),
                    )
                })
                .collect(),
            is_overlap: t.is_overlap,
        })
        .collect()
}

fn diagnostics(run: &Run) -> DiagnosticsExport<'_> {
    let libraries = run
        .analysis
        .libraries
        .iter()
        .map(|report| {
            let (status, error, hierarchy) = match &report.hierarchy {
                Ok(h) => ("available", None, Some(h.diagnostics())),
                Err(e) => (
                    "unavailable",
                    Some(ErrorDetail {
                        kind: e.kind(),
                        message: e.to_string(),
                    }),
                    None,
                ),
            };
            LibraryDiagnostics {
                library: &report.library,
                status,
                error,
                extraction: run.extraction(&report.library),
                hierarchy,
            }
        })
        .collect();
    DiagnosticsExport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        libraries,
    }
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Write every export of `run` into `dir`, returning the written paths.
pub fn write_exports(run: &Run, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let analysis = &run.analysis;
    let libraries: Vec<&str> = analysis
        .libraries
        .iter()
        .map(|l| l.library.as_str())
        .collect();

    let hierarchy: Vec<HierarchyRow> = analysis
        .libraries
        .iter()
        .filter_map(|l| l.hierarchy.as_ref().ok())
        .flat_map(hierarchy_rows)
        .collect();

    let written = vec![
        write_json(dir, "analysis_results.json", &summary_json(&analysis.overlap))?,
        write_json(dir, "collection_analysis.json", &run.reported_stats())?,
        write_json(dir, "gap_analysis.json", &run.reported_gaps())?,
        write_json(dir, "matched_records.json", &analysis.partition().overlap)?,
        write_json(
            dir,
            "title_collections.json",
            &title_rows(&analysis.titles, &libraries),
        )?,
        write_json(dir, "website_hierarchy.json", &hierarchy)?,
        write_json(dir, "document_types.json", &analysis.types)?,
        write_json(
            dir,
            "collection_overlap_matrix.json",
            &run.reported_matrix(),
        )?,
        write_json(dir, "diagnostics.json", &diagnostics(run))?,
    ];

    eprintln!("Exported {} files to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_reconcile_core::hierarchy::{build, RawNode, SourceKind};
    use biblio_reconcile_core::models::Record;
    use biblio_reconcile_core::overlap::compute_overlap;

    #[test]
    fn test_summary_json_keys() {
        let records = vec![
            Record::new("Portal", "Salmon Habitat"),
            Record::new("Portal", "Water Quality"),
            Record::new("Saturation Search", "salmon habitat"),
        ];
        let summary = compute_overlap(&records, "Portal", "Saturation Search");
        let json = summary_json(&summary);
        assert_eq!(json["portal_only"], 1);
        assert_eq!(json["saturation_search_only"], 0);
        assert_eq!(json["overlap"], 1);
        assert_eq!(json["portal_total"], 2);
        assert_eq!(json["saturation_search_total"], 1);
        assert_eq!(json["common_total"], 1);
    }

    #[test]
    fn test_hierarchy_rows() {
        let h = build(
            "Portal",
            vec![
                RawNode::flattened("f", "Fish"),
                RawNode::flattened("s", "Fish/Salmon"),
            ],
            SourceKind::FlattenedPath,
        )
        .unwrap();
        let rows = hierarchy_rows(&h);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].parent_path, None);
        assert_eq!(rows[1].collection_id, "s");
        assert_eq!(rows[1].title, "Salmon");
        assert_eq!(rows[1].depth, 1);
        assert_eq!(rows[1].parent_id.as_deref(), Some("f"));
        assert_eq!(rows[1].parent_path.as_deref(), Some("Fish"));
    }
}
