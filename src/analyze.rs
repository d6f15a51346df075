//! Analysis orchestration.
//!
//! Reads every configured library (RDF export, optional record export,
//! optional secondary hierarchy), hands the result to the core pipeline and
//! keeps the extraction counts alongside the analysis for reporting.

use anyhow::{Context, Result};
use biblio_reconcile_core::breakdown::{OverlapMatrix, MATRIX_COLLECTIONS};
use biblio_reconcile_core::hierarchy::{PathMap, SourceKind};
use biblio_reconcile_core::models::CollectionStat;
use biblio_reconcile_core::pipeline::{analyze, Analysis, AnalysisOptions, LibraryInput};
use biblio_reconcile_core::reconcile::parse_path_map;
use serde::Serialize;

use crate::config::{Config, LibraryConfig};
use crate::extract::read_input;
use crate::rdf::parse_rdf;
use crate::records::parse_records;
use crate::website::{parse_website, path_map};

/// Where a library's secondary hierarchy came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondarySource {
    None,
    Map,
    Html,
}

/// Counts gathered while reading one library's inputs.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractSummary {
    pub library: String,
    pub items: usize,
    pub records: usize,
    pub collections: usize,
    pub memberships: usize,
    pub skipped_collections: usize,
    pub skipped_records: usize,
    pub skipped_containers: usize,
    pub secondary: SecondarySource,
    pub secondary_paths: usize,
    /// Why a configured secondary hierarchy could not be used.
    pub secondary_error: Option<String>,
}

/// An analysis plus how its inputs were read.
#[derive(Debug)]
pub struct Run {
    pub analysis: Analysis,
    pub extraction: Vec<ExtractSummary>,
    pub min_depth: usize,
}

impl Run {
    /// Stats rows that pass the configured depth filter.
    pub fn reported_stats(&self) -> Vec<&CollectionStat> {
        at_min_depth(&self.analysis.stats, self.min_depth)
    }

    /// Gap rows that pass the configured depth filter.
    pub fn reported_gaps(&self) -> Vec<&CollectionStat> {
        at_min_depth(&self.analysis.gaps, self.min_depth)
    }

    /// Collection overlap matrix over collections that pass the depth filter.
    pub fn reported_matrix(&self) -> Option<OverlapMatrix> {
        self.analysis.overlap_matrix(self.min_depth, MATRIX_COLLECTIONS)
    }

    pub fn extraction(&self, library: &str) -> Option<&ExtractSummary> {
        self.extraction.iter().find(|e| e.library == library)
    }
}

pub fn at_min_depth(stats: &[CollectionStat], min_depth: usize) -> Vec<&CollectionStat> {
    stats
        .iter()
        .filter(|s| s.collection_depth >= min_depth)
        .collect()
}

/// Read both libraries and run the full analysis.
pub fn run_analysis(config: &Config, min_items: Option<usize>) -> Result<Run> {
    let options = AnalysisOptions {
        min_items: min_items.unwrap_or(config.analysis.min_items),
        roll_up: config.analysis.roll_up,
    };

    let mut inputs = Vec::with_capacity(2);
    let mut extraction = Vec::with_capacity(2);
    for lib in &config.libraries {
        let (input, summary) = load_library(lib)?;
        inputs.push(input);
        extraction.push(summary);
    }

    let mut inputs = inputs.into_iter();
    let (Some(left), Some(right)) = (inputs.next(), inputs.next()) else {
        anyhow::bail!("exactly two libraries are required");
    };

    let analysis = analyze(left, right, options);
    tracing::info!(
        stats = analysis.stats.len(),
        gaps = analysis.gaps.len(),
        titles = analysis.titles.len(),
        "analysis complete"
    );

    Ok(Run {
        analysis,
        extraction,
        min_depth: config.analysis.min_depth,
    })
}

/// Read one library's inputs into pipeline form.
pub fn load_library(lib: &LibraryConfig) -> Result<(LibraryInput, ExtractSummary)> {
    let bytes = read_input(&lib.rdf)?;
    let rdf = parse_rdf(&bytes, &lib.name)
        .with_context(|| format!("Failed to parse RDF export: {}", lib.rdf.display()))?;

    let mut summary = ExtractSummary {
        library: lib.name.clone(),
        items: rdf.items.len(),
        records: 0,
        collections: rdf.nodes.len(),
        memberships: rdf.memberships.len(),
        skipped_collections: rdf.skipped_collections,
        skipped_records: 0,
        skipped_containers: 0,
        secondary: SecondarySource::None,
        secondary_paths: 0,
        secondary_error: None,
    };

    let records = match &lib.records {
        Some(path) => {
            let bytes = read_input(path)?;
            let set = parse_records(&bytes, &lib.name)
                .with_context(|| format!("Failed to parse record export: {}", path.display()))?;
            summary.skipped_records = set.skipped;
            set.records
        }
        None => rdf.records,
    };
    summary.records = records.len();

    let secondary = load_secondary(lib, &mut summary)?;
    summary.secondary_paths = secondary.as_ref().map_or(0, PathMap::len);

    tracing::info!(
        library = %lib.name,
        items = summary.items,
        records = summary.records,
        collections = summary.collections,
        secondary = ?summary.secondary,
        "library loaded"
    );

    let mut input = LibraryInput::new(&lib.name, SourceKind::Relation);
    input.nodes = rdf.nodes;
    input.secondary = secondary;
    input.records = records;
    input.items = rdf.items;
    input.memberships = rdf.memberships;
    Ok((input, summary))
}

fn load_secondary(lib: &LibraryConfig, summary: &mut ExtractSummary) -> Result<Option<PathMap>> {
    if let Some(path) = &lib.hierarchy_map {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read hierarchy map: {}", path.display()))?;
        let map = parse_path_map(&content)
            .with_context(|| format!("Failed to parse hierarchy map: {}", path.display()))?;
        summary.secondary = SecondarySource::Map;
        return Ok(Some(map));
    }

    let Some(path) = &lib.hierarchy_html else {
        return Ok(None);
    };
    let bytes = read_input(path)?;
    let tree = parse_website(&bytes)
        .with_context(|| format!("Failed to parse hierarchy HTML: {}", path.display()))?;
    summary.skipped_containers = tree.skipped;
    summary.secondary = SecondarySource::Html;

    // A broken website tree only costs the secondary placement.
    match path_map(&lib.name, tree) {
        Ok(map) => Ok(Some(map)),
        Err(e) => {
            tracing::warn!(library = %lib.name, error = %e, "website hierarchy unusable");
            summary.secondary_error = Some(e.to_string());
            Ok(None)
        }
    }
}
