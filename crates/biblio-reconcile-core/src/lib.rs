//! # Biblio Reconcile Core
//!
//! Pure reconciliation logic for Biblio Reconcile: title normalization,
//! collection hierarchy construction, dual-source reconciliation, overlap
//! detection, per-collection statistics and gap ranking.
//!
//! This crate performs no filesystem I/O and owns no file formats. Callers
//! hand it flat node lists, records and membership rows; it hands back
//! plain values that the application layer prints or serializes.
//!
//! ## Pipeline
//!
//! ```text
//! RawNode[] ──build──▶ LibraryHierarchy ──reconcile(PathMap)──▶ LibraryHierarchy
//!                                                                 │
//! Record[] ──compute_overlap──▶ OverlapSummary ──common titles──▶ aggregate / roll_up
//!                                                                 │
//!                                                                 ▼
//!                                                    CollectionStat[] ──rank_gaps──▶ gaps
//!
//! Record[] ──type_distribution──▶ TypeCount[]
//! grouped titles × grouped titles ──collection_overlap_matrix──▶ OverlapMatrix
//! ```

pub mod breakdown;
pub mod error;
pub mod gaps;
pub mod hierarchy;
pub mod models;
pub mod normalize;
pub mod overlap;
pub mod pipeline;
pub mod reconcile;
pub mod stats;
pub mod titles;
