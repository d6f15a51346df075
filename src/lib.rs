//! # Biblio Reconcile
//!
//! Reconciles two independently maintained bibliographic libraries (Zotero
//! RDF exports, optional EndNote XML record exports, and the collection tree
//! of the library website) into one comparable model.
//!
//! The reconciliation engine lives in `biblio-reconcile-core`; this crate
//! supplies the file formats, configuration, reports and exports around it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────┐
//! │  Extractors  │──▶│ Core pipeline  │──▶│   Reports    │
//! │ RDF/XML/HTML │   │ build+reconcile│   │ stdout/JSON  │
//! └──────────────┘   │ overlap+stats  │   └──────────────┘
//!                    └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bibrec hierarchy website_hierarchy.html --output collection_mapping.json
//! bibrec analyze --output ./output
//! bibrec gaps --min-items 10 --limit 20
//! bibrec tree Portal
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | Shared markup extraction plumbing |
//! | [`rdf`] | Zotero RDF items, collections and memberships |
//! | [`records`] | EndNote XML record export |
//! | [`website`] | Collection-tree HTML → nesting nodes and path map |
//! | [`analyze`] | Reads both libraries and runs the core pipeline |
//! | [`report`] | Tables printed to stdout |
//! | [`export`] | JSON exports |

pub mod analyze;
pub mod config;
pub mod export;
pub mod extract;
pub mod rdf;
pub mod records;
pub mod report;
pub mod website;
