//! # Biblio Reconcile CLI (`bibrec`)
//!
//! Compares two bibliographic libraries: rebuilds each library's collection
//! hierarchy, detects titles present in both, and ranks the collections
//! where the libraries diverge most.
//!
//! ## Usage
//!
//! ```bash
//! bibrec --config ./config/bibrec.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bibrec analyze` | Run the full analysis, print a summary, write JSON exports |
//! | `bibrec gaps` | Print collections ranked by ascending overlap |
//! | `bibrec tree <library>` | Print a library's reconciled collection tree |
//! | `bibrec hierarchy <html>` | Convert collection-tree HTML into an `id -> path` map |
//!
//! Logs go to stderr; set `RUST_LOG` (e.g. `RUST_LOG=biblio_reconcile=debug`)
//! or pass `--verbose` for more detail.

mod analyze;
mod config;
mod export;
mod extract;
mod rdf;
mod records;
mod report;
mod website;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Biblio Reconcile CLI — compare two bibliographic libraries.
///
/// All commands except `hierarchy` read a TOML configuration naming the
/// two libraries. See `config/bibrec.example.toml`.
#[derive(Parser)]
#[command(
    name = "bibrec",
    about = "Biblio Reconcile — collection hierarchies, title overlap and coverage gaps across two libraries",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bibrec.toml")]
    config: PathBuf,

    /// Log pipeline progress to stderr (same as `RUST_LOG=info`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write JSON exports.
    ///
    /// Prints the overlap summary, per-library diagnostics and the top
    /// gaps, then writes every export into the output directory.
    Analyze {
        /// Output directory; overrides `[output].dir`.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print collections ranked by ascending overlap percentage.
    Gaps {
        /// Minimum distinct titles for a collection to be ranked;
        /// overrides `[analysis].min_items`.
        #[arg(long)]
        min_items: Option<usize>,

        /// Maximum number of rows to print.
        #[arg(long)]
        limit: Option<usize>,

        /// Only show collections of this library.
        #[arg(long)]
        library: Option<String>,
    },

    /// Print a library's reconciled collection tree.
    ///
    /// Each line shows the collection title, its depth and
    /// `[overlap / total]` when the collection holds items.
    Tree {
        /// Library name, as configured in `[[libraries]]`.
        library: String,
    },

    /// Convert collection-tree HTML into a JSON `id -> path` map.
    ///
    /// Does not need a configuration file. Writes to stdout unless
    /// `--output` is given.
    Hierarchy {
        /// Collection-tree HTML saved from the library website.
        html: PathBuf,

        /// Write the map to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    if let Commands::Hierarchy { html, output } = &cli.command {
        return run_hierarchy(html, output.as_deref());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Analyze { output } => {
            let run = analyze::run_analysis(&cfg, None)?;
            report::print_summary(&run);
            let dir = output.unwrap_or_else(|| cfg.output.dir.clone());
            export::write_exports(&run, &dir)?;
        }
        Commands::Gaps {
            min_items,
            limit,
            library,
        } => {
            if let Some(name) = &library {
                if cfg.library(name).is_none() {
                    anyhow::bail!("Unknown library: '{}'", name);
                }
            }
            let run = analyze::run_analysis(&cfg, min_items)?;
            let gaps: Vec<_> = run
                .reported_gaps()
                .into_iter()
                .filter(|g| library.as_ref().map_or(true, |l| &g.library == l))
                .take(limit.unwrap_or(usize::MAX))
                .collect();
            if gaps.is_empty() {
                println!("No collections with at least {} items.", run.analysis.options.min_items);
            } else {
                report::print_gap_table(gaps);
            }
        }
        Commands::Tree { library } => {
            if cfg.library(&library).is_none() {
                anyhow::bail!("Unknown library: '{}'", library);
            }
            let run = analyze::run_analysis(&cfg, None)?;
            if let Some(report) = run.analysis.library(&library) {
                report::print_tree(report);
            }
        }
        Commands::Hierarchy { .. } => {
            // Handled above (before config loading)
        }
    }

    Ok(())
}

fn run_hierarchy(html: &std::path::Path, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let bytes = extract::read_input(html)?;
    let tree = website::parse_website(&bytes)
        .with_context(|| format!("Failed to parse hierarchy HTML: {}", html.display()))?;
    let map = website::path_map("website", tree)?;
    let json = serde_json::to_string_pretty(&map)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!("Exported {} collection paths to {}", map.len(), path.display());
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}
