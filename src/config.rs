use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub libraries: Vec<LibraryConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_min_items")]
    pub min_items: usize,
    #[serde(default)]
    pub roll_up: bool,
    /// Stats shallower than this depth are left out of reports and exports.
    #[serde(default)]
    pub min_depth: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_items: default_min_items(),
            roll_up: false,
            min_depth: 0,
        }
    }
}

fn default_min_items() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

/// One library: its RDF export plus optional auxiliary sources.
#[derive(Debug, Deserialize, Clone)]
pub struct LibraryConfig {
    pub name: String,
    pub rdf: PathBuf,
    /// Deduplicated EndNote-style XML export. Without it, RDF items are the records.
    #[serde(default)]
    pub records: Option<PathBuf>,
    /// JSON object `collection id -> "A/B/C"`.
    #[serde(default)]
    pub hierarchy_map: Option<PathBuf>,
    /// Collection-tree HTML saved from the library website.
    #[serde(default)]
    pub hierarchy_html: Option<PathBuf>,
}

impl Config {
    /// The configured library with `name`.
    pub fn library(&self, name: &str) -> Option<&LibraryConfig> {
        self.libraries.iter().find(|l| l.name == name)
    }

    /// Resolve every relative input path against `base`.
    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for lib in &mut self.libraries {
            join(&mut lib.rdf);
            if let Some(p) = lib.records.as_mut() {
                join(p);
            }
            if let Some(p) = lib.hierarchy_map.as_mut() {
                join(p);
            }
            if let Some(p) = lib.hierarchy_html.as_mut() {
                join(p);
            }
        }
    }
}

/// Lower-case a library name for use in export keys such as `portal_only`.
pub fn key_prefix(library: &str) -> String {
    library
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    // Library inputs are relative to the config file, not the working directory.
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.libraries.len() != 2 {
        anyhow::bail!(
            "exactly two [[libraries]] entries are required, found {}",
            config.libraries.len()
        );
    }

    let mut names = HashSet::new();
    let mut keys: HashMap<String, &str> = HashMap::new();
    for lib in &config.libraries {
        if lib.name.trim().is_empty() {
            anyhow::bail!("libraries.name must not be empty");
        }
        if !names.insert(lib.name.as_str()) {
            anyhow::bail!("duplicate library name: '{}'", lib.name);
        }
        let key = key_prefix(&lib.name);
        if key == "common" {
            anyhow::bail!(
                "library name '{}' clashes with the common_total export key",
                lib.name
            );
        }
        if let Some(other) = keys.insert(key.clone(), lib.name.as_str()) {
            anyhow::bail!(
                "library names '{}' and '{}' both export as '{}_*'",
                other,
                lib.name,
                key
            );
        }
        if lib.hierarchy_map.is_some() && lib.hierarchy_html.is_some() {
            anyhow::bail!(
                "library '{}': hierarchy_map and hierarchy_html are mutually exclusive",
                lib.name
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("bibrec.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    const TWO_LIBRARIES: &str = r#"
[[libraries]]
name = "Portal"
rdf = "portal/Portal.rdf"
records = "portal/dedup.xml"
hierarchy_html = "website_hierarchy.html"

[[libraries]]
name = "Search"
rdf = "/data/Search.rdf"
"#;

    #[test]
    fn test_defaults_and_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, TWO_LIBRARIES);
        let config = load_config(&path).unwrap();

        assert_eq!(config.analysis.min_items, 5);
        assert!(!config.analysis.roll_up);
        assert_eq!(config.analysis.min_depth, 0);
        assert_eq!(config.output.dir, PathBuf::from("./output"));

        let portal = config.library("Portal").unwrap();
        assert_eq!(portal.rdf, dir.path().join("portal/Portal.rdf"));
        assert_eq!(
            portal.hierarchy_html.as_deref(),
            Some(dir.path().join("website_hierarchy.html").as_path())
        );
        let search = config.library("Search").unwrap();
        assert_eq!(search.rdf, PathBuf::from("/data/Search.rdf"));
        assert!(search.records.is_none());
    }

    #[test]
    fn test_analysis_section_overrides() {
        let dir = TempDir::new().unwrap();
        let body = format!(
            "[analysis]\nmin_items = 2\nroll_up = true\nmin_depth = 1\n{}",
            TWO_LIBRARIES
        );
        let config = load_config(&write_config(&dir, &body)).unwrap();
        assert_eq!(config.analysis.min_items, 2);
        assert!(config.analysis.roll_up);
        assert_eq!(config.analysis.min_depth, 1);
    }

    #[test]
    fn test_rejects_single_library() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[[libraries]]\nname = \"Portal\"\nrdf = \"a.rdf\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("exactly two"));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[[libraries]]\nname = \"A\"\nrdf = \"a.rdf\"\n[[libraries]]\nname = \"A\"\nrdf = \"b.rdf\"\n",
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_rejects_names_with_same_export_key() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[[libraries]]\nname = \"Portal\"\nrdf = \"a.rdf\"\n[[libraries]]\nname = \"portal\"\nrdf = \"b.rdf\"\n",
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("both export as 'portal_*'"));

        let path = write_config(
            &dir,
            "[[libraries]]\nname = \"Saturation Search\"\nrdf = \"a.rdf\"\n[[libraries]]\nname = \"saturation  search\"\nrdf = \"b.rdf\"\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_name_clashing_with_common_key() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[[libraries]]\nname = \"Common\"\nrdf = \"a.rdf\"\n[[libraries]]\nname = \"Search\"\nrdf = \"b.rdf\"\n",
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("common_total"));
    }

    #[test]
    fn test_key_prefix() {
        assert_eq!(key_prefix("Portal"), "portal");
        assert_eq!(key_prefix("Saturation  Search"), "saturation_search");
    }

    #[test]
    fn test_rejects_both_hierarchy_sources() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "[[libraries]]\nname = \"A\"\nrdf = \"a.rdf\"\nhierarchy_map = \"m.json\"\nhierarchy_html = \"t.html\"\n\
             [[libraries]]\nname = \"B\"\nrdf = \"b.rdf\"\n",
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/bibrec.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bibrec.toml"));
    }
}
