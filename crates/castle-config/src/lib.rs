//! Configuration system for castle.
//!
//! castle uses a TOML configuration file named `.castle.toml`. The nearest file found by
//! walking up from the working directory wins; its directory becomes the config root, which
//! anchors relative project paths and the default index location.

#![warn(missing_docs)]

mod discovery;
mod error;
mod parse;
mod rules;
mod templates;
mod version;

use std::path::{Path, PathBuf};

pub use discovery::{CONFIG_FILENAME, discover_config_file};
pub use error::ConfigError;
pub use parse::{
    RawConfig, RawFilenamePattern, RawIndexer, RawLineType, RawProject, RawSearcher,
    parse_config_file, parse_config_str,
};
use regex::Regex;
pub use rules::{
    FilenamePattern, IndexerRules, LineCondition, LineTypeRule, default_line_types,
    extension_pattern,
};
use serde::{Deserialize, Serialize};
pub use templates::{starter_template, write_starter_config};
pub use version::{rebuild_version, resolve_document_version};

/// Name of the built-in searcher over the workspace index.
pub const WORKSPACE_SEARCHER: &str = "Workspace";

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// General settings.
    pub settings: Settings,
    /// Search-related settings.
    pub search: SearchSettings,
    /// Tracked projects with absolute roots.
    pub projects: Vec<Project>,
    /// Compiled indexers; never empty.
    pub indexers: Vec<IndexerRules>,
    /// Configured searchers, excluding the built-in workspace searcher.
    pub searchers: Vec<SearcherEntry>,
    /// Directory containing the config file, when one was found.
    pub config_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            search: SearchSettings::default(),
            projects: Vec::new(),
            indexers: vec![IndexerRules::default_java()],
            searchers: Vec::new(),
            config_root: None,
        }
    }
}

impl Config {
    /// Loads the configuration nearest to `cwd`.
    ///
    /// Returns `Ok(Config::default())` if no configuration file is found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        match discover_config_file(cwd) {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads configuration, logging the error and using defaults if it cannot be read.
    pub fn load_or_default(cwd: &Path) -> Self {
        Self::load(cwd).unwrap_or_else(|e| {
            log::warn!("{e}; using default configuration");
            Self::default()
        })
    }

    /// Loads a specific configuration file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = parse_config_file(path)?;
        let root = path.parent().map(Path::to_path_buf);
        Ok(Self::from_raw(raw, root))
    }

    /// Resolves a parsed configuration against its root directory.
    pub fn from_raw(raw: RawConfig, config_root: Option<PathBuf>) -> Self {
        let base = config_root.clone().unwrap_or_default();
        let projects = raw
            .project
            .iter()
            .map(|p| Project {
                name: p.name.clone(),
                path: resolve_path(&base, &p.path),
            })
            .collect();

        let mut indexers: Vec<IndexerRules> = raw.indexer.iter().map(IndexerRules::compile).collect();
        if indexers.is_empty() {
            indexers.push(IndexerRules::default_java());
        }

        let searchers = raw
            .searcher
            .iter()
            .filter(|s| !s.name.is_empty() && !s.index_path.is_empty())
            .map(|s| SearcherEntry {
                name: s.name.clone(),
                index_path: Some(resolve_path(&base, &s.index_path)),
                hit_limit: s
                    .hit_limit
                    .and_then(|n| usize::try_from(n).ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(raw.settings.default_hit_limit),
            })
            .collect();

        let mut search = raw.search;
        search.synonyms_file = search.synonyms_file.map(|p| base.join(p));
        search.abbreviations_file = search.abbreviations_file.map(|p| base.join(p));

        Self {
            settings: raw.settings,
            search,
            projects,
            indexers,
            searchers,
            config_root,
        }
    }

    /// Projects to index.
    ///
    /// With no `[[project]]` entries, the config root itself is tracked under its directory name.
    pub fn tracked_projects(&self) -> Vec<Project> {
        if !self.projects.is_empty() {
            return self.projects.clone();
        }
        self.config_root
            .iter()
            .map(|root| Project {
                name: root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: root.clone(),
            })
            .collect()
    }

    /// Regex matched against full paths to decide whether a file is indexed.
    ///
    /// `None` means no extension is tracked and nothing is indexed.
    pub fn extension_regex(&self) -> Option<Regex> {
        extension_pattern(
            self.indexers
                .iter()
                .flat_map(|i| i.extensions.iter().map(String::as_str)),
        )
    }

    /// The indexer responsible for `extension`, if any.
    pub fn indexer_for(&self, extension: &str) -> Option<&IndexerRules> {
        self.indexers.iter().find(|i| i.handles(extension))
    }

    /// The document version stored in meta records.
    pub fn document_version(&self) -> i64 {
        resolve_document_version(&self.settings.document_version)
    }

    /// All searchers, the built-in workspace searcher first.
    pub fn searcher_registry(&self) -> Vec<SearcherEntry> {
        let mut entries = vec![SearcherEntry {
            name: WORKSPACE_SEARCHER.to_string(),
            index_path: None,
            hit_limit: self.settings.default_hit_limit,
        }];
        entries.extend(
            self.searchers
                .iter()
                .filter(|s| s.name != WORKSPACE_SEARCHER)
                .cloned(),
        );
        entries
    }

    /// Looks up a searcher by name, case-insensitively.
    pub fn searcher(&self, name: &str) -> Option<SearcherEntry> {
        self.searcher_registry()
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Serializes the effective settings to TOML format.
    pub fn settings_to_toml(&self) -> String {
        let serializable = SerializableSettings {
            settings: self.settings.clone(),
            search: self.search.clone(),
        };
        toml::to_string_pretty(&serializable).unwrap_or_default()
    }
}

/// Joins a relative path onto `base`; absolute paths pass through.
fn resolve_path(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// General settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Version string; changing it forces a full reindex.
    pub document_version: String,
    /// Files indexed between commits.
    pub index_group_count: usize,
    /// Files indexed between cancellation checks.
    pub cancel_check_count: usize,
    /// Files indexed before the first early commit.
    pub initially_read_count: usize,
    /// Default hits per page.
    pub default_hit_limit: usize,
    /// Hits counted exactly before the total becomes approximate.
    pub total_hits_threshold: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            document_version: String::from("0"),
            index_group_count: 100,
            cancel_check_count: 200,
            initially_read_count: 10,
            default_hit_limit: 10,
            total_hits_threshold: 1000,
        }
    }
}

impl Settings {
    /// Files per commit, at least one.
    pub fn group_count(&self) -> usize {
        self.index_group_count.max(1)
    }

    /// Files between cancellation checks, at least one.
    pub fn cancel_check(&self) -> usize {
        self.cancel_check_count.max(1)
    }

    /// The early commit point, never past the first group.
    pub fn initially_read(&self) -> usize {
        self.initially_read_count.min(self.group_count())
    }
}

/// Boolean operator joining adjacent query clauses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Any clause may match.
    #[default]
    Or,
    /// Every clause must match.
    And,
}

/// Search-related settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Solr-format synonym file, matched case-insensitively.
    pub synonyms_file: Option<PathBuf>,
    /// Solr-format abbreviation file, matched case-sensitively.
    pub abbreviations_file: Option<PathBuf>,
    /// Operator between clauses without an explicit one.
    pub default_operator: Operator,
    /// Whether unfielded terms also match comment text.
    pub include_comments: bool,
}

/// A tracked project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Project name.
    pub name: String,
    /// Absolute root directory.
    pub path: PathBuf,
}

/// A named search target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearcherEntry {
    /// Display name.
    pub name: String,
    /// Index directory; `None` is the workspace index.
    pub index_path: Option<PathBuf>,
    /// Default hits per page.
    pub hit_limit: usize,
}

/// Settings as written back out as TOML.
#[derive(Serialize)]
struct SerializableSettings {
    /// General settings.
    settings: Settings,
    /// Search settings.
    search: SearchSettings,
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn load_str(contents: &str) -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, contents).unwrap();
        let config = Config::load_from_file(&path).unwrap();
        (dir, config)
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.document_version, "0");
        assert_eq!(settings.index_group_count, 100);
        assert_eq!(settings.cancel_check_count, 200);
        assert_eq!(settings.initially_read_count, 10);
        assert_eq!(settings.default_hit_limit, 10);
        assert_eq!(settings.total_hits_threshold, 1000);
    }

    #[test]
    fn initially_read_is_capped_by_group_count() {
        let settings = Settings {
            index_group_count: 5,
            initially_read_count: 10,
            ..Settings::default()
        };
        assert_eq!(settings.initially_read(), 5);
    }

    #[test]
    fn default_config_has_java_indexer() {
        let config = Config::default();
        assert!(config.indexer_for("java").is_some());
        assert!(config.indexer_for("xml").is_none());
        let re = config.extension_regex().unwrap();
        assert!(re.is_match("/a/B.java"));
    }

    #[test]
    fn load_without_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.config_root.is_none());
        assert!(config.tracked_projects().is_empty());
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let (dir, config) = load_str(
            r#"
[search]
synonyms_file = "syn.txt"
default_operator = "and"

[[project]]
name = "core"
path = "core"
"#,
        );
        assert_eq!(config.projects[0].path, dir.path().join("core"));
        assert_eq!(
            config.search.synonyms_file.as_deref(),
            Some(dir.path().join("syn.txt").as_path())
        );
        assert_eq!(config.search.default_operator, Operator::And);
    }

    #[test]
    fn root_is_tracked_when_no_projects() {
        let (dir, config) = load_str("");
        let projects = config.tracked_projects();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].path, dir.path());
    }

    #[test]
    fn searcher_registry_starts_with_workspace() {
        let (_dir, config) = load_str(
            r#"
[[searcher]]
name = "Archive"
index_path = "/tmp/archive-index"
hit_limit = 25

[[searcher]]
name = "Broken"
index_path = "/tmp/broken"
hit_limit = -4

[[searcher]]
name = ""
index_path = "/tmp/unnamed"
"#,
        );
        let registry = config.searcher_registry();
        let names: Vec<&str> = registry.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![WORKSPACE_SEARCHER, "Archive", "Broken"]);
        assert_eq!(registry[0].index_path, None);
        assert_eq!(registry[1].hit_limit, 25);
        assert_eq!(registry[2].hit_limit, 10);
        assert_eq!(config.searcher("archive").unwrap().hit_limit, 25);
    }

    #[test]
    fn configured_indexers_replace_default() {
        let (_dir, config) = load_str(
            r#"
[[indexer]]
ext = ["sql", "xml"]
"#,
        );
        assert!(config.indexer_for("java").is_none());
        assert!(config.indexer_for("sql").is_some());
        let re = config.extension_regex().unwrap();
        assert!(re.is_match("schema.sql"));
        assert!(!re.is_match("Main.java"));
    }

    #[test]
    fn load_or_default_survives_bad_toml() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "[settings").unwrap();
        let config = Config::load_or_default(dir.path());
        assert!(config.config_root.is_none());
    }

    #[test]
    fn settings_serialize_to_toml() {
        let toml = Config::default().settings_to_toml();
        assert!(toml.contains("index_group_count = 100"));
        assert!(toml.contains("default_operator = \"or\""));
    }
}
