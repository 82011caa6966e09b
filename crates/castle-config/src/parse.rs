//! Configuration file parsing.
//!
//! Parses a `.castle.toml` file into a `RawConfig` that mirrors the TOML schema. Rule lists
//! stay uncompiled here; see `rules` for the compiled forms.

use std::{fs, path::Path};

use serde::Deserialize;
use serde_with::{OneOrMany, serde_as};

use crate::{ConfigError, SearchSettings, Settings};

/// Raw configuration as parsed directly from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// General settings section.
    pub settings: Settings,
    /// Search settings section.
    pub search: SearchSettings,
    /// Tracked project roots.
    pub project: Vec<RawProject>,
    /// Per-extension indexer definitions.
    pub indexer: Vec<RawIndexer>,
    /// Additional named search targets.
    pub searcher: Vec<RawSearcher>,
}

/// A `[[project]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProject {
    /// Project name, stored with every line indexed from it.
    pub name: String,
    /// Root directory, relative to the config file unless absolute.
    pub path: String,
}

/// An `[[indexer]]` entry.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct RawIndexer {
    /// Extension(s) handled by this indexer, without the leading dot.
    #[serde_as(as = "OneOrMany<_>")]
    pub ext: Vec<String>,
    /// Regexes run against the file name to derive extra fields.
    #[serde(default)]
    pub filename_pattern: Vec<RawFilenamePattern>,
    /// Literal line-type rules, checked in order.
    #[serde(default)]
    pub line_type: Vec<RawLineType>,
}

/// A `[[indexer.filename_pattern]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFilenamePattern {
    /// Regex searched for in the file name.
    pub pattern: String,
    /// Field name template; `$0`, `$1`, ... expand to captures.
    pub field: String,
    /// Field value template.
    pub value: String,
}

/// A `[[indexer.line_type]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLineType {
    /// Label assigned to matching lines.
    #[serde(rename = "type")]
    pub label: String,
    /// `starts_with` or `is_equal`.
    pub condition: String,
    /// Literal compared against the trimmed line.
    pub text: String,
}

/// A `[[searcher]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSearcher {
    /// Display name.
    pub name: String,
    /// Index directory, relative to the config file unless absolute.
    pub index_path: String,
    /// Default number of hits per page.
    pub hit_limit: Option<i64>,
}

/// Parses a configuration file from disk.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}
