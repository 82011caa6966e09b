//! Index location resolution.
//!
//! The workspace index lives in `.castle/index/` beside the nearest `.castle.toml`, or in
//! the per-user data directory when no config file was found. Configured searchers name
//! their own index directories.

use std::path::PathBuf;

use castle_config::{Config, SearcherEntry};
use directories::BaseDirs;

/// Directory for castle data, sibling to `.castle.toml`.
const CASTLE_DIR: &str = ".castle";
/// Subdirectory for the index.
const INDEX_DIR: &str = "index";
/// Application directory inside the user data directory.
const APP_DIR: &str = "castle";
/// Index directory name inside the user data directory.
const WORKSPACE_INDEX_DIR: &str = "WorkspaceIndex";

/// The workspace index directory for `config`.
///
/// Returns `None` only when there is no config file and no user data directory.
pub fn index_directory(config: &Config) -> Option<PathBuf> {
    match &config.config_root {
        Some(root) => Some(root.join(CASTLE_DIR).join(INDEX_DIR)),
        None => user_index_directory(),
    }
}

/// The workspace index directory in the per-user data directory.
pub fn user_index_directory() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| {
        dirs.data_local_dir()
            .join(APP_DIR)
            .join(WORKSPACE_INDEX_DIR)
    })
}

/// The index directory a searcher reads from.
///
/// Entries without an explicit directory read the workspace index.
pub fn searcher_directory(config: &Config, entry: &SearcherEntry) -> Option<PathBuf> {
    entry
        .index_path
        .clone()
        .or_else(|| index_directory(config))
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::*;

    #[test]
    fn index_beside_config_file() {
        let config = Config {
            config_root: Some(PathBuf::from("/work/repo")),
            ..Config::default()
        };
        assert_eq!(
            index_directory(&config),
            Some(PathBuf::from("/work/repo/.castle/index"))
        );
    }

    #[test]
    fn user_directory_without_config() {
        let config = Config::default();
        if let Some(dir) = index_directory(&config) {
            assert!(dir.ends_with(Path::new("castle/WorkspaceIndex")));
        }
    }

    #[test]
    fn searcher_directory_prefers_entry_path() {
        let config = Config {
            config_root: Some(PathBuf::from("/work/repo")),
            ..Config::default()
        };
        let entry = SearcherEntry {
            name: "Legacy".to_string(),
            index_path: Some(PathBuf::from("/indexes/legacy")),
            hit_limit: 25,
        };
        assert_eq!(
            searcher_directory(&config, &entry),
            Some(PathBuf::from("/indexes/legacy"))
        );

        let workspace = config.searcher("workspace").unwrap();
        assert_eq!(
            searcher_directory(&config, &workspace),
            Some(PathBuf::from("/work/repo/.castle/index"))
        );
    }
}
