//! Configuration file discovery.
//!
//! Finds the nearest `.castle.toml` by walking up the directory tree from a starting point.

use std::path::{Path, PathBuf};

/// The configuration filename.
pub const CONFIG_FILENAME: &str = ".castle.toml";

/// Returns the configuration file closest to `cwd`, if any.
///
/// Walks from `cwd` up to the filesystem root and stops at the first `.castle.toml`.
pub fn discover_config_file(cwd: &Path) -> Option<PathBuf> {
    let mut current = Some(cwd);
    while let Some(dir) = current {
        let config_path = dir.join(CONFIG_FILENAME);
        if config_path.is_file() {
            return Some(config_path);
        }
        current = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn finds_config_in_cwd() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join(CONFIG_FILENAME);
        fs::write(&config, "").unwrap();

        assert_eq!(discover_config_file(dir.path()), Some(config));
    }

    #[test]
    fn walks_up_to_parent() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join(CONFIG_FILENAME);
        fs::write(&config, "").unwrap();
        let nested = dir.path().join("src/main/java");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover_config_file(&nested), Some(config));
    }

    #[test]
    fn nearest_config_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();
        let child = dir.path().join("child");
        fs::create_dir_all(&child).unwrap();
        let inner = child.join(CONFIG_FILENAME);
        fs::write(&inner, "").unwrap();

        assert_eq!(discover_config_file(&child), Some(inner));
    }

    #[test]
    fn directory_named_like_config_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_FILENAME)).unwrap();

        let found = discover_config_file(dir.path());
        assert!(found.is_none_or(|p| p != dir.path().join(CONFIG_FILENAME)));
    }
}
