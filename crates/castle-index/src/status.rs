//! Index status detection.

use std::path::Path;

use castle_config::Config;

use crate::location::index_directory;

/// Status of an index directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// The index exists and can be searched.
    Ready,
    /// No index exists yet. Searches return nothing until indexing commits.
    Missing,
}

impl IndexStatus {
    /// Returns a human-readable description for display.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Missing => "missing",
        }
    }
}

/// Checks if an index exists at the given path.
pub fn index_exists(index_dir: &Path) -> bool {
    // meta.json is written by the first commit.
    index_dir.join("meta.json").exists()
}

/// Status of an index directory.
pub fn index_status(index_dir: &Path) -> IndexStatus {
    if index_exists(index_dir) {
        IndexStatus::Ready
    } else {
        IndexStatus::Missing
    }
}

/// Status of the workspace index for `config`.
pub fn detect_index_status(config: &Config) -> IndexStatus {
    index_directory(config).map_or(IndexStatus::Missing, |dir| index_status(&dir))
}

#[cfg(test)]
mod test {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn status_description() {
        assert_eq!(IndexStatus::Ready.description(), "ready");
        assert_eq!(IndexStatus::Missing.description(), "missing");
    }

    #[test]
    fn missing_until_meta_file_exists() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            config_root: Some(temp.path().to_path_buf()),
            ..Config::default()
        };
        assert_eq!(detect_index_status(&config), IndexStatus::Missing);

        let dir = temp.path().join(".castle/index");
        fs::create_dir_all(&dir).unwrap();
        assert_eq!(index_status(&dir), IndexStatus::Missing);

        fs::write(dir.join("meta.json"), "{}").unwrap();
        assert_eq!(detect_index_status(&config), IndexStatus::Ready);
    }
}
