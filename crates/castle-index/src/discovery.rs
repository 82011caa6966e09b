//! Source file discovery.
//!
//! Walks tracked project roots and keeps the files whose full path matches the extension
//! allow-list. Hidden directories such as `.git` and `.castle` are not entered.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use castle_config::Project;
use regex::Regex;
use walkdir::WalkDir;

/// A source file to index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Name of the project the file belongs to; may be empty.
    pub project: String,
    /// Absolute path.
    pub path: PathBuf,
    /// Last-modified time in milliseconds since the epoch.
    pub last_modified: i64,
}

impl SourceFile {
    /// Creates a source file, reading its modification time from disk.
    ///
    /// An unreadable modification time is stored as zero, which never matches a meta record.
    pub fn new(project: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified_millis(&path).unwrap_or(0);
        Self {
            project: project.into(),
            path,
            last_modified,
        }
    }

    /// The delete key shared by every document of this file.
    pub fn key(&self) -> String {
        path_key(&self.path)
    }
}

/// The full-path key stored in `fullpath`.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Modification time of `path` in milliseconds since the epoch.
pub fn modified_millis(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(system_time_millis(modified))
}

/// Converts a timestamp to milliseconds since the epoch.
fn system_time_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Whether a path is tracked by the extension allow-list.
///
/// `None` is an empty allow-list and matches nothing.
pub fn should_index(path: &Path, extensions: Option<&Regex>) -> bool {
    extensions.is_some_and(|re| re.is_match(&path.to_string_lossy()))
}

/// Discovers every tracked file under the given projects.
pub fn discover_files(projects: &[Project], extensions: Option<&Regex>) -> Vec<SourceFile> {
    let mut files = Vec::new();
    if extensions.is_none() {
        return files;
    }

    for project in projects {
        if !project.path.exists() {
            log::debug!("project {} not found at {}", project.name, project.path.display());
            continue;
        }

        for entry in WalkDir::new(&project.path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    log::debug!("skipping unreadable entry: {err}");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if !should_index(entry.path(), extensions) {
                continue;
            }

            let last_modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(system_time_millis)
                .unwrap_or(0);

            files.push(SourceFile {
                project: project.name.clone(),
                path: entry.into_path(),
                last_modified,
            });
        }
    }

    files
}

/// Checks if a file name is hidden (starts with '.').
fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

#[cfg(test)]
mod test {
    use castle_config::extension_pattern;
    use tempfile::TempDir;

    use super::*;

    fn project(dir: &TempDir) -> Project {
        Project {
            name: "demo".to_string(),
            path: dir.path().to_path_buf(),
        }
    }

    #[test]
    fn finds_tracked_extensions_only() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/main")).unwrap();
        fs::write(temp.path().join("src/main/App.java"), "class App {}").unwrap();
        fs::write(temp.path().join("README.md"), "# readme").unwrap();

        let re = extension_pattern(["java"]).unwrap();
        let files = discover_files(&[project(&temp)], Some(&re));

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("src/main/App.java"));
        assert_eq!(files[0].project, "demo");
        assert!(files[0].last_modified > 0);
    }

    #[test]
    fn skips_hidden_directories() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git/Hidden.java"), "").unwrap();
        fs::write(temp.path().join("Shown.java"), "").unwrap();

        let re = extension_pattern(["java"]).unwrap();
        let files = discover_files(&[project(&temp)], Some(&re));

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("Shown.java"));
    }

    #[test]
    fn empty_allow_list_matches_nothing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("A.java"), "").unwrap();
        assert!(discover_files(&[project(&temp)], None).is_empty());
        assert!(!should_index(Path::new("A.java"), None));
    }

    #[test]
    fn missing_project_is_skipped() {
        let re = extension_pattern(["java"]).unwrap();
        let missing = Project {
            name: "gone".to_string(),
            path: PathBuf::from("/nonexistent/castle/project"),
        };
        assert!(discover_files(&[missing], Some(&re)).is_empty());
    }
}
