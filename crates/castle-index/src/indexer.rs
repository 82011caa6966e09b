//! Incremental indexing pipeline.
//!
//! The [`Indexer`] owns the single writer of one index directory and drives a run:
//! 1. Apply pending deletions and commit them before anything else
//! 2. Replace each file's documents, newest files first
//! 3. Commit in groups so a cold index becomes searchable early
//! 4. Refresh readers after every commit

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use castle_config::{Config, Project, Settings, rebuild_version};
use regex::Regex;

use crate::{
    cancel::CancelToken,
    changes::{detect_changes, read_meta},
    discovery::{SourceFile, should_index},
    document::DocumentBuilder,
    error::IndexError,
    provider::SearcherProvider,
    schema::LineSchema,
    writer::LineWriter,
};

/// How an indexing run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Every file was processed; holds the number of files.
    Completed(usize),
    /// The run stopped early; holds the number of files processed before stopping.
    Cancelled(usize),
}

impl IndexOutcome {
    /// Files processed, however the run ended.
    pub fn count(&self) -> usize {
        match self {
            Self::Completed(n) | Self::Cancelled(n) => *n,
        }
    }

    /// Whether the run stopped early.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Receives indexing notifications.
pub trait IndexListener: Send + Sync {
    /// Called once, when the index first has searchable content.
    fn on_index_created(&self, created: bool);

    /// Called with a summary when a run finishes or fails.
    fn on_index_done(&self, message: &str);
}

/// A listener that ignores every notification.
#[derive(Debug, Default)]
pub struct SilentListener;

impl IndexListener for SilentListener {
    fn on_index_created(&self, _created: bool) {}
    fn on_index_done(&self, _message: &str) {}
}

/// Indexes files into one index directory.
pub struct Indexer {
    /// Index directory.
    location: PathBuf,
    /// Writer, opened on first use and reused across runs.
    writer: Option<LineWriter>,
    /// Builds documents from files.
    builder: DocumentBuilder,
    /// Commit and cancellation intervals.
    settings: Settings,
    /// Tracked project roots.
    projects: Vec<Project>,
    /// Full-path allow-list.
    extensions: Option<Regex>,
    /// Readers refreshed after commits.
    provider: Arc<SearcherProvider>,
    /// Set once `on_index_created` has fired.
    created: bool,
}

impl Indexer {
    /// Creates an indexer writing to `location`.
    pub fn new(
        config: &Config,
        location: PathBuf,
        provider: Arc<SearcherProvider>,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            location,
            writer: None,
            builder: DocumentBuilder::new(LineSchema::new(), config)?,
            settings: config.settings.clone(),
            projects: config.tracked_projects(),
            extensions: config.extension_regex(),
            provider,
            created: false,
        })
    }

    /// Index directory.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Tracked project roots.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Whether `path` passes the extension allow-list.
    pub fn tracks(&self, path: &Path) -> bool {
        should_index(path, self.extensions.as_ref())
    }

    /// The project whose root is the longest prefix of `path`, or an empty name.
    pub fn project_for(&self, path: &Path) -> String {
        self.projects
            .iter()
            .filter(|p| path.starts_with(&p.path))
            .max_by_key(|p| p.path.as_os_str().len())
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    /// Scans the tracked projects and indexes whatever changed.
    pub fn incremental(
        &mut self,
        cancel: &CancelToken,
        listener: &dyn IndexListener,
    ) -> Result<IndexOutcome, IndexError> {
        self.provider.refresh_blocking(&self.location)?;
        let changes = {
            let snapshot = self.provider.acquire(&self.location)?;
            detect_changes(
                snapshot.as_ref(),
                &self.projects,
                self.extensions.as_ref(),
                self.builder.document_version(),
            )?
        };
        log::info!(
            "{} files to index, {} to delete",
            changes.files.len(),
            changes.deletions.len()
        );
        self.index_files(changes.files, &changes.deletions, cancel, listener)
    }

    /// Marks every indexed file stale so the next incremental pass reindexes it.
    ///
    /// Line documents stay searchable until their file is reprocessed.
    pub fn rebuild(&mut self) -> Result<usize, IndexError> {
        self.provider.refresh_blocking(&self.location)?;
        let meta = match self.provider.acquire(&self.location)? {
            Some(snapshot) => read_meta(&snapshot)?,
            None => return Ok(0),
        };
        let version = rebuild_version(self.builder.document_version());

        self.ensure_writer()?;
        let Some(writer) = self.writer.as_mut() else {
            return Ok(0);
        };
        writer.delete_meta_documents();
        for (key, info) in &meta {
            writer.add_document(
                self.builder
                    .versioned_meta_document(key, info.last_modified, version),
            )?;
        }
        writer.commit()?;
        self.provider.refresh_blocking(&self.location)?;

        log::info!("marked {} files for reindexing", meta.len());
        Ok(meta.len())
    }

    /// Indexes `files` in order after applying `deletions`.
    ///
    /// A file that no longer exists only has its documents deleted. Files that fail to
    /// read are logged and skipped.
    pub fn index_files(
        &mut self,
        files: Vec<SourceFile>,
        deletions: &HashSet<String>,
        cancel: &CancelToken,
        listener: &dyn IndexListener,
    ) -> Result<IndexOutcome, IndexError> {
        self.index_files_committed(files, deletions, cancel, listener)
            .map(|(outcome, _)| outcome)
    }

    /// Like [`Self::index_files`], also returning the paths whose work was committed.
    ///
    /// Skipped files count as done. Files rolled back by a cancellation are left out.
    pub fn index_files_committed(
        &mut self,
        files: Vec<SourceFile>,
        deletions: &HashSet<String>,
        cancel: &CancelToken,
        listener: &dyn IndexListener,
    ) -> Result<(IndexOutcome, Vec<PathBuf>), IndexError> {
        self.ensure_writer()?;
        let group = self.settings.group_count();
        let cancel_check = self.settings.cancel_check();
        let initially_read = self.settings.initially_read();

        let Some(writer) = self.writer.as_mut() else {
            return Ok((IndexOutcome::Cancelled(0), Vec::new()));
        };

        if !deletions.is_empty() {
            for key in deletions {
                writer.delete_path(key);
            }
            writer.commit()?;
            self.provider.refresh_blocking(&self.location)?;
            log::debug!("deleted {} files", deletions.len());
        }

        let mut count = 0;
        let mut outcome = None;
        let mut committed = Vec::new();
        let mut uncommitted = Vec::new();
        for file in files {
            if !writer.is_usable() {
                log::warn!("index at {} is gone; stopping", self.location.display());
                outcome = Some(IndexOutcome::Cancelled(count));
                break;
            }
            if count % cancel_check == 0 && cancel.is_cancelled() {
                writer.rollback()?;
                outcome = Some(IndexOutcome::Cancelled(count));
                break;
            }

            let key = file.key();
            if file.path.is_file() {
                match self.builder.build(&file) {
                    Ok(documents) => {
                        writer.delete_path(&key);
                        writer.add_file(documents)?;
                    }
                    Err(e) => {
                        log::warn!("skipping {}: {e}", file.path.display());
                        uncommitted.push(file.path);
                        continue;
                    }
                }
            } else {
                writer.delete_path(&key);
            }
            uncommitted.push(file.path);
            count += 1;

            if count % group == 0 {
                writer.commit()?;
                committed.append(&mut uncommitted);
                self.provider.maybe_refresh(&self.location);
                if cancel.is_cancelled() {
                    outcome = Some(IndexOutcome::Cancelled(count));
                    break;
                }
            }

            if count == initially_read {
                if count < group {
                    writer.commit()?;
                    committed.append(&mut uncommitted);
                    self.provider.maybe_refresh(&self.location);
                }
                if !self.created {
                    self.created = true;
                    listener.on_index_created(true);
                }
            }
        }

        match outcome {
            Some(IndexOutcome::Cancelled(n)) if !writer.is_usable() => {
                self.writer = None;
                Ok((IndexOutcome::Cancelled(n), committed))
            }
            Some(outcome) => Ok((outcome, committed)),
            None => {
                if count > 0 {
                    writer.commit()?;
                    self.provider.maybe_refresh(&self.location);
                    if !self.created {
                        self.created = true;
                        listener.on_index_created(true);
                    }
                }
                committed.append(&mut uncommitted);
                Ok((IndexOutcome::Completed(count), committed))
            }
        }
    }

    /// Indexes specific paths, deleting the documents of any that no longer exist.
    pub fn index_paths(
        &mut self,
        paths: &[PathBuf],
        cancel: &CancelToken,
        listener: &dyn IndexListener,
    ) -> Result<IndexOutcome, IndexError> {
        let files = paths
            .iter()
            .map(|path| SourceFile::new(self.project_for(path), path))
            .collect();
        self.index_files(files, &HashSet::new(), cancel, listener)
    }

    /// Deletes the documents of the given full-path keys.
    pub fn delete_keys(&mut self, keys: &HashSet<String>) -> Result<(), IndexError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.index_files(Vec::new(), keys, &CancelToken::new(), &SilentListener)
            .map(|_| ())
    }

    /// Releases the writer. The next run reopens it.
    pub fn close(&mut self) -> Result<(), IndexError> {
        match self.writer.take() {
            Some(writer) => writer.close(),
            None => Ok(()),
        }
    }

    /// Opens the writer unless a usable one is already held.
    fn ensure_writer(&mut self) -> Result<(), IndexError> {
        if self.writer.as_ref().is_some_and(LineWriter::is_usable) {
            return Ok(());
        }
        // A writer whose directory vanished still holds the lock; release it first.
        self.writer = None;
        self.writer = Some(LineWriter::open(&self.location)?);
        Ok(())
    }
}

/// Summary shown when a run completes.
pub fn done_message(indexed: usize, elapsed: Duration) -> String {
    let files = if indexed == 1 {
        "1 file".to_string()
    } else {
        format!("{indexed} files")
    };
    format!("Indexed {files}. It took {}.", format_duration(elapsed))
}

/// Formats whole hours, minutes and seconds, largest first, skipping zero parts.
pub fn format_duration(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let parts = [
        (total / 3600, "hour"),
        ((total % 3600) / 60, "minute"),
        (total % 60, "second"),
    ];

    let text = parts
        .iter()
        .filter(|(n, _)| *n != 0)
        .map(|(n, unit)| {
            if *n == 1 {
                format!("1 {unit}")
            } else {
                format!("{n} {unit}s")
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        "0 seconds".to_string()
    } else {
        text
    }
}
