//! Refreshable read views over index directories.
//!
//! One reader is kept per index directory for the life of the provider. Readers use a
//! manual reload policy: they only see new commits after [`SearcherProvider::maybe_refresh`]
//! or [`SearcherProvider::refresh_blocking`].

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use tantivy::{Index, IndexReader, ReloadPolicy, Searcher, directory::MmapDirectory};

use crate::{
    analyzer::register_analyzers, error::IndexError, schema::LineSchema, status::index_exists,
};

/// A reader for one index directory.
struct ReaderHandle {
    /// The opened index.
    index: Index,
    /// Reader with manual reloads.
    reader: IndexReader,
    /// Serializes reloads.
    refresh: Mutex<()>,
}

/// A point-in-time view of one index.
///
/// Holding a snapshot pins its segments; dropping it releases them.
pub struct IndexSnapshot {
    /// Searcher over the last refreshed commit.
    pub searcher: Searcher,
    /// The index the searcher reads.
    pub index: Index,
    /// Field handles.
    pub schema: LineSchema,
}

/// Process-wide registry of index readers, keyed by index directory.
#[derive(Default)]
pub struct SearcherProvider {
    /// Lazily opened readers.
    handles: Mutex<HashMap<PathBuf, Arc<ReaderHandle>>>,
    /// Field handles shared by every index.
    schema: LineSchema,
}

impl SearcherProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the index at `dir`.
    ///
    /// `Ok(None)` means no index has been committed there yet; that is a normal
    /// startup state, not a failure.
    pub fn acquire(&self, dir: &Path) -> Result<Option<IndexSnapshot>, IndexError> {
        let Some(handle) = self.handle(dir)? else {
            return Ok(None);
        };
        Ok(Some(IndexSnapshot {
            searcher: handle.reader.searcher(),
            index: handle.index.clone(),
            schema: self.schema.clone(),
        }))
    }

    /// Reloads the reader for `dir` unless another reload is already running.
    ///
    /// Failures are logged; readers keep serving the previous commit.
    pub fn maybe_refresh(&self, dir: &Path) {
        let handle = match self.handle(dir) {
            Ok(Some(handle)) => handle,
            Ok(None) => return,
            Err(e) => {
                log::warn!("cannot open reader for {}: {e}", dir.display());
                return;
            }
        };
        let Ok(_guard) = handle.refresh.try_lock() else {
            log::debug!("refresh already running for {}", dir.display());
            return;
        };
        if let Err(e) = handle.reader.reload() {
            log::warn!("refresh failed for {}: {e}", dir.display());
        }
    }

    /// Reloads the reader for `dir`, waiting for any running reload first.
    pub fn refresh_blocking(&self, dir: &Path) -> Result<(), IndexError> {
        let Some(handle) = self.handle(dir)? else {
            return Ok(());
        };
        let _guard = handle.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        handle.reader.reload().map_err(|e| IndexError::read(&e))
    }

    /// The cached reader for `dir`, opening it on first use.
    fn handle(&self, dir: &Path) -> Result<Option<Arc<ReaderHandle>>, IndexError> {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = handles.get(dir) {
            if index_exists(dir) {
                return Ok(Some(Arc::clone(handle)));
            }
            // The directory was removed; forget the stale reader.
            handles.remove(dir);
            return Ok(None);
        }
        if !index_exists(dir) {
            return Ok(None);
        }

        let handle = Arc::new(open_reader(dir)?);
        handles.insert(dir.to_path_buf(), Arc::clone(&handle));
        Ok(Some(handle))
    }
}

/// Opens an existing index directory for reading.
fn open_reader(dir: &Path) -> Result<ReaderHandle, IndexError> {
    let directory = MmapDirectory::open(dir).map_err(|e| {
        let err: tantivy::TantivyError = e.into();
        IndexError::open_index(dir.to_path_buf(), &err)
    })?;
    let index = Index::open(directory).map_err(|e| IndexError::open_index(dir.to_path_buf(), &e))?;
    register_analyzers(&index);

    let reader = index
        .reader_builder()
        .reload_policy(ReloadPolicy::Manual)
        .try_into()
        .map_err(|e| IndexError::open_index(dir.to_path_buf(), &e))?;

    log::debug!("opened reader at {}", dir.display());
    Ok(ReaderHandle {
        index,
        reader,
        refresh: Mutex::new(()),
    })
}
