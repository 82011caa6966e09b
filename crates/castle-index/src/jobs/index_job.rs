//! The indexing worker.

use std::{
    collections::{BTreeSet, HashSet},
    mem,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::Instant,
};

use super::JobStatus;
use crate::{
    cancel::CancelToken,
    discovery::SourceFile,
    error::IndexError,
    indexer::{IndexListener, IndexOutcome, Indexer, done_message},
};

/// Reported when a run fails.
pub const INDEX_FAILED: &str = "Could not index. Please try again later.";

/// Work waiting for the indexing worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingWork {
    /// Rewrite every meta record so the next scan reindexes everything.
    pub rebuild: bool,
    /// Scan the tracked projects for changes.
    pub full: bool,
    /// Files to index before the scan.
    pub paths: BTreeSet<PathBuf>,
    /// Full-path keys whose documents are deleted.
    pub deletions: HashSet<String>,
}

impl PendingWork {
    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        !self.rebuild && !self.full && self.paths.is_empty() && self.deletions.is_empty()
    }

    /// Folds a submission into the pending work.
    fn merge(
        &mut self,
        full: bool,
        paths: impl IntoIterator<Item = PathBuf>,
        deletions: impl IntoIterator<Item = String>,
    ) {
        self.full |= full;
        self.paths.extend(paths);
        self.deletions.extend(deletions);
    }
}

/// How a run went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// How the run ended.
    pub status: JobStatus,
    /// Files processed.
    pub files: usize,
    /// Message passed to the listener; empty when cancelled.
    pub message: String,
}

/// State shared with the worker thread.
struct Shared {
    /// Single writer for the index directory.
    indexer: Mutex<Indexer>,
    /// Work not yet done.
    pending: Mutex<PendingWork>,
    /// Notified of creation and completion.
    listener: Arc<dyn IndexListener>,
}

/// The run in flight.
struct Running {
    /// Cancels the run.
    cancel: CancelToken,
    /// Worker thread.
    handle: JoinHandle<IndexReport>,
}

/// Serializes indexing runs over one [`Indexer`].
///
/// Submissions merge into the pending work, cancel the run in flight and schedule a new
/// one, which starts once the cancelled run has returned.
pub struct IndexJob {
    /// State the worker thread also sees.
    shared: Arc<Shared>,
    /// Run in flight.
    current: Mutex<Option<Running>>,
}

impl IndexJob {
    /// Creates a job driving `indexer`.
    pub fn new(indexer: Indexer, listener: Arc<dyn IndexListener>) -> Self {
        Self {
            shared: Arc::new(Shared {
                indexer: Mutex::new(indexer),
                pending: Mutex::new(PendingWork::default()),
                listener,
            }),
            current: Mutex::new(None),
        }
    }

    /// A copy of the work not yet done.
    pub fn pending(&self) -> PendingWork {
        self.shared.pending().clone()
    }

    /// Adds work without scheduling a run.
    pub fn enqueue(
        &self,
        full: bool,
        paths: impl IntoIterator<Item = PathBuf>,
        deletions: impl IntoIterator<Item = String>,
    ) {
        self.shared.pending().merge(full, paths, deletions);
    }

    /// Marks every indexed file stale and queues a full scan.
    pub fn enqueue_rebuild(&self) {
        let mut pending = self.shared.pending();
        pending.rebuild = true;
        pending.full = true;
    }

    /// Adds work and reschedules the worker.
    pub fn submit(
        &self,
        full: bool,
        paths: impl IntoIterator<Item = PathBuf>,
        deletions: impl IntoIterator<Item = String>,
    ) {
        self.enqueue(full, paths, deletions);
        self.schedule();
    }

    /// Queues a rebuild and reschedules the worker.
    pub fn submit_rebuild(&self) {
        self.enqueue_rebuild();
        self.schedule();
    }

    /// Runs the pending work on the calling thread.
    pub fn run_now(&self, cancel: &CancelToken) -> IndexReport {
        self.shared.process(cancel)
    }

    /// Cancels the run in flight, if any.
    pub fn cancel(&self) {
        if let Some(running) = self.current().as_ref() {
            running.cancel.cancel();
        }
    }

    /// Blocks until the scheduled run finishes and returns its report.
    pub fn wait(&self) -> Option<IndexReport> {
        let running = self.current().take()?;
        match running.handle.join() {
            Ok(report) => Some(report),
            Err(_) => {
                log::warn!("indexing worker panicked");
                None
            }
        }
    }

    /// Cancels and joins the worker, then releases the writer.
    pub fn shutdown(&self) -> Result<(), IndexError> {
        self.cancel();
        self.wait();
        self.shared.indexer().close()
    }

    /// Cancels the run in flight and starts a new one after it.
    fn schedule(&self) {
        let mut current = self.current();
        let previous = current.take();
        if let Some(previous) = &previous {
            previous.cancel.cancel();
        }

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("castle-index".to_string())
            .spawn(move || {
                if let Some(previous) = previous
                    && previous.handle.join().is_err()
                {
                    log::warn!("previous indexing worker panicked");
                }
                shared.process(&token)
            });

        match spawned {
            Ok(handle) => *current = Some(Running { cancel, handle }),
            Err(e) => log::warn!("could not start indexing worker: {e}"),
        }
    }

    /// Locks the run slot.
    fn current(&self) -> MutexGuard<'_, Option<Running>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Shared {
    /// Locks the pending work.
    fn pending(&self) -> MutexGuard<'_, PendingWork> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the indexer, waiting out any run in progress.
    fn indexer(&self) -> MutexGuard<'_, Indexer> {
        self.indexer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs the pending work and notifies the listener.
    fn process(&self, cancel: &CancelToken) -> IndexReport {
        if cancel.is_cancelled() {
            return IndexReport {
                status: JobStatus::Cancelled,
                files: 0,
                message: String::new(),
            };
        }

        let started = Instant::now();
        let mut indexer = self.indexer();
        let report = match self.drain(&mut indexer, cancel) {
            Ok(IndexOutcome::Completed(files)) => IndexReport {
                status: JobStatus::Completed,
                files,
                message: done_message(files, started.elapsed()),
            },
            Ok(IndexOutcome::Cancelled(files)) => IndexReport {
                status: JobStatus::Cancelled,
                files,
                message: String::new(),
            },
            Err(e) => {
                log::warn!("indexing failed: {e}");
                IndexReport {
                    status: JobStatus::Failed,
                    files: 0,
                    message: INDEX_FAILED.to_string(),
                }
            }
        };

        if !report.message.is_empty() {
            log::info!("{}", report.message);
            self.listener.on_index_done(&report.message);
        }
        report
    }

    /// Specific paths and deletions first, then the meta rewrite, then the scan.
    ///
    /// Work is removed from the queue only once it is done.
    fn drain(
        &self,
        indexer: &mut Indexer,
        cancel: &CancelToken,
    ) -> Result<IndexOutcome, IndexError> {
        let listener = self.listener.as_ref();
        let (paths, deletions) = {
            let pending = self.pending();
            let paths: Vec<PathBuf> = pending.paths.iter().cloned().collect();
            (paths, pending.deletions.clone())
        };

        let mut files = 0;
        if !paths.is_empty() || !deletions.is_empty() {
            let sources = paths
                .iter()
                .map(|path| SourceFile::new(indexer.project_for(path), path))
                .collect();
            let (outcome, committed) =
                indexer.index_files_committed(sources, &deletions, cancel, listener)?;
            files += outcome.count();

            let mut pending = self.pending();
            pending.deletions.retain(|key| !deletions.contains(key));
            for path in &committed {
                pending.paths.remove(path);
            }
            if outcome.is_cancelled() {
                return Ok(IndexOutcome::Cancelled(files));
            }
        }

        if mem::take(&mut self.pending().rebuild) {
            if let Err(e) = indexer.rebuild() {
                self.pending().rebuild = true;
                return Err(e);
            }
        }

        if self.pending().full {
            let outcome = indexer.incremental(cancel, listener)?;
            files += outcome.count();
            if outcome.is_cancelled() {
                return Ok(IndexOutcome::Cancelled(files));
            }
            self.pending().full = false;
        }

        Ok(IndexOutcome::Completed(files))
    }
}
