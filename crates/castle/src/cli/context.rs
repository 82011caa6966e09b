//! Shared context for running CLI commands.

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use castle_config::{Config, SearcherEntry};
use castle_index::{
    CancelToken, IndexJob, IndexListener, IndexReport, Indexer, SearcherProvider, index_directory,
    searcher_directory,
};

/// Command execution context built once per CLI invocation.
pub struct CommandContext {
    /// Current working directory.
    pub cwd: PathBuf,
    /// Loaded configuration (default when no config file was found).
    pub config: Config,
    /// Readers shared by every search in this invocation.
    pub provider: Arc<SearcherProvider>,
}

impl CommandContext {
    /// Loads the current directory and configuration.
    pub fn load() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        let config = load_config_or_failure(&cwd)?;
        Ok(Self::new(cwd, config))
    }

    /// Loads only the current directory, skipping configuration parsing.
    ///
    /// Used by `init`, which must work even when an existing config file is invalid.
    pub fn load_cwd_only() -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        Ok(Self::new(cwd, Config::default()))
    }

    /// Builds a context from parts.
    fn new(cwd: PathBuf, config: Config) -> Self {
        Self {
            cwd,
            config,
            provider: Arc::new(SearcherProvider::new()),
        }
    }

    /// Ensures there is at least one project to index.
    pub fn require_projects(&self) -> Result<(), ExitCode> {
        if self.config.tracked_projects().is_empty() {
            eprintln!("error: no projects to index");
            eprintln!("Run 'castle init' to create a configuration file.");
            return Err(ExitCode::FAILURE);
        }
        Ok(())
    }

    /// The workspace index directory.
    pub fn index_dir(&self) -> Result<PathBuf, ExitCode> {
        index_directory(&self.config).ok_or_else(|| {
            eprintln!("error: could not determine an index directory");
            ExitCode::FAILURE
        })
    }

    /// Looks up a searcher and its index directory.
    pub fn searcher(&self, name: &str) -> Result<(SearcherEntry, PathBuf), ExitCode> {
        let Some(entry) = self.config.searcher(name) else {
            let known: Vec<String> = self
                .config
                .searcher_registry()
                .into_iter()
                .map(|s| s.name)
                .collect();
            eprintln!("error: unknown searcher '{name}'");
            eprintln!("available: {}", known.join(", "));
            return Err(ExitCode::FAILURE);
        };
        let dir = searcher_directory(&self.config, &entry).ok_or_else(|| {
            eprintln!("error: could not determine an index directory");
            ExitCode::FAILURE
        })?;
        Ok((entry, dir))
    }

    /// Creates an indexing job over the workspace index.
    pub fn index_job(&self, listener: Arc<dyn IndexListener>) -> Result<IndexJob, ExitCode> {
        let dir = self.index_dir()?;
        match Indexer::new(&self.config, dir, Arc::clone(&self.provider)) {
            Ok(indexer) => Ok(IndexJob::new(indexer, listener)),
            Err(e) => {
                eprintln!("error: failed to initialize indexer: {e}");
                Err(ExitCode::FAILURE)
            }
        }
    }

    /// Brings the workspace index up to date, returning the run's report.
    pub fn update_index(&self, listener: Arc<dyn IndexListener>) -> Result<IndexReport, ExitCode> {
        let job = self.index_job(listener)?;
        job.enqueue(true, Vec::new(), Vec::new());
        let report = job.run_now(&CancelToken::new());
        if let Err(e) = job.shutdown() {
            log::warn!("closing index writer: {e}");
        }
        Ok(report)
    }

    /// Resolves `path` against the working directory.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Returns the current working directory or exits with a consistent error.
fn current_dir_or_failure() -> Result<PathBuf, ExitCode> {
    env::current_dir().map_err(|e| {
        eprintln!("error: could not determine current directory: {e}");
        ExitCode::FAILURE
    })
}

/// Loads configuration from the provided directory or exits with an error.
fn load_config_or_failure(cwd: &Path) -> Result<Config, ExitCode> {
    Config::load(cwd).map_err(|e| {
        eprintln!("error: failed to load configuration: {e}");
        ExitCode::FAILURE
    })
}
