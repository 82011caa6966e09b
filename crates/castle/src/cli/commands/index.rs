//! Implementation of `castle index`.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use castle_index::{CancelToken, IndexListener, JobStatus, should_index};

use crate::cli::{args::IndexCommand, context::CommandContext};

/// Reports indexing milestones through the log.
struct LogListener;

impl IndexListener for LogListener {
    fn on_index_created(&self, _created: bool) {
        log::info!("index is searchable");
    }

    fn on_index_done(&self, message: &str) {
        log::debug!("index job finished: {message}");
    }
}

/// Indexes the tracked projects, or just the given files.
pub fn run(ctx: &CommandContext, cmd: &IndexCommand) -> ExitCode {
    if cmd.paths.is_empty()
        && let Err(code) = ctx.require_projects()
    {
        return code;
    }

    let job = match ctx.index_job(Arc::new(LogListener)) {
        Ok(job) => job,
        Err(code) => return code,
    };

    if cmd.rebuild {
        job.enqueue_rebuild();
    }
    if cmd.paths.is_empty() {
        job.enqueue(true, Vec::new(), Vec::new());
    } else {
        job.enqueue(false, tracked_paths(ctx, &cmd.paths), Vec::new());
    }

    let report = job.run_now(&CancelToken::new());
    if let Err(e) = job.shutdown() {
        log::warn!("closing index writer: {e}");
    }

    match report.status {
        JobStatus::Completed => {
            println!("{}", report.message);
            ExitCode::SUCCESS
        }
        JobStatus::Cancelled => {
            eprintln!("indexing cancelled after {} files", report.files);
            ExitCode::FAILURE
        }
        JobStatus::Failed => {
            eprintln!("error: {}", report.message);
            ExitCode::FAILURE
        }
    }
}

/// Absolute forms of `paths` whose extension is tracked; others are skipped with a warning.
fn tracked_paths(ctx: &CommandContext, paths: &[PathBuf]) -> Vec<PathBuf> {
    let extensions = ctx.config.extension_regex();
    paths
        .iter()
        .map(|path| ctx.absolute(path))
        .filter(|path| {
            let tracked = should_index(path, extensions.as_ref());
            if !tracked {
                eprintln!("skipping {}: extension is not indexed", path.display());
            }
            tracked
        })
        .collect()
}
