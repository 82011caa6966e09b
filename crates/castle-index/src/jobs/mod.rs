//! Background workers for indexing and searching.
//!
//! Each job owns one worker at a time. A new submission cancels the run in flight and
//! the replacement starts only after it has returned, so there is never more than one
//! active indexing run or search per job.

mod index_job;
mod search_job;

pub use index_job::{INDEX_FAILED, IndexJob, IndexReport, PendingWork};
pub use search_job::{SearchDecision, SearchJob, SearchListener, should_schedule};

use crate::search::SearchStatus;

/// How a job run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// The run finished its work.
    Completed,
    /// The run stopped early; nothing was delivered.
    Cancelled,
    /// The run failed; a message was delivered instead of results.
    Failed,
}

impl From<SearchStatus> for JobStatus {
    fn from(status: SearchStatus) -> Self {
        match status {
            SearchStatus::Completed => Self::Completed,
            SearchStatus::Failed => Self::Failed,
        }
    }
}
