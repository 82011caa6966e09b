//! The search worker.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use super::JobStatus;
use crate::{
    cancel::CancelToken,
    search::{Cursor, SearchEngine, SearchRequest, SearchResult},
};

/// Interval between cancellation checks while waiting out a delay.
const DELAY_POLL: Duration = Duration::from_millis(10);

/// Receives search results.
pub trait SearchListener: Send + Sync {
    /// Called with the result of every run that was not cancelled.
    fn on_search_complete(&self, result: &SearchResult);
}

/// What [`SearchJob::handle_search`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDecision {
    /// The request was empty; the search in flight was cancelled.
    Cancelled,
    /// A new run was scheduled.
    Scheduled,
    /// The request repeats the current one and was dropped.
    Ignored,
}

/// Decides whether `next` replaces `current`.
///
/// Zero delay always runs. A repeat of the current request is dropped, as is the same
/// text with a different request unless both carry different extra queries.
pub fn should_schedule(current: Option<&SearchRequest>, next: &SearchRequest) -> bool {
    if next.delay.is_zero() {
        return true;
    }
    let Some(current) = current else {
        return true;
    };
    if next == current {
        return false;
    }
    if next.text == current.text {
        return matches!(
            (&next.extra, &current.extra),
            (Some(a), Some(b)) if a != b
        );
    }
    true
}

/// The current request and where its results left off.
#[derive(Default)]
struct SearchState {
    /// Latest scheduled request.
    request: Option<SearchRequest>,
    /// End of the last page delivered for `request`.
    cursor: Option<Cursor>,
}

/// State shared with worker threads.
struct Shared {
    /// Runs the searches.
    engine: SearchEngine,
    /// Current request and cursor.
    state: Mutex<SearchState>,
    /// Receives results.
    listener: Arc<dyn SearchListener>,
}

/// The run in flight.
struct Running {
    /// Cancels the run.
    cancel: CancelToken,
    /// Worker thread.
    handle: JoinHandle<JobStatus>,
}

/// Runs at most one search at a time, superseding stale requests.
pub struct SearchJob {
    /// State the worker thread also sees.
    shared: Arc<Shared>,
    /// Run in flight.
    current: Mutex<Option<Running>>,
}

impl SearchJob {
    /// Creates a job delivering results to `listener`.
    pub fn new(engine: SearchEngine, listener: Arc<dyn SearchListener>) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine,
                state: Mutex::new(SearchState::default()),
                listener,
            }),
            current: Mutex::new(None),
        }
    }

    /// The request most recently scheduled.
    pub fn current_request(&self) -> Option<SearchRequest> {
        self.shared.state().request.clone()
    }

    /// Submits a request, scheduling it unless it repeats the current one.
    pub fn handle_search(&self, request: SearchRequest) -> SearchDecision {
        if request.text.trim().is_empty() {
            self.cancel();
            return SearchDecision::Cancelled;
        }

        {
            let mut state = self.shared.state();
            if !should_schedule(state.request.as_ref(), &request) {
                log::debug!("ignoring repeated search {:?}", request.text);
                return SearchDecision::Ignored;
            }
            state.request = Some(request);
            state.cursor = None;
        }
        self.spawn();
        SearchDecision::Scheduled
    }

    /// Fetches the page after the last one delivered for the current request.
    ///
    /// Returns false when there is nothing to continue.
    pub fn load_more(&self) -> bool {
        {
            let state = self.shared.state();
            if state.request.is_none() || state.cursor.is_none() {
                return false;
            }
        }
        self.spawn();
        true
    }

    /// Cancels the search in flight, if any.
    pub fn cancel(&self) {
        if let Some(running) = self.current().as_ref() {
            running.cancel.cancel();
        }
    }

    /// Blocks until the scheduled run finishes.
    pub fn wait(&self) -> Option<JobStatus> {
        let running = self.current().take()?;
        match running.handle.join() {
            Ok(status) => Some(status),
            Err(_) => {
                log::warn!("search worker panicked");
                None
            }
        }
    }

    /// Cancels the search in flight and starts the current request after it.
    fn spawn(&self) {
        let mut current = self.current();
        let previous = current.take();
        if let Some(previous) = &previous {
            previous.cancel.cancel();
        }

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("castle-search".to_string())
            .spawn(move || {
                if let Some(previous) = previous
                    && previous.handle.join().is_err()
                {
                    log::warn!("previous search worker panicked");
                }
                shared.process(&token)
            });

        match spawned {
            Ok(handle) => *current = Some(Running { cancel, handle }),
            Err(e) => log::warn!("could not start search worker: {e}"),
        }
    }

    /// Locks the run slot.
    fn current(&self) -> MutexGuard<'_, Option<Running>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Shared {
    /// Locks the request state.
    fn state(&self) -> MutexGuard<'_, SearchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits out the delay, searches, and delivers the result unless cancelled.
    fn process(&self, cancel: &CancelToken) -> JobStatus {
        let (request, cursor) = {
            let state = self.state();
            match &state.request {
                Some(request) => (request.clone(), state.cursor),
                None => return JobStatus::Cancelled,
            }
        };

        if !wait_for(request.delay, cancel) {
            return JobStatus::Cancelled;
        }

        let result = self.engine.run(&request, cursor.as_ref());
        if cancel.is_cancelled() {
            log::debug!("search for {:?} cancelled", request.text);
            return JobStatus::Cancelled;
        }

        {
            let mut state = self.state();
            if state.request.as_ref() != Some(&request) {
                return JobStatus::Cancelled;
            }
            if result.cursor.is_some() {
                state.cursor = result.cursor;
            }
        }

        self.listener.on_search_complete(&result);
        result.status.into()
    }
}

/// Sleeps for `delay`, returning false as soon as `cancel` fires.
fn wait_for(delay: Duration, cancel: &CancelToken) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(DELAY_POLL.min(deadline - now));
    }
}
