//! User-facing search messages.

/// Shown when the index has not been created yet.
pub const INDEX_NOT_READY: &str =
    "Cannot query until index is initialized. Your query will run shortly.";

/// Shown when the index could not be read.
pub const SEARCH_FAILED: &str = "Could not search. Please try again later.";

/// Shown when the query text does not parse or compile.
pub const INVALID_QUERY: &str = "Search query is not valid.";

/// Summarizes a hit count for a page of `limit` hits.
///
/// `exact` is false when `total` is a lower bound.
pub fn total_results_message(total: usize, limit: usize, exact: bool) -> String {
    if !exact {
        return format!("Showing Results 1-{limit} of over {total} hits");
    }
    match total {
        0 => "There are no results".to_string(),
        1 => "Total Results: 1 hit".to_string(),
        n if n <= limit => format!("Total Results: {n} hits"),
        n => format!("Showing Results 1-{limit} of {n} hits"),
    }
}
