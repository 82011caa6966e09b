//! Implementation of `castle search`.

use std::{process::ExitCode, sync::Arc};

use castle_config::Operator;
use castle_index::{
    ExtraQuery, SearchEngine, SearchRequest, SearchResult, SearchStatus, SilentListener,
    path_key,
};

use crate::cli::{args::SearchCommand, context::CommandContext, output::output_search_result};

/// Searches an index and prints one page of hits.
pub fn run(ctx: &CommandContext, cmd: &SearchCommand) -> ExitCode {
    if cmd.page == 0 {
        eprintln!("error: pages start at 1");
        return ExitCode::FAILURE;
    }

    let (entry, location) = match ctx.searcher(&cmd.searcher) {
        Ok(found) => found,
        Err(code) => return code,
    };

    if entry.index_path.is_none()
        && !cmd.no_update
        && !ctx.config.tracked_projects().is_empty()
    {
        match ctx.update_index(Arc::new(SilentListener)) {
            Ok(report) => log::info!("{}", report.message),
            Err(code) => return code,
        }
    }

    let text = cmd.query.join(" ");
    let mut request = SearchRequest::new(text.clone(), location, &ctx.config);
    request.limit = cmd.limit.unwrap_or(entry.hit_limit).max(1);
    if cmd.and {
        request.operator = Operator::And;
    }
    if cmd.comments {
        request.include_comments = true;
    }
    if let Some(file) = &cmd.file {
        request.extra = Some(ExtraQuery::current_file(path_key(&ctx.absolute(file))));
    }

    let engine = SearchEngine::new(Arc::clone(&ctx.provider), &ctx.config);
    let result = fetch_page(&engine, &request, cmd.page);

    if result.status == SearchStatus::Failed {
        eprintln!("error: {}", result.message);
        return ExitCode::FAILURE;
    }
    if !result.index_exists {
        eprintln!("{}", result.message);
        eprintln!("Run 'castle index' to build the index.");
        return ExitCode::FAILURE;
    }

    output_search_result(&result, &text, cmd.page, cmd.json)
}

/// Runs `request` and follows cursors to the 1-based `page`.
fn fetch_page(engine: &SearchEngine, request: &SearchRequest, page: usize) -> SearchResult {
    let mut result = engine.run(request, None);
    for _ in 1..page {
        if result.status == SearchStatus::Failed {
            break;
        }
        let Some(cursor) = result.cursor else {
            break;
        };
        result = engine.run(request, Some(&cursor));
    }
    result
}
