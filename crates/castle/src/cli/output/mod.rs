//! Rendering and JSON serialization for CLI output.

mod highlight;

use std::{
    io::{self, IsTerminal},
    process::ExitCode,
};

use castle_index::{ResultEntry, SearchResult};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
pub use highlight::Highlighter;
use serde::Serialize;

/// ANSI escape codes for terminal output.
mod colors {
    /// Bold text.
    pub const BOLD: &str = "\x1b[1m";
    /// Yellow text.
    pub const YELLOW: &str = "\x1b[33m";
    /// Dim text.
    pub const DIM: &str = "\x1b[2m";
    /// Reset all formatting.
    pub const RESET: &str = "\x1b[0m";
}

/// Formats text as a subheader (bold).
pub fn subheader(text: &str) -> String {
    format!("{}{}{}", colors::BOLD, text, colors::RESET)
}

/// Formats text as dimmed.
pub fn dim(text: &str) -> String {
    format!("{}{}{}", colors::DIM, text, colors::RESET)
}

/// Formats text as a warning (yellow).
pub fn warning(text: &str) -> String {
    format!("{}{}{}", colors::YELLOW, text, colors::RESET)
}

/// JSON output for `castle search`.
#[derive(Serialize)]
struct JsonSearchOutput<'a> {
    /// The query text.
    query: &'a str,
    /// Page number, starting at 1.
    page: usize,
    /// The search result.
    #[serde(flatten)]
    result: &'a SearchResult,
}

/// Prints a page of search results as a table or JSON.
pub fn output_search_result(
    result: &SearchResult,
    query: &str,
    page: usize,
    json: bool,
) -> ExitCode {
    if json {
        let output = JsonSearchOutput {
            query,
            page,
            result,
        };
        return match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: failed to serialize JSON: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if !result.entries.is_empty() {
        let highlighter = io::stdout().is_terminal().then(Highlighter::new);
        println!("{}", results_table(&result.entries, highlighter.as_ref()));
    }
    println!("{}", result.message);
    ExitCode::SUCCESS
}

/// Lays out result entries, one row per hit.
fn results_table(entries: &[ResultEntry], highlighter: Option<&Highlighter>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "File", "Line", "Element", "Type", "Content"]);

    for entry in entries {
        let content = match highlighter {
            Some(h) => h.highlight_line(&entry.content, &entry.extension),
            None => entry.content.clone(),
        };
        table.add_row(vec![
            Cell::new(entry.index),
            Cell::new(&entry.file),
            Cell::new(entry.line),
            Cell::new(&entry.element),
            Cell::new(&entry.line_type),
            Cell::new(content),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: usize, content: &str) -> ResultEntry {
        ResultEntry {
            index,
            file: "Order.java".to_string(),
            element: "load".to_string(),
            line: 12,
            content: content.to_string(),
            line_type: "invoke".to_string(),
            path: "/p/Order.java".to_string(),
            extension: "java".to_string(),
        }
    }

    #[test]
    fn table_has_one_row_per_entry() {
        let table = results_table(&[entry(1, "loadOrder();"), entry(2, "save();")], None);
        let rendered = table.to_string();
        assert!(rendered.contains("loadOrder();"));
        assert!(rendered.contains("save();"));
        assert_eq!(table.row_iter().count(), 2);
    }

    #[test]
    fn styling_wraps_text() {
        assert_eq!(dim("x"), "\x1b[2mx\x1b[0m");
        assert!(subheader("Index:").starts_with(colors::BOLD));
        assert!(warning("[missing]").ends_with(colors::RESET));
    }
}
