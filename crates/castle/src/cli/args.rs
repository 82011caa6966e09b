//! Clap argument definitions for the `castle` CLI.

use std::{env, path::PathBuf, process::exit};

use castle_config::WORKSPACE_SEARCHER;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, error::ErrorKind};

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "castle")]
#[command(about = "castle - line-level code search")]
pub struct Cli {
    /// Log verbosity (-v for info, -vv for debug)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments for `castle init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `castle index`.
#[derive(Args, Debug, Clone)]
pub struct IndexCommand {
    /// Reindex every file, keeping old lines searchable until each file is redone
    #[arg(long)]
    pub rebuild: bool,

    /// Index only these files (missing files are removed from the index)
    pub paths: Vec<PathBuf>,
}

/// Arguments for `castle search`.
#[derive(Args, Debug, Clone)]
pub struct SearchCommand {
    /// Query text; several words are joined with spaces
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Hits per page [default: searcher's hit limit]
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Page of results to show, starting at 1
    #[arg(short = 'p', long, default_value = "1")]
    pub page: usize,

    /// Join clauses without an operator with AND instead of OR
    #[arg(long)]
    pub and: bool,

    /// Let unfielded terms also match comment text
    #[arg(short = 'c', long)]
    pub comments: bool,

    /// Searcher to query
    #[arg(short = 's', long, default_value = WORKSPACE_SEARCHER)]
    pub searcher: String,

    /// Rank hits in this file first
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Search the existing index without updating it first
    #[arg(long)]
    pub no_update: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Supported `castle` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Search indexed lines
    #[command(after_help = "\
QUERY SYNTAX:
  term              Term in the line's code
  term1 term2       Either term (both with --and)
  \"phrase\"          Words in order
  +term / -term     Term required / excluded
  a AND b, a OR b   Explicit operators; NOT excludes
  (expr)            Grouping
  term*             Prefix match
  expr^2            Boost

FIELD QUERIES:
  type:declare      Line type label
  comment:todo      Comment text
  file:Order.java   File name
  element:save      Enclosing method or type
  ext:java          File extension
  line:[10 TO 20]   Line number range
  date:[20240101 TO *]
                    Date written in the line (yyyyMMdd)

EXAMPLES:
  castle search saveUser
  castle search 'type:\"declare assign\" user'
  castle search --and 'order total -test'
  castle search -f src/Order.java load")]
    Search(SearchCommand),

    /// Index the tracked projects, or specific files
    Index(IndexCommand),

    /// Create a .castle.toml in the current directory
    Init(InitCommand),

    /// Show configuration, projects and index state
    Status,
}

/// Parses CLI arguments, printing a compact command list for top-level `--help`.
pub fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if e.kind() == ErrorKind::DisplayHelp {
                let args: Vec<_> = env::args().collect();
                if args.len() <= 2 {
                    print_command_list();
                    exit(0);
                }
            }
            e.exit();
        }
    }
}

/// Prints the about line and one line per subcommand.
fn print_command_list() {
    let cmd = Cli::command();
    let about = cmd.get_about().map(|s| s.to_string()).unwrap_or_default();

    println!("{about}");
    println!();
    println!("Usage: castle [-v...] <COMMAND>");
    println!();
    println!("Commands:");
    for sub in cmd.get_subcommands() {
        let name = sub.get_name();
        if name == "help" {
            continue;
        }
        let about = sub.get_about().map(|s| s.to_string()).unwrap_or_default();
        println!("  {name:8} {about}");
    }
    println!();
    println!("Options:");
    println!("  -v, --verbose  Log more (repeat for debug)");
    println!("  -h, --help     Print help");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_defaults() {
        let cli = Cli::try_parse_from(["castle", "search", "save", "user"]).unwrap();
        let Commands::Search(cmd) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(cmd.query, vec!["save", "user"]);
        assert_eq!(cmd.page, 1);
        assert_eq!(cmd.searcher, WORKSPACE_SEARCHER);
        assert!(!cmd.and && !cmd.comments && !cmd.json);
        assert_eq!(cmd.limit, None);
    }

    #[test]
    fn verbosity_is_global() {
        let cli = Cli::try_parse_from(["castle", "index", "-vv", "--rebuild"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Index(IndexCommand { rebuild: true, .. })));
    }
}
