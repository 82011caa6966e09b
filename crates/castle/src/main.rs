//! Command-line interface for castle.

use std::process::ExitCode;

use castle::cli::{
    CommandContext,
    args::{Commands, parse_cli},
    commands,
};
use env_logger::{Builder, Env, Target};
use log::LevelFilter;

fn main() -> ExitCode {
    let cli = parse_cli();
    init_logging(cli.verbose);

    let ctx = match &cli.command {
        Commands::Init(_) => CommandContext::load_cwd_only(),
        _ => CommandContext::load(),
    };
    let ctx = match ctx {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    commands::run(&cli.command, &ctx)
}

/// Logs to stderr at `warn`, or info/debug with `-v`/`-vv`. `RUST_LOG` takes precedence.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    Builder::from_env(Env::default().default_filter_or(level))
        .target(Target::Stderr)
        .format_timestamp(None)
        .filter_module("tantivy", LevelFilter::Warn)
        .init();
}
