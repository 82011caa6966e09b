//! Implementation of `castle status`.

use std::{path::Path, process::ExitCode};

use castle_config::discover_config_file;
use castle_index::{IndexStatus, SearcherProvider, index_status, read_meta, searcher_directory};
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};

use crate::cli::{
    context::CommandContext,
    output::{Highlighter, dim, subheader, warning},
};

/// Shows the configuration file, projects, searchers and index state.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config = &ctx.config;

    println!("{}", subheader("Config file:"));
    match discover_config_file(&ctx.cwd) {
        Some(path) => println!("   {}", path.display()),
        None => {
            println!("   {}", dim("(none; using defaults)"));
            println!("   Run {} to create one.", subheader("castle init"));
        }
    }
    println!();

    println!("{}", subheader("Projects:"));
    let projects = config.tracked_projects();
    if projects.is_empty() {
        println!("   {}", dim("(none defined)"));
    }
    for project in &projects {
        let path = dim(&format!("-> {}", project.path.display()));
        if project.path.is_dir() {
            println!("   {} {path}", project.name);
        } else {
            println!("   {} {path} {}", project.name, warning("[missing]"));
        }
    }
    println!();

    let extensions: Vec<&str> = config
        .indexers
        .iter()
        .flat_map(|i| i.extensions.iter().map(String::as_str))
        .collect();
    println!("{}", subheader("Indexed extensions:"));
    println!("   {}", extensions.join(", "));
    println!();

    println!("{}", subheader("Searchers:"));
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Name", "Hit limit", "Index", "Status", "Files"]);
    for entry in config.searcher_registry() {
        let dir = searcher_directory(config, &entry);
        let (status, files) = dir
            .as_deref()
            .map_or((IndexStatus::Missing, None), |dir| {
                (index_status(dir), indexed_files(&ctx.provider, dir))
            });
        table.add_row(vec![
            entry.name.clone(),
            entry.hit_limit.to_string(),
            dir.map(|d| d.display().to_string()).unwrap_or_default(),
            status.description().to_string(),
            files.map(|n| n.to_string()).unwrap_or_default(),
        ]);
    }
    println!("{table}");
    println!();

    println!("{}", subheader("Effective settings:"));
    print!("{}", Highlighter::new().highlight_toml(&config.settings_to_toml()));
    println!();

    ExitCode::SUCCESS
}

/// Number of files recorded in the index at `dir`, if it can be read.
fn indexed_files(provider: &SearcherProvider, dir: &Path) -> Option<usize> {
    let snapshot = provider
        .acquire(dir)
        .map_err(|e| log::warn!("reading {}: {e}", dir.display()))
        .ok()??;
    read_meta(&snapshot)
        .map_err(|e| log::warn!("reading {}: {e}", dir.display()))
        .ok()
        .map(|meta| meta.len())
}
