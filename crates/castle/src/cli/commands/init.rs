//! Implementation of `castle init`.

use std::{
    fs,
    io::{self, Write},
    path::Path,
    process::ExitCode,
};

use castle_config::{CONFIG_FILENAME, starter_template, write_starter_config};

use crate::cli::{
    args::InitCommand,
    context::CommandContext,
    output::{Highlighter, subheader},
};

/// Entry ignoring castle's data directory.
const GITIGNORE_ENTRY: &str = ".castle/";

/// Writes a starter `.castle.toml` into the working directory.
pub fn run(ctx: &CommandContext, cmd: &InitCommand) -> ExitCode {
    let config_path = ctx.cwd.join(CONFIG_FILENAME);

    if config_path.exists() {
        if !cmd.force {
            eprintln!(
                "error: configuration file already exists: {}",
                config_path.display()
            );
            eprintln!("use --force to overwrite");
            return ExitCode::FAILURE;
        }
        if let Err(e) = fs::remove_file(&config_path) {
            eprintln!("error: failed to replace {}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    }

    if let Err(e) = write_starter_config(&ctx.cwd) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    println!("Created {}", config_path.display());
    println!();
    println!("{}", subheader("Configuration written:"));
    print!("{}", Highlighter::new().highlight_toml(starter_template()));
    println!();

    if let Err(e) = update_gitignore(&ctx.cwd) {
        eprintln!("warning: could not update .gitignore: {e}");
    }

    ExitCode::SUCCESS
}

/// Adds `.castle/` to an existing `.gitignore` that lacks it.
fn update_gitignore(dir: &Path) -> io::Result<()> {
    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        return Ok(());
    }

    let contents = fs::read_to_string(&gitignore_path)?;
    if contents
        .lines()
        .map(str::trim)
        .any(|line| line == GITIGNORE_ENTRY || line == ".castle")
    {
        return Ok(());
    }

    let mut file = fs::OpenOptions::new().append(true).open(&gitignore_path)?;
    if !contents.is_empty() && !contents.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{GITIGNORE_ENTRY}")?;
    println!("Added {GITIGNORE_ENTRY} to .gitignore");

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn gitignore_gains_entry_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "target").unwrap();

        update_gitignore(dir.path()).unwrap();
        update_gitignore(dir.path()).unwrap();

        let contents = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(contents, "target\n.castle/\n");
    }

    #[test]
    fn missing_gitignore_is_left_alone() {
        let dir = TempDir::new().unwrap();
        update_gitignore(dir.path()).unwrap();
        assert!(!dir.path().join(".gitignore").exists());
    }
}
