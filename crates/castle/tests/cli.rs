//! CLI integration tests for castle commands.
//!
//! These tests focus on exit codes and behavior, not exact table layout.

// Integration tests are not inside a cfg(test) module.
#![allow(clippy::tests_outside_test_module)]

use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Helper to create a temp directory for tests.
fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

/// Helper to get a castle command with user directories isolated to `home`.
fn castle(home: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("castle").unwrap();
    cmd.env("HOME", home)
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("RUST_LOG");
    cmd
}

/// Writes a config tracking `src/` and the given Java files under it.
fn project(dir: &Path, files: &[(&str, &str)]) {
    fs::write(
        dir.join(".castle.toml"),
        "[[project]]\nname = \"demo\"\npath = \"src\"\n",
    )
    .unwrap();
    let src = dir.join("src");
    fs::create_dir_all(&src).unwrap();
    for (name, contents) in files {
        fs::write(src.join(name), contents).unwrap();
    }
}

/// A small two-file project.
fn billing_project(dir: &Path) {
    project(
        dir,
        &[
            (
                "Billing.java",
                "class Billing {\n    void charge() {\n        ledger.post(amount); // book it\n    }\n}\n",
            ),
            ("Refund.java", "import com.acme.Ledger;\n\nint refunds;\n"),
        ],
    );
}

mod init {
    use super::*;

    #[test]
    fn creates_config_file() {
        let dir = temp_dir();

        castle(dir.path())
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));

        let contents = fs::read_to_string(dir.path().join(".castle.toml")).unwrap();
        assert!(contents.contains("[[project]]"));
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = temp_dir();
        fs::write(dir.path().join(".castle.toml"), "# mine\n").unwrap();

        castle(dir.path())
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));

        castle(dir.path())
            .current_dir(dir.path())
            .args(["init", "--force"])
            .assert()
            .success();
        let contents = fs::read_to_string(dir.path().join(".castle.toml")).unwrap();
        assert!(!contents.starts_with("# mine"));
    }

    #[test]
    fn works_with_invalid_existing_config() {
        let dir = temp_dir();
        fs::write(dir.path().join(".castle.toml"), "not [valid toml").unwrap();

        castle(dir.path())
            .current_dir(dir.path())
            .args(["init", "--force"])
            .assert()
            .success();
    }
}

mod index {
    use super::*;

    #[test]
    fn indexes_tracked_files() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .arg("index")
            .assert()
            .success()
            .stdout(predicate::str::contains("Indexed 2 files. It took"));

        assert!(dir.path().join(".castle/index/meta.json").exists());
    }

    #[test]
    fn second_run_indexes_nothing() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .arg("index")
            .assert()
            .success();
        castle(dir.path())
            .current_dir(dir.path())
            .arg("index")
            .assert()
            .success()
            .stdout(predicate::str::contains("Indexed 0 files."));
    }

    #[test]
    fn rebuild_reindexes_everything() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .arg("index")
            .assert()
            .success();
        castle(dir.path())
            .current_dir(dir.path())
            .args(["index", "--rebuild"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Indexed 2 files."));
    }

    #[test]
    fn specific_file() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .args(["index", "src/Refund.java", "notes.txt"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Indexed 1 file."))
            .stderr(predicate::str::contains("skipping"));
    }

    #[test]
    fn requires_projects() {
        let dir = temp_dir();

        castle(dir.path())
            .current_dir(dir.path())
            .arg("index")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no projects"));
    }
}

mod search {
    use super::*;

    #[test]
    fn finds_line() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .args(["search", "ledger"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Billing.java"))
            .stdout(predicate::str::contains("Total Results: 2 hits"));
    }

    #[test]
    fn json_output() {
        let dir = temp_dir();
        billing_project(dir.path());

        let output = castle(dir.path())
            .current_dir(dir.path())
            .args(["search", "--json", "refunds"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["query"], "refunds");
        assert_eq!(json["page"], 1);
        assert_eq!(json["index_exists"], true);
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["file"], "Refund.java");
        assert_eq!(entries[0]["line"], 3);
        assert_eq!(entries[0]["index"], 1);
    }

    #[test]
    fn comments_need_flag() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .args(["search", "book"])
            .assert()
            .success()
            .stdout(predicate::str::contains("There are no results"));

        castle(dir.path())
            .current_dir(dir.path())
            .args(["search", "--comments", "book"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Total Results: 1 hit"));
    }

    #[test]
    fn pages() {
        let dir = temp_dir();
        let body: String = (0..12).map(|i| format!("counter.add({i});\n")).collect();
        project(dir.path(), &[("Counter.java", &body)]);

        let output = castle(dir.path())
            .current_dir(dir.path())
            .args(["search", "--json", "-n", "5", "--page", "3", "counter"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: Value = serde_json::from_slice(&output.stdout).unwrap();
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["index"], 11);
        assert_eq!(json["message"], "Showing Results 1-5 of 12 hits");
    }

    #[test]
    fn invalid_query_fails() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .args(["search", "(ledger"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Search query is not valid."));
    }

    #[test]
    fn unknown_searcher_fails() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .args(["search", "--searcher", "Nowhere", "ledger"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown searcher"));
    }

    #[test]
    fn without_update_reports_missing_index() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .args(["search", "--no-update", "ledger"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cannot query until index is initialized"));
    }

    #[test]
    fn and_operator() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .args(["search", "--and", "ledger", "amount"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Total Results: 1 hit"));
    }
}

mod status {
    use super::*;

    #[test]
    fn shows_projects_and_searchers() {
        let dir = temp_dir();
        billing_project(dir.path());

        castle(dir.path())
            .current_dir(dir.path())
            .arg("index")
            .assert()
            .success();

        castle(dir.path())
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("demo"))
            .stdout(predicate::str::contains("Workspace"))
            .stdout(predicate::str::contains("ready"))
            .stdout(predicate::str::contains("java"));
    }

    #[test]
    fn without_config() {
        let dir = temp_dir();

        castle(dir.path())
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("castle init"));
    }
}

#[test]
fn top_level_help_lists_commands() {
    let dir = temp_dir();

    castle(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("index"))
        .stdout(predicate::str::contains("status"));
}
