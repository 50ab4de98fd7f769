//! End-to-end argument parsing checks that don't require a database
//! connection (spec.md §6's exit codes 0/2/3 are covered at the unit level
//! in `quotron-etl`; this exercises the binary's own argument surface).

use assert_cmd::Command;
use predicates::prelude::*;

fn empty_config() -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("quotron-cli-test-config-{}.json", std::process::id()));
    std::fs::write(&path, "{}").unwrap();
    path
}

#[test]
fn help_lists_run_and_etl_subcommands() {
    Command::cargo_bin("quotron")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("etl"));
}

#[test]
fn etl_missing_file_exits_nonzero_without_a_database() {
    let config = empty_config();
    Command::cargo_bin("quotron")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "etl", "quotes", "/nonexistent/quotes.json", "--source", "manual"])
        .assert()
        .failure()
        .code(1);
    let _ = std::fs::remove_file(&config);
}

#[test]
fn etl_rejects_unknown_source_tag() {
    let config = empty_config();
    let file = std::env::temp_dir().join(format!("quotron-cli-test-{}.json", std::process::id()));
    std::fs::write(&file, "[]").unwrap();

    Command::cargo_bin("quotron")
        .unwrap()
        .args([
            "--config",
            config.to_str().unwrap(),
            "etl",
            "quotes",
            file.to_str().unwrap(),
            "--source",
            "not_a_real_source",
        ])
        .assert()
        .failure()
        .code(1);

    let _ = std::fs::remove_file(&file);
    let _ = std::fs::remove_file(&config);
}
