/// Exercises the `icon_scanner` binary: argument handling and exit codes.
mod common;

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_icon_scanner"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn missing_directory_value_is_a_usage_error() {
    let output = run(&["--directory"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("--directory"));
}

#[test]
fn no_directory_prints_usage() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("-d or --directory"));
}

#[test]
fn empty_directory_prints_usage() {
    let output = run(&["-d", ""]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("-d or --directory"));
}

#[test]
fn nonexistent_directory() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing");
    let output = run(&["-d", path_arg(&missing), "--portable"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "Path does not exist\n");
}

#[test]
fn reference_tree_scan() {
    let dir = TempDir::new().unwrap();
    common::build_reference_tree(dir.path());

    let output = run(&["--portable", "-d", path_arg(dir.path())]);
    assert_eq!(output.status.code(), Some(0));

    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        format!("{} contains at least one icon.", dir.path().join("a.dll").display())
    );
    assert_eq!(
        lines[1],
        format!(
            "Error loading {}: 193",
            dir.path().join("sub").join("d.dll").display()
        )
    );
}

#[test]
fn unknown_flags_are_ignored() {
    let dir = TempDir::new().unwrap();
    common::build_reference_tree(dir.path());

    let plain = run(&["--portable", "-d", path_arg(dir.path())]);
    let noisy = run(&[
        "--verbose",
        "--portable",
        "-x",
        "--directory",
        path_arg(dir.path()),
        "--colour=never",
        "stray",
    ]);
    assert_eq!(noisy.status.code(), Some(0));
    assert_eq!(stdout(&plain), stdout(&noisy));
}

#[test]
fn clustered_unknown_short_flags_are_ignored() {
    let dir = TempDir::new().unwrap();
    common::build_reference_tree(dir.path());

    let plain = run(&["--portable", "-d", path_arg(dir.path())]);
    for cluster in ["-vv", "-xy", "-qd"] {
        let noisy = run(&["--portable", "-d", path_arg(dir.path()), cluster]);
        assert_eq!(noisy.status.code(), Some(0), "{}", cluster);
        assert_eq!(stdout(&plain), stdout(&noisy), "{}", cluster);
    }
}

#[test]
fn double_dash_does_not_hide_flags() {
    let dir = TempDir::new().unwrap();
    common::build_reference_tree(dir.path());

    let output = run(&["--", "--portable", "-d", path_arg(dir.path())]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output).lines().count(), 2);

    let output = run(&["--portable", "-d", path_arg(dir.path()), "--"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output).lines().count(), 2);
}

#[test]
fn last_directory_wins() {
    let dir = TempDir::new().unwrap();
    common::build_reference_tree(dir.path());
    let missing = dir.path().join("missing");

    let output = run(&["--portable", "-d", path_arg(&missing), "-d", path_arg(dir.path())]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output).lines().count(), 2);
}

#[test]
fn empty_tree_exits_zero() {
    let dir = TempDir::new().unwrap();
    let output = run(&["--portable", "-d", path_arg(dir.path())]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).is_empty());
}

#[test]
fn json_output() {
    let dir = TempDir::new().unwrap();
    common::build_reference_tree(dir.path());

    let output = run(&["--portable", "--json", "--show-missing", "-d", path_arg(dir.path())]);
    assert_eq!(output.status.code(), Some(0));

    let out = stdout(&output);
    let messages: Vec<serde_json::Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let kinds: Vec<&str> = messages.iter().map(|m| m["_t"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["start", "r", "r", "r", "done"]);

    let outcomes: Vec<&str> = messages[1..4]
        .iter()
        .map(|m| m["outcome"].as_str().unwrap())
        .collect();
    assert_eq!(outcomes, vec!["has_icon", "no_icon", "load_failed"]);
    assert_eq!(messages[4]["inspected"], 3);
}
