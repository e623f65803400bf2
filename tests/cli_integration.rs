//! CLI integration tests for tasklens
//!
//! These tests run the binary against task documents in temporary
//! directories, covering every command end to end.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TASKS: &str = "\
# Project tasks

## Setup
- [x] T001: Set up project skeleton (phase: setup, priority: high, effort: 2)
- [ ] T002: Configure authentication (phase: setup, depends: T001, tags: auth)

## Core
- [ ] T003: Build auth middleware (phase: core, depends: T002, priority: high, tags: auth, api)
- [~] T004: Write API docs (phase: polish, type: docs, tags: docs)
- [ ] T005: Release (phase: polish, depends: T003, T004)

Notes about the plan.
";

const BATCH: &str = "\
- [ ] T001: First step
- [x] T002: Second step
- [ ] T003: Third step (depends: T002)
- [ ] T004: Fourth step
- [ ] T005: Fifth step
";

/// Get a command instance for the tasklens binary, isolated from the caller's env
fn tasklens_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("tasklens"));
    cmd.current_dir(dir)
        .env_remove("TASKLENS_FILE")
        .env_remove("TASKLENS_LOG");
    cmd
}

/// Create a temporary directory with `tasks.md` holding the given text
fn setup_document(text: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("tasks.md"), text).unwrap();
    dir
}

fn json_stdout(cmd: &mut assert_cmd::Command) -> serde_json::Value {
    let out = cmd.output().unwrap();
    assert!(
        out.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).unwrap()
}

fn ids(values: &serde_json::Value) -> Vec<String> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_config() {
    let dir = TempDir::new().unwrap();

    tasklens_cmd(dir.path())
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized tasklens workspace"));

    assert!(dir.path().join(".tasklens/config.toml").is_file());
}

#[test]
fn test_init_reports_json() {
    let dir = TempDir::new().unwrap();

    let json = json_stdout(tasklens_cmd(dir.path()).args(["init", "--format", "json"]));
    assert_eq!(json["success"], true);
    assert!(dir.path().join(".tasklens/config.toml").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    tasklens_cmd(dir.path()).arg("init").assert().success();
    tasklens_cmd(dir.path()).arg("init").assert().success();
}

#[test]
fn test_workspace_config_selects_document() {
    let dir = TempDir::new().unwrap();
    tasklens_cmd(dir.path()).arg("init").assert().success();

    fs::create_dir(dir.path().join("plan")).unwrap();
    fs::write(dir.path().join("plan/todo.md"), TASKS).unwrap();
    let config_path = dir.path().join(".tasklens/config.toml");
    let config = fs::read_to_string(&config_path)
        .unwrap()
        .replace("tasks_file = \"tasks.md\"", "tasks_file = \"plan/todo.md\"");
    fs::write(&config_path, config).unwrap();

    // Run from a subdirectory; the workspace is found by walking up
    tasklens_cmd(&dir.path().join("plan"))
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tasks (5):"));
}

// =============================================================================
// Document Selection Tests
// =============================================================================

#[test]
fn test_missing_document_fails() {
    let dir = TempDir::new().unwrap();

    tasklens_cmd(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task document not found"));
}

#[test]
fn test_file_flag_and_env() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("other.md"), BATCH).unwrap();

    tasklens_cmd(dir.path())
        .args(["list", "--file", "other.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fifth step"));

    tasklens_cmd(dir.path())
        .env("TASKLENS_FILE", "other.md")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fifth step"));
}

// =============================================================================
// List Tests
// =============================================================================

#[test]
fn test_list_shows_readiness() {
    let dir = setup_document(TASKS);

    tasklens_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tasks (5):"))
        .stdout(predicate::str::contains("blocked by T002"))
        .stdout(predicate::str::contains("blocked by T003, T004"));
}

#[test]
fn test_list_json_classifies_blockers() {
    let dir = setup_document(TASKS);

    let json = json_stdout(tasklens_cmd(dir.path()).args(["list", "--format", "json"]));
    let tasks = json["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 5);

    let t003 = tasks
        .iter()
        .find(|t| t["task"]["id"] == "T003")
        .unwrap();
    assert_eq!(t003["readiness"]["state"], "blocked");
    assert_eq!(t003["readiness"]["unmet"], serde_json::json!(["T002"]));

    let t002 = tasks
        .iter()
        .find(|t| t["task"]["id"] == "T002")
        .unwrap();
    assert_eq!(t002["readiness"]["state"], "unblocked");
}

#[test]
fn test_list_lint_reports_malformed_lines() {
    let dir = setup_document("- [ ] T001: Fine\n- [?] T002: Odd marker\n- [ ] no id here\n");

    tasklens_cmd(dir.path())
        .args(["list", "--lint"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Malformed task lines (2):"))
        .stdout(predicate::str::contains("line 2"));
}

// =============================================================================
// Graph Tests
// =============================================================================

#[test]
fn test_graph_mermaid() {
    let dir = setup_document(TASKS);

    tasklens_cmd(dir.path())
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("flowchart LR"))
        .stdout(predicate::str::contains("T001 --> T002"))
        .stdout(predicate::str::contains("T004 --> T005"));
}

#[test]
fn test_graph_dot() {
    let dir = setup_document(TASKS);

    tasklens_cmd(dir.path())
        .args(["graph", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph tasks {"))
        .stdout(predicate::str::contains("\"T002\" -> \"T003\";"));
}

#[test]
fn test_graph_tree_hides_completed() {
    let dir = setup_document(TASKS);

    tasklens_cmd(dir.path())
        .args(["graph", "tree", "--hide-completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("T002"))
        .stdout(predicate::str::contains("└── "))
        .stdout(predicate::str::contains("T001").not());
}

#[test]
fn test_graph_rejects_cycles() {
    let dir = setup_document(
        "- [ ] T001: One (depends: T002)\n- [ ] T002: Two (depends: T001)\n- [ ] T003: Three\n",
    );

    tasklens_cmd(dir.path())
        .arg("graph")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dependency cycle detected"))
        .stderr(predicate::str::contains("T001"))
        .stderr(predicate::str::contains("T002"));
}

#[test]
fn test_graph_unknown_format() {
    let dir = setup_document(TASKS);

    tasklens_cmd(dir.path())
        .args(["graph", "svg"])
        .assert()
        .failure();
}

// =============================================================================
// Filter Tests
// =============================================================================

#[test]
fn test_filter_ready_preset() {
    let dir = setup_document(TASKS);

    let json = json_stdout(tasklens_cmd(dir.path()).args([
        "filter", "--preset", "ready", "--format", "json",
    ]));
    assert_eq!(ids(&json["tasks"]), vec!["T002"]);
}

#[test]
fn test_filter_blocked_preset() {
    let dir = setup_document(TASKS);

    let json = json_stdout(tasklens_cmd(dir.path()).args([
        "filter", "--preset", "blocked", "--format", "json",
    ]));
    assert_eq!(ids(&json["tasks"]), vec!["T003", "T005"]);
    assert_eq!(json["tasks"][0]["blocked_by"], serde_json::json!(["T002"]));
}

#[test]
fn test_filter_by_tag_and_priority() {
    let dir = setup_document(TASKS);

    let json = json_stdout(tasklens_cmd(dir.path()).args([
        "filter", "--tag", "auth", "--priority", "high", "--format", "json",
    ]));
    assert_eq!(ids(&json["tasks"]), vec!["T003"]);
}

#[test]
fn test_filter_text_output() {
    let dir = setup_document(TASKS);

    tasklens_cmd(dir.path())
        .args(["filter", "--preset", "remaining", "--limit", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("remaining tasks (2 of 4):"));
}

// =============================================================================
// Search Tests
// =============================================================================

#[test]
fn test_search_literal() {
    let dir = setup_document(TASKS);

    let json = json_stdout(tasklens_cmd(dir.path()).args(["search", "auth", "--format", "json"]));
    let hit_ids = ids(&json["hits"]);
    assert!(hit_ids.contains(&"T002".to_string()));
    assert!(hit_ids.contains(&"T003".to_string()));
}

#[test]
fn test_search_transposition_needs_approximate_mode() {
    let dir = setup_document(TASKS);

    tasklens_cmd(dir.path())
        .args(["search", "atuh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks match 'atuh'."));

    let json = json_stdout(tasklens_cmd(dir.path()).args([
        "search", "atuh", "--mode", "approximate", "--format", "json",
    ]));
    let hit_ids = ids(&json["hits"]);
    assert!(hit_ids.contains(&"T003".to_string()));
    assert!(json["hits"][0]["similarity"].as_u64().unwrap() >= 70);
}

#[test]
fn test_search_invalid_pattern_falls_back() {
    let dir = setup_document("- [ ] T001: Handle (unclosed input\n");

    tasklens_cmd(dir.path())
        .args(["search", "(unclosed", "--mode", "pattern"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not a valid pattern"))
        .stdout(predicate::str::contains("T001"));
}

#[test]
fn test_search_empty_query_fails() {
    let dir = setup_document(TASKS);

    tasklens_cmd(dir.path())
        .args(["search", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Search query is empty"));
}

// =============================================================================
// Stats Tests
// =============================================================================

#[test]
fn test_stats_json() {
    let dir = setup_document(TASKS);

    let json = json_stdout(tasklens_cmd(dir.path()).args([
        "stats", "--group-by", "phase", "--format", "json",
    ]));
    assert_eq!(json["overall"]["total"], 5);
    assert_eq!(json["overall"]["completed"], 1);
    assert_eq!(json["overall"]["percentage"], 20.0);
    assert_eq!(json["blockers"]["blocked"], 2);
    // T004 is in progress with no prerequisites
    assert_eq!(json["blockers"]["unblocked"], 2);

    let keys: Vec<_> = json["groupings"][0]["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys, vec!["setup", "core", "polish"]);
}

#[test]
fn test_stats_text_with_charts() {
    let dir = setup_document(TASKS);

    tasklens_cmd(dir.path())
        .args(["stats", "--charts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1/5 done (20.0%)"))
        .stdout(predicate::str::contains("[####----------------]"))
        .stdout(predicate::str::contains("T005 waits on T003, T004"));
}

// =============================================================================
// Complete Tests
// =============================================================================

#[test]
fn test_complete_lenient() {
    let dir = setup_document(BATCH);

    tasklens_cmd(dir.path())
        .args(["complete", "T001-T003"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed (2): T001, T003"))
        .stdout(predicate::str::contains("Skipped T002: already completed"))
        .stdout(predicate::str::contains("Overall progress: 60.0%"));

    let text = fs::read_to_string(dir.path().join("tasks.md")).unwrap();
    assert!(text.contains("- [x] T001: First step"));
    assert!(text.contains("- [x] T003: Third step (depends: T002)"));
    assert!(text.contains("- [ ] T004: Fourth step"));
}

#[test]
fn test_complete_strict_rejects_without_writing() {
    let dir = setup_document(BATCH);

    tasklens_cmd(dir.path())
        .args(["complete", "T001-T003", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing written"))
        .stderr(predicate::str::contains("T002: already completed"));

    let text = fs::read_to_string(dir.path().join("tasks.md")).unwrap();
    assert_eq!(text, BATCH);
}

#[test]
fn test_complete_reports_unknown_and_invalid_targets() {
    let dir = setup_document(BATCH);

    let json = json_stdout(tasklens_cmd(dir.path()).args([
        "complete", "T004,T099", "bogus", "--format", "json",
    ]));
    assert_eq!(json["completed"], 1);
    assert_eq!(json["failed"], 2);
}

#[test]
fn test_complete_warns_about_open_dependencies() {
    let dir = setup_document("- [ ] T001: Base\n- [ ] T002: Top (depends: T001)\n");

    tasklens_cmd(dir.path())
        .args(["complete", "T002"])
        .assert()
        .success()
        .stderr(predicate::str::contains("T002 completed while dependencies are open: T001"));
}
