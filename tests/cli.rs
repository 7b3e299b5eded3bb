//! End-to-end tests driving the `deltamerge` binary.

mod common;

use common::{Workspace, deltamerge_exit, deltamerge_in, run_git};

const BASE: &str = "l1\nl2\nl3\nl4\nl5\nl6\n";

/// A: whitespace-only drift, no-op delta. B: clean append. C: line-5 conflict.
fn three_unit_workspace() -> Workspace {
    let ws = Workspace::new();
    ws.write_all("A.cls", "x\ny\n", "x\ny\n", "x  \ny\n");
    ws.write_all("B.cls", BASE, &format!("{BASE}l7\n"), BASE);
    ws.write_all(
        "C.cls",
        BASE,
        "l1\nl2\nl3\nl4\nDELTA\nl6\n",
        "l1\nl2\nl3\nl4\nHOTFIX\nl6\n",
    );
    ws
}

/// The same workspace without the conflicting unit.
fn clean_workspace() -> Workspace {
    let ws = Workspace::new();
    ws.write_all("A.cls", "x\ny\n", "x\ny\n", "x  \ny\n");
    ws.write_all("B.cls", BASE, &format!("{BASE}l7\n"), BASE);
    ws
}

#[test]
fn preview_reports_groups_and_stages_clean_units() {
    let ws = three_unit_workspace();
    let out = ws.reconcile(&[]);
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("reconcile (preview)"), "{stdout}");
    assert!(stdout.contains("\nClean:\n  B.cls\n"), "{stdout}");
    assert!(stdout.contains("\nNo real change:\n  A.cls\n"), "{stdout}");
    assert!(stdout.contains("\nConflict:\n  C.cls\n"), "{stdout}");
    assert!(stdout.contains("Not published: preview only."), "{stdout}");

    let staged = ws.path().join(".deltamerge/staging");
    assert_eq!(
        std::fs::read_to_string(staged.join("files/B.cls")).unwrap(),
        format!("{BASE}l7\n")
    );
    assert!(staged.join("manifest.json").is_file());
    assert!(!staged.join("files/C.cls").exists());
    assert_eq!(ws.read("target", "B.cls"), BASE);
}

#[test]
fn publish_is_refused_while_any_unit_conflicts() {
    let ws = three_unit_workspace();
    let stdout = deltamerge_exit(
        ws.path(),
        &[
            "reconcile", "--before", "before", "--after", "after", "--target", "target", "--mode",
            "publish",
        ],
        1,
    );
    assert!(stdout.contains("Not published: conflicts outstanding."), "{stdout}");
    assert_eq!(ws.read("target", "B.cls"), BASE);
    assert_eq!(ws.read("target", "C.cls"), "l1\nl2\nl3\nl4\nHOTFIX\nl6\n");
    assert!(!ws.path().join(".deltamerge/staging").exists());
}

#[test]
fn publish_writes_clean_units_into_target() {
    let ws = clean_workspace();
    let out = ws.reconcile(&["--mode", "publish"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Published 1 file(s)"), "{stdout}");
    assert_eq!(ws.read("target", "B.cls"), format!("{BASE}l7\n"));
    // No-real-change units keep the target's exact bytes.
    assert_eq!(ws.read("target", "A.cls"), "x  \ny\n");
}

#[test]
fn dry_run_emits_json_and_writes_nothing() {
    let ws = three_unit_workspace();
    let out = ws.reconcile(&["--mode", "dry-run", "--format", "json"]);
    assert_eq!(out.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["mode"], "dry-run");
    assert_eq!(json["status"], "conflicts_present");
    assert_eq!(json["exit_code"], 1);
    assert_eq!(json["result"]["clean"], serde_json::json!(["B.cls"]));
    assert_eq!(json["result"]["no_real_change"], serde_json::json!(["A.cls"]));
    assert_eq!(json["result"]["conflicted"], serde_json::json!(["C.cls"]));
    assert!(json["staged"].is_null());
    assert!(!ws.path().join(".deltamerge").exists());
}

#[test]
fn target_hotfix_survives_publication() {
    let ws = Workspace::new();
    ws.write_all(
        "classes/Foo.cls",
        "class Foo {\n  a();\n  b();\n  c();\n}\n",
        "class Foo {\n  a();\n  b();\n  c(log);\n}\n",
        "class Foo {\n  a(hotfix);\n  b();\n  c();\n}\n",
    );
    let out = ws.reconcile(&["--mode", "publish"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        ws.read("target", "classes/Foo.cls"),
        "class Foo {\n  a(hotfix);\n  b();\n  c(log);\n}\n"
    );
}

#[test]
fn crlf_target_is_normalized_before_merging() {
    let ws = Workspace::new();
    ws.write_all("A.cls", "a\nb\n", "a\nb\nc\n", "a\r\nb\r\n");
    let out = ws.reconcile(&["--mode", "publish"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(ws.read("target", "A.cls"), "a\nb\nc\n");
}

#[test]
fn companion_files_ride_with_their_primary() {
    let ws = Workspace::new();
    ws.write_all("Foo.cls", "a\n", "a\n", "a\n");
    ws.write_all("Foo.cls-meta.xml", "<v>1</v>\n", "<v>2</v>\n", "<v>1</v>\n");
    let out = ws.reconcile(&["--format", "json", "--mode", "publish"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["result"]["clean"], serde_json::json!(["Foo.cls"]));
    assert_eq!(json["units"].as_array().unwrap().len(), 1);
    assert_eq!(ws.read("target", "Foo.cls-meta.xml"), "<v>2</v>\n");
}

#[test]
fn include_glob_limits_units() {
    let ws = clean_workspace();
    ws.write_all("pages/P.page", "p\n", "q\n", "r\n");
    let out = ws.reconcile(&["--include", "*.cls", "--format", "json", "--mode", "dry-run"]);
    assert_eq!(out.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(json["result"]["conflicted"].as_array().unwrap().is_empty());
}

#[test]
fn empty_delta_is_a_precondition_failure() {
    let ws = Workspace::new();
    let out = ws.reconcile(&[]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("no units to reconcile"), "{stderr}");
}

#[test]
fn all_skipped_lists_missing_roles() {
    let ws = Workspace::new();
    ws.write("before", "A.cls", "a\n");
    ws.write("after", "A.cls", "b\n");
    let out = ws.reconcile(&[]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("A.cls (missing target)"), "{stderr}");
}

#[test]
fn missing_target_directory_is_reported() {
    let ws = Workspace::new();
    let out = deltamerge_in(
        ws.path(),
        &["reconcile", "--before", "before", "--after", "after", "--target", "nope"],
    );
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("target directory not found"), "{stderr}");
}

#[test]
fn before_without_after_is_a_usage_error() {
    let ws = Workspace::new();
    let out = deltamerge_in(ws.path(), &["reconcile", "--before", "before", "--target", "target"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn config_file_selects_diff3_markers() {
    let ws = three_unit_workspace();
    std::fs::write(
        ws.path().join("deltamerge.toml"),
        "[merge]\nconflict_style = \"diff3\"\ndelta_label = \"release\"\n",
    )
    .unwrap();
    let stdout = deltamerge_exit(
        ws.path(),
        &["merge-file", "target/C.cls", "before/C.cls", "after/C.cls"],
        1,
    );
    assert_eq!(
        stdout,
        "l1\nl2\nl3\nl4\n<<<<<<< target\nHOTFIX\n||||||| before\nl5\n=======\nDELTA\n>>>>>>> release\nl6\n"
    );
}

#[test]
fn invalid_config_exits_with_line_number() {
    let ws = clean_workspace();
    std::fs::write(ws.path().join("deltamerge.toml"), "[merge]\n\nbogus = 1\n").unwrap();
    let out = ws.reconcile(&[]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("line 3"), "{stderr}");
}

#[test]
fn merge_file_clean_prints_merged_text() {
    let ws = clean_workspace();
    let stdout = deltamerge_exit(
        ws.path(),
        &["merge-file", "target/B.cls", "before/B.cls", "after/B.cls"],
        0,
    );
    assert_eq!(stdout, format!("{BASE}l7\n"));
}

#[test]
fn merge_file_conflict_flag_overrides_config() {
    let ws = three_unit_workspace();
    let stdout = deltamerge_exit(
        ws.path(),
        &[
            "merge-file",
            "--conflict-style",
            "merge",
            "target/C.cls",
            "before/C.cls",
            "after/C.cls",
        ],
        1,
    );
    assert!(stdout.contains("<<<<<<< target\nHOTFIX\n=======\nDELTA\n>>>>>>> delta\n"));
}

#[test]
fn git_rev_source_reconciles_commit_delta() {
    let ws = Workspace::new();
    let repo = ws.tree("repo");
    std::fs::create_dir_all(&repo).unwrap();
    run_git(&repo, &["init", "-q"]);
    std::fs::write(repo.join("B.cls"), BASE).unwrap();
    run_git(&repo, &["add", "."]);
    run_git(&repo, &["commit", "-q", "-m", "base"]);
    std::fs::write(repo.join("B.cls"), format!("{BASE}l7\n")).unwrap();
    run_git(&repo, &["commit", "-q", "-am", "delta"]);
    ws.write("target", "B.cls", BASE);

    let out = deltamerge_in(
        ws.path(),
        &[
            "reconcile", "--git-rev", "HEAD", "--repo", "repo", "--target", "target", "--mode",
            "publish",
        ],
    );
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(ws.read("target", "B.cls"), format!("{BASE}l7\n"));
}

#[test]
fn completions_are_generated() {
    let ws = Workspace::new();
    let stdout = deltamerge_exit(ws.path(), &["completions", "bash"], 0);
    assert!(stdout.contains("deltamerge"));
}
