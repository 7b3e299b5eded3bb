//! Shared test helpers for deltamerge integration tests.
//!
//! All tests use temp directories. Each test lays out its own `before/`,
//! `after/` and `target/` trees via [`Workspace`].

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// A temp directory with `before/`, `after/` and `target/` trees.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        for tree in ["before", "after", "target"] {
            std::fs::create_dir_all(dir.path().join(tree)).unwrap();
        }
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn tree(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `contents` to `<tree>/<rel>`, creating parent directories.
    pub fn write(&self, tree: &str, rel: &str, contents: &str) {
        let path = self.tree(tree).join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// Write the same file into all three trees.
    pub fn write_all(&self, rel: &str, before: &str, after: &str, target: &str) {
        self.write("before", rel, before);
        self.write("after", rel, after);
        self.write("target", rel, target);
    }

    pub fn read(&self, tree: &str, rel: &str) -> String {
        std::fs::read_to_string(self.tree(tree).join(rel)).unwrap()
    }

    /// Run `deltamerge reconcile --before before --after after --target target <extra>`.
    pub fn reconcile(&self, extra: &[&str]) -> Output {
        let mut args = vec![
            "reconcile",
            "--before",
            "before",
            "--after",
            "after",
            "--target",
            "target",
        ];
        args.extend_from_slice(extra);
        deltamerge_in(self.path(), &args)
    }
}

/// Run deltamerge in `dir`, with logging quiet and no OTLP export.
pub fn deltamerge_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_deltamerge"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .env_remove("OTEL_EXPORTER_OTLP_ENDPOINT")
        .env_remove("DELTAMERGE_CONFIG")
        .output()
        .expect("failed to execute deltamerge")
}

/// Run deltamerge and assert it exits with `code`. Returns stdout.
pub fn deltamerge_exit(dir: &Path, args: &[&str], code: i32) -> String {
    let out = deltamerge_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(
        out.status.code(),
        Some(code),
        "deltamerge {} exited unexpectedly:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}

/// Run a git command in `dir`. Panics on failure.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {}: {e}", args.join(" ")));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "git {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}
