//! Integration tests for the command handlers against real git repositories.
//!
//! These exercise the full flow of a command: repository discovery, config,
//! locking, the metadata cache, and the git subprocess layer.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use braid::cli::{commands, Context};
use braid::ui::Verbosity;

// =============================================================================
// Test fixtures
// =============================================================================

/// A real git repository with an initial commit on `main`.
struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");

        run_git(dir.path(), &["init", "-b", "main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        // Keep git from opening editors during tests.
        run_git(dir.path(), &["config", "core.editor", "true"]);

        std::fs::write(dir.path().join("README.md"), "# Test Repo\n").unwrap();
        run_git(dir.path(), &["add", "README.md"]);
        run_git(dir.path(), &["commit", "-m", "initial commit"]);

        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn context(&self) -> Context {
        Context {
            cwd: Some(self.path().to_path_buf()),
            verbosity: Verbosity::Quiet,
        }
    }

    fn init_braid(&self) {
        commands::init(&self.context(), Some("main"), None).expect("init failed");
    }

    /// Write a file, stage it, and commit it.
    fn commit(&self, filename: &str, content: &str, message: &str) {
        std::fs::write(self.path().join(filename), content).unwrap();
        run_git(self.path(), &["add", filename]);
        run_git(self.path(), &["commit", "-m", message]);
    }

    fn checkout(&self, name: &str) {
        run_git(self.path(), &["checkout", name]);
    }

    fn current_branch(&self) -> String {
        git_stdout(self.path(), &["branch", "--show-current"])
    }

    fn rev_parse(&self, rev: &str) -> String {
        git_stdout(self.path(), &["rev-parse", rev])
    }

    fn has_ref(&self, name: &str) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", name])
            .current_dir(self.path())
            .output()
            .expect("git rev-parse failed to execute")
            .status
            .success()
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        Command::new("git")
            .args(["merge-base", "--is-ancestor", ancestor, descendant])
            .current_dir(self.path())
            .output()
            .expect("git merge-base failed to execute")
            .status
            .success()
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git failed to execute");
    if !output.status.success() {
        panic!(
            "git {:?} failed:\n{}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git failed to execute");
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn init_writes_config_under_the_common_dir() {
    let repo = TestRepo::new();
    repo.init_braid();
    assert!(repo.path().join(".git/braid/config.toml").exists());
}

#[test]
fn commands_fail_before_init() {
    let repo = TestRepo::new();
    let err = commands::track(&repo.context(), None, None).unwrap_err();
    assert!(format!("{err:#}").contains("bd init"), "got: {err:#}");
}

#[test]
fn create_checks_out_and_tracks_a_new_branch() {
    let repo = TestRepo::new();
    repo.init_braid();

    std::fs::write(repo.path().join("feat.txt"), "feature\n").unwrap();
    commands::create(&repo.context(), "feat", Some("add feature"), true)
        .expect("create failed");

    assert_eq!(repo.current_branch(), "feat");
    assert!(repo.has_ref("refs/branch-metadata/feat"));
    // The commit landed on the new branch, not on trunk.
    assert_ne!(repo.rev_parse("feat"), repo.rev_parse("main"));
    assert!(repo.is_ancestor("main", "feat"));
}

#[test]
fn track_and_untrack_manage_the_metadata_ref() {
    let repo = TestRepo::new();
    repo.init_braid();

    run_git(repo.path(), &["checkout", "-b", "feat"]);
    repo.commit("feat.txt", "feature\n", "feature commit");

    commands::track(&repo.context(), Some("feat"), Some("main")).expect("track failed");
    assert!(repo.has_ref("refs/branch-metadata/feat"));

    commands::untrack(&repo.context(), Some("feat")).expect("untrack failed");
    assert!(!repo.has_ref("refs/branch-metadata/feat"));
}

#[test]
fn restack_carries_a_stack_over_new_trunk_commits() {
    let repo = TestRepo::new();
    repo.init_braid();

    std::fs::write(repo.path().join("one.txt"), "one\n").unwrap();
    commands::create(&repo.context(), "part-1", Some("part one"), true).unwrap();
    std::fs::write(repo.path().join("two.txt"), "two\n").unwrap();
    commands::create(&repo.context(), "part-2", Some("part two"), true).unwrap();

    repo.checkout("main");
    repo.commit("base.txt", "base\n", "trunk moves on");

    commands::restack(&repo.context(), Some("part-1"), false, false, false, false)
        .expect("restack failed");

    assert!(repo.is_ancestor("main", "part-1"));
    assert!(repo.is_ancestor("part-1", "part-2"));
}

#[test]
fn conflicted_restack_pauses_then_continue_finishes_the_stack() {
    let repo = TestRepo::new();
    repo.init_braid();

    std::fs::write(repo.path().join("shared.txt"), "feature\n").unwrap();
    commands::create(&repo.context(), "feat", Some("feature version"), true).unwrap();
    std::fs::write(repo.path().join("feat-only.txt"), "extra\n").unwrap();
    commands::create(&repo.context(), "feat-child", Some("child work"), true).unwrap();

    repo.checkout("main");
    repo.commit("shared.txt", "trunk\n", "conflicting trunk change");

    let err = commands::restack(&repo.context(), Some("feat"), false, false, false, false)
        .expect_err("restack should conflict");
    assert!(err.to_string().contains("bd continue"), "got: {err:#}");
    assert!(repo.path().join(".git/braid/continue.json").exists());

    // Resolve and resume; --all stages the resolution.
    std::fs::write(repo.path().join("shared.txt"), "merged\n").unwrap();
    commands::continue_op(&repo.context(), true).expect("continue failed");

    assert!(repo.is_ancestor("main", "feat"));
    assert!(repo.is_ancestor("feat", "feat-child"));
    assert!(!repo.path().join(".git/braid/continue.json").exists());
}

#[test]
fn abort_restores_the_paused_rebase() {
    let repo = TestRepo::new();
    repo.init_braid();

    std::fs::write(repo.path().join("shared.txt"), "feature\n").unwrap();
    commands::create(&repo.context(), "feat", Some("feature version"), true).unwrap();
    let feat_before = repo.rev_parse("feat");

    repo.checkout("main");
    repo.commit("shared.txt", "trunk\n", "conflicting trunk change");

    commands::restack(&repo.context(), Some("feat"), false, false, false, false)
        .expect_err("restack should conflict");
    commands::abort(&repo.context()).expect("abort failed");

    assert_eq!(repo.rev_parse("feat"), feat_before);
    // `main` was checked out when the restack started, so abort returns there.
    assert_eq!(repo.current_branch(), "main");
    assert!(!repo.path().join(".git/braid/continue.json").exists());
}

#[test]
fn delete_reparents_children_onto_the_grandparent() {
    let repo = TestRepo::new();
    repo.init_braid();

    std::fs::write(repo.path().join("mid.txt"), "mid\n").unwrap();
    commands::create(&repo.context(), "mid", Some("middle"), true).unwrap();
    std::fs::write(repo.path().join("leaf.txt"), "leaf\n").unwrap();
    commands::create(&repo.context(), "leaf", Some("leaf"), true).unwrap();

    commands::delete(&repo.context(), Some("mid")).expect("delete failed");

    assert!(!repo.has_ref("refs/heads/mid"));
    assert!(!repo.has_ref("refs/branch-metadata/mid"));
    // leaf still exists and its recorded parent is now trunk.
    assert!(repo.has_ref("refs/heads/leaf"));
    let meta = git_stdout(
        repo.path(),
        &["cat-file", "-p", "refs/branch-metadata/leaf"],
    );
    assert!(meta.contains("\"main\""), "got: {meta}");
}

#[test]
fn fold_merges_the_current_branch_into_its_parent() {
    let repo = TestRepo::new();
    repo.init_braid();

    std::fs::write(repo.path().join("one.txt"), "one\n").unwrap();
    commands::create(&repo.context(), "part-1", Some("part one"), true).unwrap();
    std::fs::write(repo.path().join("two.txt"), "two\n").unwrap();
    commands::create(&repo.context(), "part-2", Some("part two"), true).unwrap();
    let tip = repo.rev_parse("part-2");

    commands::fold(&repo.context(), false).expect("fold failed");

    assert!(!repo.has_ref("refs/heads/part-2"));
    assert_eq!(repo.rev_parse("part-1"), tip);
    assert_eq!(repo.current_branch(), "part-1");
}

#[test]
fn rename_moves_the_metadata_with_the_branch() {
    let repo = TestRepo::new();
    repo.init_braid();

    std::fs::write(repo.path().join("feat.txt"), "feature\n").unwrap();
    commands::create(&repo.context(), "feat", Some("feature"), true).unwrap();

    commands::rename(&repo.context(), "feature-auth").expect("rename failed");

    assert_eq!(repo.current_branch(), "feature-auth");
    assert!(repo.has_ref("refs/branch-metadata/feature-auth"));
    assert!(!repo.has_ref("refs/branch-metadata/feat"));
}

#[test]
fn squash_collapses_the_branch_to_one_commit() {
    let repo = TestRepo::new();
    repo.init_braid();

    std::fs::write(repo.path().join("one.txt"), "one\n").unwrap();
    commands::create(&repo.context(), "feat", Some("first"), true).unwrap();
    repo.commit("two.txt", "two\n", "second");
    repo.commit("three.txt", "three\n", "third");

    commands::squash(&repo.context(), Some("all of it")).expect("squash failed");

    let count = git_stdout(repo.path(), &["rev-list", "--count", "main..feat"]);
    assert_eq!(count, "1");
    let subject = git_stdout(repo.path(), &["log", "-1", "--format=%s", "feat"]);
    assert_eq!(subject, "all of it");
}
