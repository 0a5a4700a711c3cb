//! End-to-end tests for the `sitepush` binary.
//!
//! Every invocation gets its own HOME and an explicit global config file so
//! the developer's own configuration never leaks in. Publishing uses the
//! local store; nothing here talks to the network.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use sitepush::core::types::BranchName;
use sitepush::forge::local::LocalForge;

// =============================================================================
// Test Fixtures
// =============================================================================

/// Isolated home, working directory and global config.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        fs::create_dir_all(dir.path().join("home")).unwrap();
        fs::create_dir_all(dir.path().join("work")).unwrap();
        let sandbox = Self { dir };
        sandbox.global_config(
            r#"
            [author]
            name = "Mona"
            email = "mona@example.com"
            "#,
        );
        sandbox
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn work(&self) -> PathBuf {
        self.path().join("work")
    }

    fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    fn global_config(&self, contents: &str) {
        fs::write(self.config_path(), contents).unwrap();
    }

    fn file(&self, relative: &str, contents: &str) {
        self.dir
            .child("work")
            .child(relative)
            .write_str(contents)
            .unwrap();
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("sitepush").unwrap();
        cmd.current_dir(self.work())
            .env("HOME", self.path().join("home"))
            .env_remove("SITEPUSH_CONFIG")
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("SITEPUSH_LOG")
            .env_remove("SITEPUSH_LOG_FORMAT")
            .env_remove("GITHUB_TOKEN")
            .arg("--config")
            .arg(self.config_path());
        cmd
    }
}

// =============================================================================
// publish
// =============================================================================

#[test]
fn publish_to_local_store_prints_commit_id() {
    let sandbox = Sandbox::new();
    sandbox.file("public/index.html", "<h1>hi</h1>");
    sandbox.file("public/css/site.css", "body {}");
    let store = sandbox.path().join("site.git");

    let assert = sandbox
        .cmd()
        .args(["-q", "publish", "public", "--store", "local", "--local-repo"])
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[0-9a-f]{40}\n$").unwrap());

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let forge = LocalForge::open_or_init(&store).unwrap();
    let branch = BranchName::new("gh-pages").unwrap();
    let target = forge.ref_target(&branch).unwrap().unwrap();
    assert_eq!(target.as_str(), stdout.trim());
}

#[test]
fn publish_summary_names_branch_and_counts() {
    let sandbox = Sandbox::new();
    sandbox.file("public/index.html", "<h1>hi</h1>");
    sandbox.file("public/a/b.html", "b");
    let store = sandbox.path().join("site.git");

    sandbox
        .cmd()
        .args(["publish", "public", "--branch", "site", "--store", "local"])
        .arg("--local-repo")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("to site (2 files, 2 trees)"));
}

#[test]
fn publish_empty_directory_fails() {
    let sandbox = Sandbox::new();
    fs::create_dir_all(sandbox.work().join("public/empty")).unwrap();
    let store = sandbox.path().join("site.git");

    sandbox
        .cmd()
        .args(["publish", "public", "--store", "local", "--local-repo"])
        .arg(&store)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to publish"));

    let forge = LocalForge::open_or_init(&store).unwrap();
    let branch = BranchName::new("gh-pages").unwrap();
    assert_eq!(forge.ref_target(&branch).unwrap(), None);
}

#[test]
fn publish_missing_directory_fails() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["publish", "nope", "--store", "local", "--local-repo", "x.git"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn publish_to_github_without_repo_fails() {
    let sandbox = Sandbox::new();
    sandbox.file("public/index.html", "hi");

    sandbox
        .cmd()
        .args(["publish", "public"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Repository not set"));
}

#[test]
fn publish_rejects_invalid_branch() {
    let sandbox = Sandbox::new();
    sandbox.file("public/index.html", "hi");

    sandbox
        .cmd()
        .args(["publish", "public", "--store", "local", "--local-repo", "x.git"])
        .args(["--branch", "bad..name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid branch name"));
}

#[test]
fn publish_concurrency_flag_is_bounded() {
    let sandbox = Sandbox::new();
    sandbox.file("public/index.html", "hi");
    let store = sandbox.path().join("site.git");

    for value in ["0", "65"] {
        sandbox
            .cmd()
            .args(["publish", "public", "--store", "local", "--concurrency", value])
            .arg("--local-repo")
            .arg(&store)
            .assert()
            .failure()
            .stderr(predicate::str::contains("--concurrency must be between 1 and 64"));
    }

    sandbox
        .cmd()
        .args(["-q", "publish", "public", "--store", "local", "--concurrency", "64"])
        .arg("--local-repo")
        .arg(&store)
        .assert()
        .success();
}

// =============================================================================
// config
// =============================================================================

#[test]
fn config_get_reports_defaults() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "get", "publish.concurrency"])
        .assert()
        .success()
        .stdout("8\n");

    sandbox
        .cmd()
        .args(["config", "get", "branch"])
        .assert()
        .success()
        .stdout("gh-pages\n");
}

#[test]
fn config_get_unknown_key_fails() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "get", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bogus"));
}

#[test]
fn config_init_writes_site_file() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "init", "--owner", "octocat", "--repo", "octocat.github.io"])
        .args(["--branch", "master", "--source-branch", "source"])
        .assert()
        .success();

    let written = sandbox.dir.child("work/sitepush.toml");
    written.assert(predicate::str::contains("owner = \"octocat\""));
    written.assert(predicate::str::contains("source_branch = \"source\""));

    sandbox
        .cmd()
        .args(["config", "get", "branch"])
        .assert()
        .success()
        .stdout("master\n");

    // A second init without --force leaves the file alone.
    sandbox
        .cmd()
        .args(["config", "init", "--owner", "someone", "--repo", "else"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    sandbox
        .cmd()
        .args(["config", "get", "owner"])
        .assert()
        .success()
        .stdout("octocat\n");
}

#[test]
fn config_list_shows_sources() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# global: "))
        .stdout(predicate::str::contains("# site: (none)"))
        .stdout(predicate::str::contains("author.name = Mona"));
}

#[test]
fn invalid_global_config_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.global_config(
        r#"
        [publish]
        concurrency = 0
        "#,
    );

    sandbox
        .cmd()
        .args(["config", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

// =============================================================================
// auth
// =============================================================================

#[test]
fn auth_status_without_token() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["-q", "auth", "--status"])
        .assert()
        .stdout(predicate::str::contains("not_authenticated"));
}
