//! End-to-end tests of the doctrace binary.

use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A command isolated from any user configuration.
fn doctrace(dir: &Path) -> Command {
    let config = dir.join("doctrace.toml");
    if !config.exists() {
        fs::write(&config, "").unwrap();
    }
    let mut cmd = Command::cargo_bin("doctrace").unwrap();
    cmd.arg("--cwd")
        .arg(dir)
        .arg("--config")
        .arg(&config)
        .env_remove("DOCTRACE_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn git(dir: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

mod help {
    use super::*;

    #[test]
    fn describes_changelog() {
        let dir = TempDir::new().unwrap();
        doctrace(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("changelog"));
    }

    #[test]
    fn completion_bash() {
        let dir = TempDir::new().unwrap();
        doctrace(dir.path())
            .args(["completion", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("doctrace"));
    }

    #[test]
    fn unknown_command_fails() {
        let dir = TempDir::new().unwrap();
        doctrace(dir.path()).arg("frobnicate").assert().failure();
    }
}

mod file_commands {
    use super::*;

    #[test]
    fn insert_from_entry_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("CHANGELOG.md"),
            "## [Unreleased]\n\n## 2024-01-01\n- old\n",
        )
        .unwrap();
        fs::write(dir.path().join("entry.md"), "- new change\n").unwrap();

        doctrace(dir.path())
            .args(["insert", "--file", "CHANGELOG.md", "--entry-file", "entry.md"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Inserted entry"));

        assert_eq!(
            fs::read_to_string(dir.path().join("CHANGELOG.md")).unwrap(),
            "## [Unreleased]\n- new change\n\n## 2024-01-01\n- old\n"
        );
    }

    #[test]
    fn insert_from_stdin_uses_configured_path() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("doctrace.toml"),
            "[repository]\nchangelog_path = \"docs/CHANGES.md\"\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();

        doctrace(dir.path())
            .arg("insert")
            .write_stdin("- from stdin\n")
            .assert()
            .success();

        assert_eq!(
            fs::read_to_string(dir.path().join("docs/CHANGES.md")).unwrap(),
            "## [Unreleased]\n- from stdin\n\n"
        );
    }

    #[test]
    fn insert_empty_entry_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("CHANGELOG.md"), "## [Unreleased]\n").unwrap();

        doctrace(dir.path())
            .arg("insert")
            .write_stdin("\n  \n")
            .assert()
            .failure()
            .stderr(predicate::str::contains("empty"));

        assert_eq!(
            fs::read_to_string(dir.path().join("CHANGELOG.md")).unwrap(),
            "## [Unreleased]\n"
        );
    }

    #[test]
    fn release_with_date() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("CHANGELOG.md"), "## [Unreleased]\n- a\n\n").unwrap();

        doctrace(dir.path())
            .args(["release", "--date", "2024-06-01"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Released 2024-06-01"));

        assert_eq!(
            fs::read_to_string(dir.path().join("CHANGELOG.md")).unwrap(),
            "## 2024-06-01\n- a\n\n## [Unreleased]\n\n"
        );
    }

    #[test]
    fn release_without_unreleased_is_noop() {
        let dir = TempDir::new().unwrap();
        let doc = "## 2024-01-01\n- old\n";
        fs::write(dir.path().join("CHANGELOG.md"), doc).unwrap();

        doctrace(dir.path())
            .args(["release", "--date", "2024-06-01"])
            .assert()
            .success()
            .stdout(predicate::str::contains("nothing to do"));

        assert_eq!(fs::read_to_string(dir.path().join("CHANGELOG.md")).unwrap(), doc);
    }

    #[test]
    fn duplicate_unreleased_fails_untouched() {
        let dir = TempDir::new().unwrap();
        let doc = "## [Unreleased]\n- a\n## [Unreleased]\n- b\n";
        fs::write(dir.path().join("CHANGELOG.md"), doc).unwrap();

        doctrace(dir.path())
            .args(["release", "--date", "2024-06-01"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("malformed changelog"));

        assert_eq!(fs::read_to_string(dir.path().join("CHANGELOG.md")).unwrap(), doc);
    }
}

mod repository_commands {
    use super::*;

    fn repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-q", "-b", "main"]);
        fs::write(dir.path().join("a.txt"), "one\n").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-q", "-m", "first"]);
        fs::write(dir.path().join("a.txt"), "two\n").unwrap();
        fs::write(dir.path().join("b.txt"), "new\n").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-q", "-m", "second"]);
        dir
    }

    #[test]
    fn diff_name_only() {
        let dir = repo();
        doctrace(dir.path())
            .args(["diff", "HEAD~1", "HEAD", "--name-only"])
            .assert()
            .success()
            .stdout("a.txt\nb.txt\n");
    }

    #[test]
    fn diff_patch() {
        let dir = repo();
        doctrace(dir.path())
            .args(["diff", "HEAD~1", "HEAD"])
            .assert()
            .success()
            .stdout(predicate::str::contains("-one").and(predicate::str::contains("+two")));
    }

    #[test]
    fn diff_unknown_revision_fails() {
        let dir = repo();
        doctrace(dir.path())
            .args(["diff", "HEAD", "no-such-branch"])
            .assert()
            .failure()
            .stderr(predicate::str::starts_with("error:"));
    }
}
