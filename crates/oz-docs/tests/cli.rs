// Integration tests are compiled as a separate crate, so these lints don't apply
#![allow(clippy::tests_outside_test_module)]
#![allow(missing_docs)]

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use anyhow::{Context, Result, ensure};
use tempfile::TempDir;

/// Return the path to the compiled `oz-docs` binary.
fn oz_docs_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_oz-docs"))
}

/// Run `oz-docs` in `cwd` with a private cache directory.
fn run_oz_docs(cwd: &Path, cache_dir: &Path, args: &[&str]) -> Result<Output> {
    Command::new(oz_docs_binary())
        .current_dir(cwd)
        .env_remove("OZ_DOCS_DIR")
        .arg("--no-color")
        .arg("--dir")
        .arg(cache_dir)
        .args(args)
        .output()
        .with_context(|| format!("failed to run oz-docs {}", args.join(" ")))
}

/// Run a git command inside `repo_path`, ensuring it succeeds.
fn git(repo_path: &Path, args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;
    ensure!(
        output.status.success(),
        "git command failed: git {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(())
}

#[test]
fn test_unknown_command_exits_1() -> Result<()> {
    let work = TempDir::new()?;
    let cache = TempDir::new()?;

    let output = run_oz_docs(work.path(), cache.path(), &["foo"])?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("Unknown command foo"), "stderr: {stderr}");
    // Nothing was cloned or created.
    assert_eq!(fs::read_dir(cache.path())?.count(), 0);
    assert!(!work.path().join("build").exists());
    Ok(())
}

#[test]
fn test_outside_repository_fails_before_sync() -> Result<()> {
    let work = TempDir::new()?;
    let cache = TempDir::new()?;

    let output = run_oz_docs(work.path(), cache.path(), &["build"])?;
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr.contains("Must be inside a git repository"),
        "stderr: {stderr}"
    );
    assert_eq!(fs::read_dir(cache.path())?.count(), 0);
    Ok(())
}

#[test]
fn test_missing_component_fails() -> Result<()> {
    let work = TempDir::new()?;
    let cache = TempDir::new()?;
    git(work.path(), &["init"])?;

    let output = run_oz_docs(work.path(), cache.path(), &["-c", "no-such-dir", "build"])?;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(fs::read_dir(cache.path())?.count(), 0);
    Ok(())
}

#[test]
fn test_help_mentions_commands() -> Result<()> {
    let output = Command::new(oz_docs_binary()).arg("--help").output()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("build or watch"), "stdout: {stdout}");
    assert!(stdout.contains("-c, --component"), "stdout: {stdout}");
    Ok(())
}
