use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::{
    error::{DocsError, Result},
    process::{Inherit, Invocation, Runner},
};

/// Run a git command with the given arguments in the specified directory, capturing its output.
/// Returns the output if successful, otherwise returns an error with the full command details.
fn run_git(repo_path: &Path, args: &[&str]) -> Result<Output> {
    debug!(args = %args.join(" "), cwd = %repo_path.display(), "running git");
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .map_err(|source| DocsError::CommandSpawn {
            program: "git".to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DocsError::GitError(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(output)
}

/// Walk up from `start_dir` to find the nearest repository root containing a `.git` entry.
pub fn find_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// Return the commit currently checked out in `repo_path`.
pub fn head_revision(repo_path: &Path) -> Result<String> {
    let output = run_git(repo_path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Shallow-clone `branch` of `url` into `dest`, streaming git's output to the terminal.
pub fn clone_shallow(url: &str, branch: &str, dest: &Path, cwd: &Path) -> Result<()> {
    Inherit.run(
        &Invocation::new("git", cwd)
            .arg("clone")
            .arg(url)
            .arg(format!("--branch={branch}"))
            .arg("--depth=1")
            .arg(dest.as_os_str()),
    )
}

/// Pull the tracked branch in `repo_path`, streaming git's output to the terminal.
pub fn pull(repo_path: &Path) -> Result<()> {
    Inherit.run(&Invocation::new("git", repo_path).arg("pull"))
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use std::fs;

    /// Run git in `repo_path`, panicking on failure.
    pub(crate) fn git(repo_path: &Path, args: &[&str]) -> Output {
        match run_git(repo_path, args) {
            Ok(output) => output,
            Err(err) => panic!("git {args:?} failed: {err}"),
        }
    }

    /// Initialise a repository on `branch` with identity configured.
    pub(crate) fn init_repo(repo_path: &Path, branch: &str) {
        fs::create_dir_all(repo_path).expect("create repo dir");
        git(repo_path, &["init", "-b", branch]);
        git(repo_path, &["config", "user.email", "test@example.com"]);
        git(repo_path, &["config", "user.name", "Test User"]);
    }

    /// Write `name` with `contents` and commit it.
    pub(crate) fn commit_file(repo_path: &Path, name: &str, contents: &str) {
        let path = repo_path.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write file");
        git(repo_path, &["add", name]);
        git(repo_path, &["commit", "-m", &format!("Update {name}")]);
    }

    /// `file://` URL for a local repository, so shallow clones behave like remote ones.
    pub(crate) fn file_url(repo_path: &Path) -> String {
        format!("file://{}", repo_path.display())
    }
}
