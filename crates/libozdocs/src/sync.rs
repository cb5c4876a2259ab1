#[cfg(unix)]
use std::os::unix::fs::symlink;
#[cfg(windows)]
use std::os::windows::fs::symlink_dir as symlink;
use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use fs4::FileExt;
use tracing::{debug, info};

use crate::{
    error::Result,
    git,
    process::{Invocation, Runner},
};

/// Public repository holding the docs site generator environment.
pub const DOCS_REMOTE_URL: &str = "https://github.com/OpenZeppelin/docs.openzeppelin.com.git";

/// Branch of the docs repository prepared for local builds.
pub const DOCS_REMOTE_BRANCH: &str = "build-local";

/// Name of the build output directory, both in the caller's directory and the docs environment.
pub const BUILD_DIR_NAME: &str = "build";

/// Marker written inside the docs environment once dependencies are installed and the build dir is linked.
pub const INSTALLED_MARKER: &str = ".oz-docs-installed";

/// Where the docs environment is cloned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    /// Clone URL.
    pub url: String,
    /// Branch to check out.
    pub branch: String,
}

impl Default for Remote {
    fn default() -> Self {
        Self {
            url: DOCS_REMOTE_URL.to_string(),
            branch: DOCS_REMOTE_BRANCH.to_string(),
        }
    }
}

/// What a synchronization did to the docs environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The environment was cloned fresh and dependencies installed.
    Cloned,
    /// A pull moved the environment to a new revision and dependencies were reinstalled.
    Updated {
        /// Revision before the pull.
        from: String,
        /// Revision after the pull.
        to: String,
    },
    /// The revision was untouched but an earlier setup had not finished, so it was redone.
    Resumed,
    /// The pull left the revision untouched.
    Unchanged,
}

/// Holds the exclusive lock guarding clone/pull/symlink on one docs environment.
struct SyncLock {
    /// Locked file handle; the lock is released on drop.
    file: fs::File,
}

impl Drop for SyncLock {
    #[allow(clippy::let_underscore_must_use)]
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// A cached checkout of the docs generator environment.
#[derive(Debug, Clone)]
pub struct DocsEnvironment {
    /// Directory holding the clone.
    dir: PathBuf,
}

impl DocsEnvironment {
    /// Wrap the docs environment located at `dir` (which need not exist yet).
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory holding the clone.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a clone already exists on disk.
    pub fn exists(&self) -> bool {
        self.dir.exists()
    }

    /// Sibling lock file serializing concurrent synchronizations.
    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .dir
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("docs"));
        name.push(".lock");
        self.dir.with_file_name(name)
    }

    /// Acquire the exclusive synchronization lock, creating parent directories as needed.
    fn lock(&self) -> Result<SyncLock> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        file.lock_exclusive()?;
        Ok(SyncLock { file })
    }

    /// Whether a previous synchronization finished installing dependencies.
    pub fn is_installed(&self) -> bool {
        self.dir.join(INSTALLED_MARKER).is_file()
    }

    /// Ensure an up-to-date, dependency-installed clone exists.
    ///
    /// A missing clone is shallow-cloned from `remote`. An existing clone is
    /// pulled. Setup runs after a clone, after a pull that moved `HEAD`, and
    /// whenever the completion marker is absent: the environment's build
    /// directory is linked to `<invocation_dir>/build` and dependencies are
    /// installed, then the marker is written.
    pub fn sync(
        &self,
        remote: &Remote,
        invocation_dir: &Path,
        runner: &dyn Runner,
    ) -> Result<SyncOutcome> {
        let _lock = self.lock()?;

        let outcome = if self.exists() {
            let before = git::head_revision(&self.dir)?;
            git::pull(&self.dir)?;
            let after = git::head_revision(&self.dir)?;

            if before != after {
                info!(from = %before, to = %after, "docs environment updated");
                SyncOutcome::Updated {
                    from: before,
                    to: after,
                }
            } else if !self.is_installed() {
                info!(revision = %after, "docs environment setup incomplete, resuming");
                SyncOutcome::Resumed
            } else {
                debug!(revision = %after, "docs environment unchanged");
                return Ok(SyncOutcome::Unchanged);
            }
        } else {
            info!(url = %remote.url, dir = %self.dir.display(), "cloning docs environment");
            git::clone_shallow(&remote.url, &remote.branch, &self.dir, invocation_dir)?;
            SyncOutcome::Cloned
        };

        self.setup(invocation_dir, runner)?;
        Ok(outcome)
    }

    /// Link the build dir and install dependencies, recording completion last.
    fn setup(&self, invocation_dir: &Path, runner: &dyn Runner) -> Result<()> {
        let marker = self.dir.join(INSTALLED_MARKER);
        if let Err(e) = fs::remove_file(&marker)
            && e.kind() != ErrorKind::NotFound
        {
            return Err(e.into());
        }
        self.link_build_dir(invocation_dir)?;
        self.install_dependencies(runner)?;
        fs::write(&marker, "")?;
        Ok(())
    }

    /// Install the generator's package dependencies.
    fn install_dependencies(&self, runner: &dyn Runner) -> Result<()> {
        runner.run(&Invocation::new("npx", &self.dir).arg("yarn"))
    }

    /// Create `<invocation_dir>/build` and point the environment's build path at it.
    fn link_build_dir(&self, invocation_dir: &Path) -> Result<()> {
        let target = invocation_dir.join(BUILD_DIR_NAME);
        fs::create_dir_all(&target)?;
        let target = target.canonicalize()?;

        let link = self.dir.join(BUILD_DIR_NAME);
        if link.symlink_metadata().is_ok() {
            debug!(link = %link.display(), "build path already present, leaving it in place");
            return Ok(());
        }
        symlink(&target, &link)?;
        Ok(())
    }
}
