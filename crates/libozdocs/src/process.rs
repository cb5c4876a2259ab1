use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use tracing::debug;

use crate::error::{DocsError, Result};

/// A child process to run with the terminal's streams attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Working directory for the child.
    pub cwd: PathBuf,
    /// Extra environment variables set for the child.
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    /// Start building an invocation of `program` inside `cwd`.
    pub fn new(program: &str, cwd: &Path) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            envs: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    /// Render the command line for diagnostics.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// Executes child processes on behalf of the synchronizer and driver.
pub trait Runner: Send + Sync {
    /// Run `invocation` to completion, failing if it exits non-zero.
    fn run(&self, invocation: &Invocation) -> Result<()>;
}

/// Runner that streams the child's output live to the invoking terminal.
pub struct Inherit;

impl Runner for Inherit {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        debug!(
            command = %invocation.display(),
            cwd = %invocation.cwd.display(),
            "spawning child process"
        );
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| DocsError::CommandSpawn {
                program: invocation.program.clone(),
                source,
            })?;

        if !status.success() {
            let code = status.code().unwrap_or(1);
            debug!(command = %invocation.display(), code, "child process failed");
            return Err(DocsError::CommandExit { code });
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_inherit_success() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        Inherit.run(&Invocation::new("true", dir.path()))?;
        Ok(())
    }

    #[test]
    fn test_inherit_propagates_exit_code() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let result = Inherit.run(&Invocation::new("sh", dir.path()).args(["-c", "exit 7"]));
        assert!(matches!(result, Err(DocsError::CommandExit { code: 7 })));
        Ok(())
    }

    #[test]
    fn test_inherit_passes_environment() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let invocation = Invocation::new("sh", dir.path())
            .args(["-c", "test \"$DISABLE_PREPARE_DOCS\" = true"])
            .env("DISABLE_PREPARE_DOCS", "true");
        Inherit.run(&invocation)?;
        Ok(())
    }

    #[test]
    fn test_missing_program() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let result = Inherit.run(&Invocation::new("oz-docs-no-such-program", dir.path()));
        let err = result.expect_err("program should not exist");
        assert_eq!(err.exit_code(), 127);
        Ok(())
    }

    #[test]
    fn test_display() {
        let invocation = Invocation::new("npm", Path::new("/tmp"))
            .args(["run", "build:custom"])
            .arg("local-playbook.yml");
        assert_eq!(invocation.display(), "npm run build:custom local-playbook.yml");
    }
}
