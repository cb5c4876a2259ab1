use std::{io, path::PathBuf, result::Result as StdResult};
use thiserror::Error;

/// Custom Result type for docs preview operations.
pub type Result<T> = StdResult<T, DocsError>;

/// Errors raised while preparing or running a docs preview.
#[derive(Error, Debug)]
pub enum DocsError {
    /// A child process exited with a non-zero status.
    #[error("Command exited with status code: {code}")]
    CommandExit {
        /// The process exit status code.
        code: i32,
    },

    /// A child process could not be started.
    #[error("Failed to run {program}: {source}")]
    CommandSpawn {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn failure.
        source: io::Error,
    },

    /// The component is not inside a Git working tree.
    #[error("Must be inside a git repository: {path}")]
    NotInRepository {
        /// Path the repository search started from.
        path: PathBuf,
    },

    /// The first positional argument did not name a known command.
    #[error("Unknown command {0}")]
    UnknownCommand(String),

    /// The base playbook could not be read, rewritten, or written.
    #[error("Playbook error: {0}")]
    Playbook(String),

    /// A captured git command failed.
    #[error("Git error: {0}")]
    GitError(String),

    /// The filesystem watcher could not be set up.
    #[error("Watch error: {0}")]
    Watch(String),

    /// An underlying I/O operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl DocsError {
    /// Return the recommended process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandExit { code } => *code,
            Self::CommandSpawn { source, .. } if source.kind() == io::ErrorKind::NotFound => 127,
            _ => 1,
        }
    }
}
