#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Core library for previewing a project's documentation component with the
//! OpenZeppelin docs site generator.
//!
//! A preview clones (or updates) the docs environment into a per-project cache
//! directory, injects the current project as an extra content source into the
//! generator's playbook, and then builds once or rebuilds on file changes.
//! The CLI binary in `crates/oz-docs` builds on top of this library.

/// Debounce timer collapsing bursts of events into one action.
pub mod debounce;
/// Build and watch orchestration over a composed playbook.
mod driver;
/// Error type shared by every operation.
mod error;
/// Helper routines for interacting with Git repositories.
mod git;
/// Output channel abstractions and implementations.
mod output;
/// Playbook loading, rewriting, and persistence.
pub mod playbook;
/// Child process invocation.
mod process;
/// Content source resolution for the previewed component.
mod source;
/// Docs environment clone and update.
mod sync;
/// Filesystem watching with per-trigger debouncing.
pub mod watch;
/// Per-project cache locations.
pub mod workspace;

pub use driver::{
    BUILD_SCRIPT, COMPONENT_PATTERNS, DISABLE_PREPARE_ENV, Driver, Mode, PREPARE_SCRIPT, Preview,
    PreviewOptions,
};
pub use error::{DocsError, Result};
pub use output::{Output, OutputError, Quiet, Terminal};
pub use process::{Inherit, Invocation, Runner};
pub use source::{CURRENT_CHECKOUT, ContentSource};
pub use sync::{
    BUILD_DIR_NAME, DOCS_REMOTE_BRANCH, DOCS_REMOTE_URL, DocsEnvironment, INSTALLED_MARKER, Remote,
    SyncOutcome,
};
