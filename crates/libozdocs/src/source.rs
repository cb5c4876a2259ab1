use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{DocsError, Result},
    git,
};

/// Branch sentinel telling the generator to use whatever is checked out.
pub const CURRENT_CHECKOUT: &str = "HEAD";

/// A content source entry pointing the generator at the current project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSource {
    /// Repository root on the local filesystem.
    pub url: String,
    /// Component path relative to the repository root; empty for the root itself.
    pub start_path: String,
    /// Branch selector, always [`CURRENT_CHECKOUT`].
    pub branches: String,
}

impl ContentSource {
    /// Build the source for `component`, searching upward from it for the repository root.
    pub fn for_component(component: &Path) -> Result<Self> {
        let component = component
            .canonicalize()
            .map_err(|_| DocsError::NotInRepository {
                path: component.to_path_buf(),
            })?;
        let repo_dir = git::find_root(&component).ok_or_else(|| DocsError::NotInRepository {
            path: component.clone(),
        })?;

        let start_path = component
            .strip_prefix(&repo_dir)
            .map_err(|_| DocsError::NotInRepository {
                path: component.clone(),
            })?;
        Ok(Self {
            url: repo_dir.to_string_lossy().into_owned(),
            start_path: start_path.to_string_lossy().into_owned(),
            branches: CURRENT_CHECKOUT.to_string(),
        })
    }
}
