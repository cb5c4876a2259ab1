use std::{
    fs,
    path::{Path, PathBuf},
};

use serde_yml::Value;
use tracing::debug;

use crate::{
    error::{DocsError, Result},
    source::ContentSource,
};

/// Checked-in playbook of the docs environment.
pub const BASE_PLAYBOOK: &str = "playbook.yml";

/// Derived playbook written before every build.
pub const LOCAL_PLAYBOOK: &str = "local-playbook.yml";

/// A generator playbook held as a generic YAML document.
#[derive(Debug, Clone, PartialEq)]
pub struct Playbook {
    /// Parsed document root.
    document: Value,
}

impl Playbook {
    /// Parse a playbook from YAML text.
    pub fn parse(text: &str) -> Result<Self> {
        let document: Value = serde_yml::from_str(text)
            .map_err(|e| DocsError::Playbook(format!("invalid YAML: {e}")))?;
        if !document.is_mapping() {
            return Err(DocsError::Playbook(
                "playbook root must be a mapping".to_string(),
            ));
        }
        Ok(Self { document })
    }

    /// Read a playbook file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            DocsError::Playbook(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// The `content.sources` sequence, if present.
    pub fn sources(&self) -> Option<&Vec<Value>> {
        self.document
            .get("content")?
            .get("sources")?
            .as_sequence()
    }

    /// Replace the content sources with the primary source followed by `source`.
    pub fn with_local_source(mut self, source: &ContentSource) -> Result<Self> {
        let primary = self
            .sources()
            .and_then(|sources| sources.first())
            .cloned()
            .ok_or_else(|| {
                DocsError::Playbook("playbook has no content.sources entries".to_string())
            })?;
        let local = serde_yml::to_value(source)
            .map_err(|e| DocsError::Playbook(format!("failed to encode source: {e}")))?;

        let content = self
            .document
            .get_mut("content")
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| DocsError::Playbook("content must be a mapping".to_string()))?;
        content.insert(
            Value::String("sources".to_string()),
            Value::Sequence(vec![primary, local]),
        );
        Ok(self)
    }

    /// Serialize back to YAML text.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yml::to_string(&self.document)
            .map_err(|e| DocsError::Playbook(format!("failed to encode playbook: {e}")))
    }
}

/// Derive the local playbook for `source` inside `docs_dir` and return its path.
///
/// The base playbook is only read; the derived file is rewritten on every call.
pub fn compose(docs_dir: &Path, source: &ContentSource) -> Result<PathBuf> {
    let playbook = Playbook::load(&docs_dir.join(BASE_PLAYBOOK))?.with_local_source(source)?;
    let local = docs_dir.join(LOCAL_PLAYBOOK);
    fs::write(&local, playbook.to_yaml()?).map_err(|e| {
        DocsError::Playbook(format!("failed to write {}: {e}", local.display()))
    })?;
    debug!(path = %local.display(), "wrote local playbook");
    Ok(local)
}
