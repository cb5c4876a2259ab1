use std::{
    iter,
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError},
    time::Instant,
};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::{
    debounce::Debouncer,
    error::{DocsError, Result},
    output::Output,
};

/// Action run when a trigger fires.
type Action<'a> = Box<dyn FnMut() -> Result<()> + 'a>;

/// A set of path patterns tied to a debounced action.
pub struct Trigger<'a> {
    /// Label used in messages.
    name: String,
    /// Directory the patterns are relative to.
    base: PathBuf,
    /// Compiled relative patterns, matched against paths below `base`.
    relative: GlobSet,
    /// Compiled absolute patterns, matched against full paths.
    absolute: GlobSet,
    /// Literal directories of absolute patterns, watched alongside `base`.
    roots: Vec<PathBuf>,
    /// Paths under these prefixes never match.
    ignored: Vec<PathBuf>,
    /// Pending-run timer.
    debouncer: Debouncer,
    /// Work to perform once events settle.
    action: Action<'a>,
}

impl<'a> Trigger<'a> {
    /// Create a trigger matching `patterns` relative to `base`.
    ///
    /// A leading `./` is dropped. Patterns that are absolute or climb out of
    /// `base` with `..` are matched against full paths.
    pub fn new<F>(name: &str, base: &Path, patterns: &[String], action: F) -> Result<Self>
    where
        F: FnMut() -> Result<()> + 'a,
    {
        let base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
        let mut relative = Vec::new();
        let mut absolute = Vec::new();
        let mut roots: Vec<PathBuf> = Vec::new();
        for pattern in patterns {
            match resolve(&base, pattern) {
                Pattern::Relative(glob) => relative.push(glob),
                Pattern::Absolute { glob, root } => {
                    if !roots.contains(&root) {
                        roots.push(root);
                    }
                    absolute.push(glob);
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            base,
            relative: compile(&relative)?,
            absolute: compile(&absolute)?,
            roots,
            ignored: Vec::new(),
            debouncer: Debouncer::default(),
            action: Box::new(action),
        })
    }

    /// Exclude everything under `path` from matching.
    pub fn ignore(mut self, path: &Path) -> Self {
        self.ignored
            .push(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));
        self
    }

    /// Whether `path` (absolute) matches one of the patterns.
    ///
    /// A path also matches when one of its parent directories does, so a
    /// bare directory pattern covers everything beneath it.
    pub fn matches(&self, path: &Path) -> bool {
        if self.ignored.iter().any(|p| path.starts_with(p)) {
            return false;
        }
        if path.ancestors().any(|p| self.absolute.is_match(p)) {
            return true;
        }
        let Ok(relative) = path.strip_prefix(&self.base) else {
            return false;
        };
        relative
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| self.relative.is_match(p))
    }

    /// Schedule a run at `now` plus the debounce delay.
    pub fn arm(&mut self, now: Instant) {
        self.debouncer.touch(now);
    }
}

/// A watch pattern normalized against its trigger's base.
#[derive(Debug, PartialEq, Eq)]
enum Pattern {
    /// Glob matched against paths below the base.
    Relative(String),
    /// Glob matched against full paths, with the literal directory to watch.
    Absolute {
        /// Full-path glob.
        glob: String,
        /// Deepest directory free of glob syntax.
        root: PathBuf,
    },
}

/// Whether a path segment contains glob syntax.
fn has_glob(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}

/// Normalize `pattern` against `base`.
///
/// Leading `./` segments are dropped. Patterns that are absolute or contain
/// `..` have their literal leading segments resolved lexically into a
/// directory, and the remaining glob is appended to it.
fn resolve(base: &Path, pattern: &str) -> Pattern {
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    let is_absolute = Path::new(pattern).is_absolute();
    if !is_absolute && !pattern.split('/').any(|segment| segment == "..") {
        return Pattern::Relative(pattern.to_string());
    }

    let mut root = if is_absolute {
        PathBuf::from("/")
    } else {
        base.to_path_buf()
    };
    let mut segments = pattern.split('/').filter(|s| !s.is_empty()).peekable();
    while let Some(segment) = segments.next_if(|s| !has_glob(s)) {
        match segment {
            "." => {}
            ".." => {
                root.pop();
            }
            literal => root.push(literal),
        }
    }
    let rest: Vec<&str> = segments.collect();

    let prefix = globset::escape(&root.to_string_lossy());
    if rest.is_empty() {
        let root = root.parent().map(Path::to_path_buf).unwrap_or(root);
        return Pattern::Absolute { glob: prefix, root };
    }
    let separator = if prefix.ends_with('/') { "" } else { "/" };
    Pattern::Absolute {
        glob: format!("{prefix}{separator}{}", rest.join("/")),
        root,
    }
}

/// Compile glob patterns; `*` does not cross directory separators.
fn compile(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| DocsError::Watch(format!("invalid pattern '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| DocsError::Watch(format!("invalid patterns: {e}")))
}

/// Whether a filesystem event represents a content change worth reacting to.
fn is_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// A group of triggers sharing one filesystem watcher and one event loop.
#[derive(Default)]
pub struct WatchSession<'a> {
    /// Registered triggers, each with its own timer.
    triggers: Vec<Trigger<'a>>,
}

impl<'a> WatchSession<'a> {
    /// Create an empty session.
    pub fn new() -> Self {
        Self {
            triggers: Vec::new(),
        }
    }

    /// Register a trigger.
    pub fn add(&mut self, trigger: Trigger<'a>) {
        self.triggers.push(trigger);
    }

    /// Arm every trigger once, as if each had just seen an event.
    pub fn arm_all(&mut self, now: Instant) {
        for trigger in &mut self.triggers {
            trigger.arm(now);
        }
    }

    /// Directories to watch recursively, without nested duplicates.
    ///
    /// Covers every trigger's base and the literal directories of its absolute patterns.
    pub fn roots(&self) -> Vec<PathBuf> {
        let mut bases: Vec<PathBuf> = self
            .triggers
            .iter()
            .flat_map(|t| iter::once(&t.base).chain(&t.roots))
            .cloned()
            .collect();
        bases.sort_by_key(|b| b.components().count());
        let mut roots: Vec<PathBuf> = Vec::new();
        for base in bases {
            if !roots.iter().any(|root| base.starts_with(root)) {
                roots.push(base);
            }
        }
        roots
    }

    /// Restart the timer of every trigger matching one of the event's paths.
    pub fn handle_event(&mut self, event: &Event, now: Instant) {
        if !is_change(event) {
            return;
        }
        for trigger in &mut self.triggers {
            if event.paths.iter().any(|path| trigger.matches(path)) {
                debug!(trigger = %trigger.name, paths = ?event.paths, "change detected");
                trigger.debouncer.touch(now);
            }
        }
    }

    /// Earliest pending deadline across all triggers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.triggers
            .iter()
            .filter_map(|t| t.debouncer.deadline())
            .min()
    }

    /// Run every trigger whose timer has elapsed, returning how many ran.
    ///
    /// Action failures are reported and do not stop the session.
    pub fn fire_due(&mut self, now: Instant, output: &dyn Output) -> usize {
        let mut fired = 0;
        for trigger in &mut self.triggers {
            if !trigger.debouncer.fire(now) {
                continue;
            }
            fired += 1;
            if let Err(err) = (trigger.action)() {
                warn!(trigger = %trigger.name, error = %err, "watch action failed");
                if let Err(output_err) = output.warn(&format!("{} failed: {err}", trigger.name)) {
                    warn!(error = %output_err, "failed to report watch failure");
                }
            }
        }
        fired
    }

    /// Watch the filesystem and dispatch triggers until the watcher stops.
    pub fn run(mut self, output: &dyn Output) -> Result<()> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher =
            notify::recommended_watcher(tx).map_err(|e| DocsError::Watch(e.to_string()))?;
        for root in self.roots() {
            if !root.is_dir() {
                warn!(root = %root.display(), "not a directory, skipping");
                continue;
            }
            debug!(root = %root.display(), "watching");
            watcher
                .watch(&root, RecursiveMode::Recursive)
                .map_err(|e| DocsError::Watch(format!("{}: {e}", root.display())))?;
        }

        loop {
            self.fire_due(Instant::now(), output);

            let received = match self.next_deadline() {
                Some(deadline) => {
                    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Ok(event)) => self.handle_event(&event, Instant::now()),
                Ok(Err(err)) => warn!(error = %err, "watcher reported an error"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(DocsError::Watch("watcher stopped".to_string()));
                }
            }
        }
    }
}
