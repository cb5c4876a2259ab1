use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Instant,
};

use tracing::info;

use crate::{
    error::{DocsError, Result},
    output::Output,
    playbook,
    process::{Invocation, Runner},
    source::ContentSource,
    sync::{BUILD_DIR_NAME, DocsEnvironment, Remote, SyncOutcome},
    watch::{Trigger, WatchSession},
    workspace,
};

/// Environment flag that stops the generator from preparing sources itself.
pub const DISABLE_PREPARE_ENV: &str = "DISABLE_PREPARE_DOCS";

/// Generator script building the site from a playbook.
pub const BUILD_SCRIPT: &str = "build:custom";

/// Project script regenerating documentation sources.
pub const PREPARE_SCRIPT: &str = "prepare-docs";

/// Patterns, relative to the component, that trigger a rebuild in watch mode.
pub const COMPONENT_PATTERNS: [&str; 2] = ["**/*.yml", "**/*.adoc"];

/// What the tool was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Build the preview once.
    #[default]
    Build,
    /// Rebuild on changes until interrupted.
    Watch,
}

impl FromStr for Mode {
    type Err = DocsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "build" => Ok(Self::Build),
            "watch" => Ok(Self::Watch),
            other => Err(DocsError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => f.write_str("build"),
            Self::Watch => f.write_str("watch"),
        }
    }
}

/// Inputs for preparing a preview.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    /// Directory the tool was invoked from.
    pub cwd: PathBuf,
    /// Component to preview, relative to `cwd` or absolute.
    pub component: PathBuf,
    /// Root directory holding cached docs environments.
    pub cache_root: PathBuf,
    /// Where to clone the docs environment from.
    pub remote: Remote,
}

/// A project component resolved against its cached docs environment.
#[derive(Debug)]
pub struct Preview {
    /// Directory the tool was invoked from.
    cwd: PathBuf,
    /// Absolute component directory.
    component: PathBuf,
    /// Content source describing the component.
    source: ContentSource,
    /// Cached docs environment for `cwd`.
    docs: DocsEnvironment,
    /// Where to clone the docs environment from.
    remote: Remote,
}

impl Preview {
    /// Resolve the component's content source and locate the docs environment.
    ///
    /// Fails before touching the filesystem when the component is not inside
    /// a Git working tree.
    pub fn new(options: PreviewOptions) -> Result<Self> {
        let component = options.cwd.join(&options.component);
        let source = ContentSource::for_component(&component)?;
        let docs = DocsEnvironment::new(workspace::workspace_path(
            &options.cache_root,
            &options.cwd,
        ));
        Ok(Self {
            cwd: options.cwd,
            component,
            source,
            docs,
            remote: options.remote,
        })
    }

    /// Content source for the component.
    pub fn source(&self) -> &ContentSource {
        &self.source
    }

    /// Cached docs environment.
    pub fn docs(&self) -> &DocsEnvironment {
        &self.docs
    }

    /// Clone or update the docs environment.
    pub fn sync(&self, runner: &dyn Runner) -> Result<SyncOutcome> {
        self.docs.sync(&self.remote, &self.cwd, runner)
    }

    /// Write the local playbook and return a driver bound to it.
    pub fn driver<'r>(&self, runner: &'r dyn Runner) -> Result<Driver<'r>> {
        let playbook = playbook::compose(self.docs.dir(), &self.source)?;
        Ok(Driver {
            docs_dir: self.docs.dir().to_path_buf(),
            cwd: self.cwd.clone(),
            component: self.component.clone(),
            playbook,
            runner,
            prepare_disabled: false,
        })
    }
}

/// Runs builds and watch sessions against a composed playbook.
pub struct Driver<'r> {
    /// Docs environment directory.
    docs_dir: PathBuf,
    /// Directory the tool was invoked from.
    cwd: PathBuf,
    /// Absolute component directory.
    component: PathBuf,
    /// Composed local playbook.
    playbook: PathBuf,
    /// Executes child processes.
    runner: &'r dyn Runner,
    /// Whether children are told to skip automatic source preparation.
    prepare_disabled: bool,
}

impl<'r> Driver<'r> {
    /// Path of the composed playbook.
    pub fn playbook(&self) -> &Path {
        &self.playbook
    }

    /// Apply the driver-wide environment to an invocation.
    fn invocation(&self, program: &str, cwd: &Path) -> Invocation {
        let invocation = Invocation::new(program, cwd);
        if self.prepare_disabled {
            invocation.env(DISABLE_PREPARE_ENV, "true")
        } else {
            invocation
        }
    }

    /// Build the site once from the composed playbook.
    pub fn build(&self) -> Result<()> {
        info!(playbook = %self.playbook.display(), "building docs");
        self.runner.run(
            &self
                .invocation("npm", &self.docs_dir)
                .args(["run", BUILD_SCRIPT])
                .arg(self.playbook.as_os_str()),
        )
    }

    /// Regenerate the project's documentation sources.
    pub fn prepare(&self) -> Result<()> {
        info!("preparing docs sources");
        self.runner.run(
            &self
                .invocation("npm", &self.cwd)
                .args(["run", PREPARE_SCRIPT]),
        )
    }

    /// Build the watch session: `patterns` rerun source preparation, component
    /// documents rerun the build. Each armed trigger runs once at start.
    pub fn watch_session(&mut self, patterns: &[String]) -> Result<WatchSession<'_>> {
        self.prepare_disabled = true;
        let this: &Self = self;
        let build_dir = this.cwd.join(BUILD_DIR_NAME);

        let mut session = WatchSession::new();
        if !patterns.is_empty() {
            session.add(
                Trigger::new(PREPARE_SCRIPT, &this.cwd, patterns, move || this.prepare())?
                    .ignore(&build_dir),
            );
        }
        let component_patterns: Vec<String> =
            COMPONENT_PATTERNS.iter().map(|p| p.to_string()).collect();
        session.add(
            Trigger::new("build", &this.component, &component_patterns, move || this.build())?
                .ignore(&build_dir),
        );
        session.arm_all(Instant::now());
        Ok(session)
    }

    /// Watch for changes and rebuild until the process is interrupted.
    pub fn watch(&mut self, patterns: &[String], output: &dyn Output) -> Result<()> {
        let session = self.watch_session(patterns)?;
        session.run(output)
    }
}
