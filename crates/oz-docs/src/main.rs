#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Command-line interface for previewing documentation components via the libozdocs crate.

use std::{
    env,
    io::{self, IsTerminal, Write},
    path::PathBuf,
    process,
    result::Result as StdResult,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{ArgAction, ArgGroup, Parser};
use libozdocs::{
    DocsError, Inherit, Mode, Output, OutputError, Preview, PreviewOptions, Quiet, Remote,
    SyncOutcome, Terminal, workspace,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("color_mode")
        .args(["color", "no_color"])
))]
/// Top-level CLI options for oz-docs.
struct Cli {
    /// Documentation component to preview
    #[arg(short = 'c', long, value_name = "COMPONENT", default_value = ".")]
    component: PathBuf,

    /// Override the cache directory holding docs environments
    #[arg(long, value_name = "DIR")]
    dir: Option<String>,

    /// Enable colored output
    #[arg(long)]
    color: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    no_color: bool,

    /// Suppress status messages (child process output is still shown)
    #[arg(long)]
    quiet: bool,

    /// Increase diagnostic logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Command to run: build or watch
    #[arg(value_name = "COMMAND", default_value = "build")]
    command: String,

    /// In watch mode, patterns whose changes regenerate documentation sources
    #[arg(value_name = "PATTERNS", trailing_var_arg = true)]
    patterns: Vec<String>,
}

/// Initialize diagnostic logging based on CLI flags; `RUST_LOG` takes precedence.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "libozdocs=debug,oz_docs=debug",
        _ => "libozdocs=trace,oz_docs=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Convert output-layer failures into domain errors.
fn map_output_error(err: OutputError) -> DocsError {
    match err {
        OutputError::Io(e) => DocsError::IoError(e),
    }
}

/// Emit an output result, mapping errors into `DocsError`.
fn emit(result: StdResult<(), OutputError>) -> Result<()> {
    result.map_err(map_output_error)?;
    Ok(())
}

/// Describe a synchronization outcome for the user.
fn describe_sync(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Cloned => "Docs environment cloned".to_string(),
        SyncOutcome::Updated { from, to } => {
            let short = |rev: &str| rev.chars().take(8).collect::<String>();
            format!("Docs environment updated {}..{}", short(from), short(to))
        }
        SyncOutcome::Resumed => "Docs environment setup completed".to_string(),
        SyncOutcome::Unchanged => "Docs environment up to date".to_string(),
    }
}

/// CLI entrypoint.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Determine color output preference early for error handling
    let color = if cli.color {
        true
    } else if cli.no_color {
        false
    } else {
        // Auto-detect based on terminal
        io::stderr().is_terminal()
    };

    let output: Arc<dyn Output> = if cli.quiet {
        Arc::new(Quiet)
    } else {
        Arc::new(Terminal::new(color))
    };

    if let Err(e) = run(cli, output.as_ref()) {
        let exit_code = match e.downcast_ref::<DocsError>() {
            // The child already reported its own failure on the shared terminal.
            Some(err @ DocsError::CommandExit { .. }) => err.exit_code(),
            Some(err) => {
                report(output.as_ref(), &e);
                err.exit_code()
            }
            None => {
                report(output.as_ref(), &e);
                1
            }
        };

        if let Err(flush_err) = io::stdout().flush() {
            eprintln!("Failed to flush stdout: {flush_err}");
        }
        process::exit(exit_code);
    }
    Ok(())
}

/// Print an error through the output handler, falling back to stderr.
fn report(output: &dyn Output, e: &anyhow::Error) {
    if let Err(display_err) = output.fail(&format!("{e:#}")) {
        eprintln!("Failed to report error via output handler: {display_err:#}");
    }
    if let Err(finish_err) = output.finish() {
        eprintln!("Failed to flush output handler: {finish_err:#}");
    }
}

/// Execute the selected command using the provided output implementation.
fn run(cli: Cli, output: &dyn Output) -> Result<()> {
    // Validate the command before doing any work.
    let mode: Mode = cli.command.parse()?;
    if mode == Mode::Build && !cli.patterns.is_empty() {
        emit(output.warn(&format!(
            "Ignoring watch patterns in build mode: {}",
            cli.patterns.join(" ")
        )))?;
    }

    let cwd = env::current_dir().context("Failed to determine current directory")?;
    let cache_root = workspace::resolve_cache_root(cli.dir.as_deref());
    debug!(%mode, cache_root = %cache_root.display(), "starting");

    let preview = Preview::new(PreviewOptions {
        cwd,
        component: cli.component,
        cache_root,
        remote: Remote::default(),
    })?;
    debug!(
        docs = %preview.docs().dir().display(),
        start_path = %preview.source().start_path,
        "component resolved"
    );

    let runner = Inherit;
    let outcome = preview.sync(&runner)?;
    emit(output.message(&describe_sync(&outcome)))?;

    let mut driver = preview.driver(&runner)?;
    match mode {
        Mode::Build => {
            driver.build()?;
            emit(output.success("Build complete"))?;
        }
        Mode::Watch => {
            emit(output.message(&format!(
                "Watching for changes (playbook: {})",
                driver.playbook().display()
            )))?;
            driver.watch(&cli.patterns, output)?;
        }
    }

    emit(output.finish())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["oz-docs"]);
        assert_eq!(cli.component, PathBuf::from("."));
        assert_eq!(cli.command, "build");
        assert!(cli.patterns.is_empty());
    }

    #[test]
    fn test_cli_watch_with_patterns() {
        let cli = Cli::parse_from([
            "oz-docs",
            "-c",
            "docs",
            "watch",
            "contracts/**/*.sol",
            "scripts/*.js",
        ]);
        assert_eq!(cli.component, PathBuf::from("docs"));
        assert_eq!(cli.command, "watch");
        assert_eq!(cli.patterns, vec!["contracts/**/*.sol", "scripts/*.js"]);
    }

    #[test]
    fn test_color_flags_conflict() {
        assert!(Cli::try_parse_from(["oz-docs", "--color", "--no-color"]).is_err());
    }

    #[test]
    fn test_describe_sync() {
        let outcome = SyncOutcome::Updated {
            from: "0123456789abcdef".to_string(),
            to: "fedcba9876543210".to_string(),
        };
        assert_eq!(
            describe_sync(&outcome),
            "Docs environment updated 01234567..fedcba98"
        );
        assert_eq!(
            describe_sync(&SyncOutcome::Resumed),
            "Docs environment setup completed"
        );
    }
}
