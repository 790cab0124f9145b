//! cli
//!
//! Command-line interface layer for Trellis.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration once and build the connector [`commands::Context`]
//! - Delegate to the connector named on the command line
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! [`commands`]. Connector flags are parsed by [`flags`], so each connector's
//! prompt protocol decides which flags it understands.

pub mod args;
pub mod commands;
pub mod flags;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::core::paths::ProjectPaths;
use crate::ui::output::{self, Verbosity};

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "TRELLIS_LOG";

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let root = project_root(&cli)?;
    let loaded = Config::load(Some(&root))?;
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    for warning in &loaded.warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            verbosity,
        );
    }

    let config = loaded.config;
    let interactive = cli.interactive(config.interactive());
    tracing::debug!(root = %root.display(), interactive, "starting");

    let ctx = commands::Context {
        verbosity,
        interactive,
        ..commands::Context::new(ProjectPaths::new(root, &config), config)
    };
    commands::dispatch(&cli.command, &ctx)
}

/// Log filter: `TRELLIS_LOG`, else `debug` with `--debug`, else `warn`.
fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.cwd {
        Some(dir) => {
            if !dir.is_dir() {
                anyhow::bail!("--cwd {} is not a directory", dir.display());
            }
            Ok(dir.clone())
        }
        None => std::env::current_dir().context("Failed to determine the current directory"),
    }
}
