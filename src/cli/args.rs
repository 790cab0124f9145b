//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands and must come before any
//! connector flags:
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--interactive` / `--no-interactive`: Control prompts
//! - `--quiet` / `-q`: Minimal output
//!
//! # Connector Arguments
//!
//! Each connector takes free-form trailing tokens: an optional action
//! followed by `--name=value` or bare `--name` flags. They
//! are parsed by [`super::flags`], not by clap, so any field of the
//! connector's prompt protocol can be supplied without declaring it here.
//! A trailing `--help` shows the connector's generated help.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Trellis - prompt-driven maintenance commands for PHP applications
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Run as if trellis was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable interactive prompts
    #[arg(
        long = "interactive",
        global = true,
        conflicts_with = "no_interactive"
    )]
    pub interactive_flag: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Interactive mode as requested on the command line.
    ///
    /// `Some(true)` for `--interactive`, `Some(false)` for
    /// `--no-interactive` or `--quiet`, `None` when nothing was said.
    pub fn interactive_override(&self) -> Option<bool> {
        if self.interactive_flag {
            Some(true)
        } else if self.no_interactive || self.quiet {
            Some(false)
        } else {
            None
        }
    }

    /// Determine if interactive mode is enabled.
    ///
    /// Explicit flags win; otherwise the configured default applies, and
    /// only when stdin is a terminal.
    pub fn interactive(&self, configured: bool) -> bool {
        self.interactive_override()
            .unwrap_or_else(|| configured && std::io::stdin().is_terminal())
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install the application or a configured package
    #[command(
        disable_help_flag = true,
        after_help = "\
EXAMPLES:
    # Write APP_* settings to the env file, prompting for anything missing
    trellis install --host=\"My app\" --lang=en

    # Install a package declared under [packages.mail] in trellis.toml
    trellis install mail --host=smtp.example.com"
    )]
    Install {
        /// [PACKAGE] followed by --field=value flags
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Read and edit the env file
    #[command(
        disable_help_flag = true,
        after_help = "\
EXAMPLES:
    trellis config read --strict
    trellis config create --key=app_debug --value=0
    trellis config drop --key=app_debug
    trellis config install --type=mail"
    )]
    Config {
        /// <install|read|create|drop|help> followed by flags
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Generate files from templates
    #[command(
        disable_help_flag = true,
        after_help = "\
EXAMPLES:
    trellis make controller --name=User --type=basic"
    )]
    Make {
        /// <KIND> followed by --name and --type
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Apply SQL migrations
    #[command(disable_help_flag = true)]
    Migrate {
        /// [read] followed by --migration=<n>
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run the PHP development server
    #[command(disable_help_flag = true)]
    Server {
        /// <start|help> followed by --host, --port, --dir, --open
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run the test suites
    #[command(disable_help_flag = true)]
    Test {
        /// --path and flags passed through to the runner
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Show help for all connectors or one of them
    Help {
        /// Connector name
        connector: Option<String>,
    },
}

impl Command {
    /// Connector name and its trailing tokens.
    pub fn connector(&self) -> (&'static str, &[String]) {
        match self {
            Command::Install { args } => ("install", args.as_slice()),
            Command::Config { args } => ("config", args.as_slice()),
            Command::Make { args } => ("make", args.as_slice()),
            Command::Migrate { args } => ("migrate", args.as_slice()),
            Command::Server { args } => ("server", args.as_slice()),
            Command::Test { args } => ("test", args.as_slice()),
            Command::Help { .. } => ("help", &[][..]),
        }
    }
}
