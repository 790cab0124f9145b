//! cli::commands
//!
//! Connector dispatch and handlers.
//!
//! # Architecture
//!
//! Each connector:
//! 1. Builds its prompt protocol from compiled-in field-sets plus any
//!    entries registered while it is constructed
//! 2. Resolves the field-set for the requested action through a
//!    [`Session`]: supplied flags first, hidden defaults next, prompts last
//! 3. Performs its side effect (env file, generated files, ledger, process)
//!
//! All prompting and output go through the session's [`InteractiveInput`],
//! so every connector can be driven by scripted input in tests.

mod config_cmd;
mod install;
mod make;
mod migrate;
mod server;
mod test_cmd;

pub use config_cmd::ConfigConnector;
pub use install::Install;
pub use make::{Make, TemplateFile, TemplateManifest};
pub use migrate::{LedgerMigrator, Migrate, Migration, MigrationOutcome, Migrator};
pub use server::{server_command, Server, ServerOptions};
pub use test_cmd::{runner_command, TestRunner};

use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result};

use super::args::Command;
use super::flags;
use crate::core::config::Config;
use crate::core::env::EnvFile;
use crate::core::paths::ProjectPaths;
use crate::doc::CommandMetadata;
use crate::prompt::protocol::{FieldSet, PromptProtocol, ProtocolError};
use crate::prompt::resolver::{ArgumentResolver, SuppliedFlags, ValueSet};
use crate::ui::help::HelpRenderer;
use crate::ui::output::{self, Verbosity};
use crate::ui::prompts::{InteractiveInput, PromptError};

/// Connector names in help order.
pub const CONNECTORS: &[&str] = &["install", "config", "make", "migrate", "server", "test"];

/// Everything a connector needs to know about the invocation.
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: ProjectPaths,
    pub config: Config,
    pub verbosity: Verbosity,
    pub interactive: bool,
}

impl Context {
    pub fn new(paths: ProjectPaths, config: Config) -> Self {
        Self {
            paths,
            config,
            verbosity: Verbosity::Normal,
            interactive: true,
        }
    }

    pub fn env_file(&self) -> Result<EnvFile> {
        let path = self.paths.env_file();
        EnvFile::load(&path).with_context(|| format!("Failed to load {}", path.display()))
    }

    pub fn save_env(&self, env: &EnvFile) -> Result<()> {
        let path = self.paths.env_file();
        env.save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// One connector invocation: supplied flags plus the interactive channel.
pub struct Session<'a, R, W> {
    input: &'a mut InteractiveInput<R, W>,
    flags: SuppliedFlags,
    interactive: bool,
    verbosity: Verbosity,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(ctx: &Context, input: &'a mut InteractiveInput<R, W>, flags: SuppliedFlags) -> Self {
        Self {
            input,
            flags,
            interactive: ctx.interactive,
            verbosity: ctx.verbosity,
        }
    }

    pub fn flags(&self) -> &SuppliedFlags {
        &self.flags
    }

    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    /// Add a flag as if it had been supplied.
    pub fn supply(&mut self, name: &str, value: &str) {
        self.flags.insert(name.to_string(), value.to_string());
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn input(&mut self) -> &mut InteractiveInput<R, W> {
        &mut *self.input
    }

    /// Write a line unless quiet.
    pub fn message(&mut self, message: impl std::fmt::Display) -> Result<()> {
        output::line(self.input.writer_mut(), message, self.verbosity)?;
        Ok(())
    }

    /// Write a failure line; shown even when quiet.
    pub fn failure(&mut self, message: impl std::fmt::Display) -> Result<()> {
        output::line(self.input.writer_mut(), message, Verbosity::Normal)?;
        Ok(())
    }

    /// Writer for multi-line output such as help pages.
    pub fn writer(&mut self) -> &mut W {
        self.input.writer_mut()
    }

    /// Confirmation gate outside a field-set.
    ///
    /// A supplied `--yes` accepts without asking. Without it, a
    /// non-interactive run fails instead of blocking.
    pub fn confirmed(&mut self, message: &str) -> Result<bool> {
        if self.has_flag("yes") {
            tracing::debug!("confirmation accepted by --yes");
            return Ok(true);
        }
        if !self.interactive {
            return Err(PromptError::NotInteractive("--yes".to_string()).into());
        }
        Ok(self.input.confirmed(message)?)
    }

    /// Resolve `fields` for protocol entry `entry`.
    ///
    /// Returns every value in declaration order, or `None` when the user
    /// declined a confirmation field.
    pub fn resolve(&mut self, entry: &str, title: &str, fields: &FieldSet) -> Result<Option<ValueSet>> {
        fields.check(entry)?;

        let result = ArgumentResolver::new(&self.flags).partition(fields);
        tracing::debug!(
            entry,
            explicit = result.explicit.len(),
            silent = result.silent.len(),
            pending = result.pending.len(),
            "partitioned field-set"
        );

        if !result.needs_input() {
            return Ok(Some(result.resolved()));
        }
        if !self.interactive {
            let missing: Vec<String> = result.pending.keys().map(|k| format!("--{}", k)).collect();
            return Err(PromptError::NotInteractive(missing.join(", ")).into());
        }

        match self.input.collect(Some(title), &result.pending)? {
            Some(values) => Ok(Some(result.merge(&values))),
            None => Ok(None),
        }
    }
}

/// A command group reachable from the CLI.
pub trait Connector {
    /// Connector name as typed on the command line.
    fn name(&self) -> &'static str;

    /// Method table used for help rendering.
    fn metadata(&self) -> &dyn CommandMetadata;

    /// The live prompt protocol.
    fn protocol(&self) -> &PromptProtocol;

    /// Write the help page.
    fn help(&self, out: &mut dyn Write) -> io::Result<()> {
        HelpRenderer::new(self.metadata(), self.protocol()).render_page(out)
    }

    /// Check that every protocol entry can be prompted and shows in help.
    ///
    /// Entries without a method of their own need a method documented as
    /// a prompt expander.
    fn check(&self) -> Result<(), ProtocolError> {
        let metadata = self.metadata();
        let methods = metadata.method_names();
        let has_expander = methods.iter().any(|m| {
            metadata
                .doc_comment(m)
                .is_some_and(|doc| doc.description.is_some() && doc.extends_prompt())
        });

        for (entry, fields) in self.protocol().iter() {
            fields.check(entry)?;
            if !methods.contains(&entry) && !has_expander {
                return Err(ProtocolError::MissingExpander(metadata.class_name().to_string()));
            }
        }
        Ok(())
    }
}

/// Require a documented expander method named `method`.
pub(crate) fn require_expander(connector: &dyn Connector, method: &str) -> Result<(), ProtocolError> {
    let documented = connector
        .metadata()
        .doc_comment(method)
        .is_some_and(|doc| doc.description.is_some() && doc.extends_prompt());
    if documented {
        Ok(())
    } else {
        Err(ProtocolError::MissingExpander(format!(
            "{}:{}",
            connector.metadata().class_name().to_lowercase(),
            method
        )))
    }
}

/// Dispatch a parsed command on the process's terminal.
pub fn dispatch(command: &Command, ctx: &Context) -> Result<()> {
    let mut input = InteractiveInput::stdio();
    match command {
        Command::Help { connector } => {
            let tokens: Vec<String> = connector.iter().cloned().collect();
            execute(ctx, "help", &tokens, &mut input)
        }
        _ => {
            let (name, tokens) = command.connector();
            execute(ctx, name, tokens, &mut input)
        }
    }
}

/// Run connector `name` with its trailing `tokens`.
pub fn execute<R: BufRead, W: Write, S: AsRef<str>>(
    ctx: &Context,
    name: &str,
    tokens: &[S],
    input: &mut InteractiveInput<R, W>,
) -> Result<()> {
    let invocation = flags::parse(tokens);
    tracing::info!(connector = name, action = ?invocation.action(), "running connector");

    if name == "help" {
        let mut session = Session::new(ctx, input, invocation.flags.clone());
        return help(ctx, invocation.action(), &mut session);
    }

    let wants_help = invocation.wants_help();
    let mut session = Session::new(ctx, input, invocation.flags.clone());

    match name {
        "install" => {
            let connector = Install::new(&ctx.config);
            connector.check()?;
            if wants_help {
                return render_help(&connector, &mut session);
            }
            connector.run(ctx, &mut session, &invocation)
        }
        "config" => {
            let connector = ConfigConnector::new();
            if wants_help {
                return render_help(&connector, &mut session);
            }
            connector.run(ctx, &mut session, &invocation)
        }
        "make" => {
            let connector = Make::new(ctx)?;
            connector.check()?;
            if wants_help {
                return render_help(&connector, &mut session);
            }
            connector.run(ctx, &mut session, &invocation)
        }
        "migrate" => {
            let connector = Migrate::new(ctx)?;
            connector.check()?;
            if wants_help {
                return render_help(&connector, &mut session);
            }
            let mut migrator = LedgerMigrator::open(ctx.paths.migration_ledger())?;
            connector.run(&mut session, &invocation, &mut migrator)
        }
        "server" => {
            let connector = Server::new();
            if wants_help {
                return render_help(&connector, &mut session);
            }
            connector.run(ctx, &mut session, &invocation)
        }
        "test" => {
            let connector = TestRunner::new();
            if wants_help {
                return render_help(&connector, &mut session);
            }
            connector.run(ctx, &mut session, &invocation)
        }
        other => {
            session.failure(format!("The connector \"{}\" does not exist.", other))?;
            help(ctx, None, &mut session)
        }
    }
}

fn render_help<R: BufRead, W: Write>(
    connector: &dyn Connector,
    session: &mut Session<'_, R, W>,
) -> Result<()> {
    tracing::debug!(connector = connector.name(), "rendering help");
    connector.help(session.writer())?;
    Ok(())
}

/// `trellis help [CONNECTOR]`.
fn help<R: BufRead, W: Write>(
    ctx: &Context,
    connector: Option<&str>,
    session: &mut Session<'_, R, W>,
) -> Result<()> {
    match connector {
        Some(name) => {
            let Some(connector) = build(ctx, name)? else {
                session.failure(format!("The connector \"{}\" does not exist.", name))?;
                return usage(session.writer()).map_err(Into::into);
            };
            render_help(connector.as_ref(), session)
        }
        None => {
            usage(session.writer())?;
            for name in CONNECTORS {
                if let Some(connector) = build(ctx, name)? {
                    render_help(connector.as_ref(), session)?;
                }
            }
            Ok(())
        }
    }
}

fn build(ctx: &Context, name: &str) -> Result<Option<Box<dyn Connector>>> {
    let connector: Box<dyn Connector> = match name {
        "install" => Box::new(Install::new(&ctx.config)),
        "config" => Box::new(ConfigConnector::new()),
        "make" => Box::new(Make::new(ctx)?),
        "migrate" => Box::new(Migrate::new(ctx)?),
        "server" => Box::new(Server::new()),
        "test" => Box::new(TestRunner::new()),
        _ => return Ok(None),
    };
    Ok(Some(connector))
}

fn usage(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "$ trellis [connector] [action] [--name=value, --name=value, ...]")?;
    writeln!(out)?;
    writeln!(out, "Connectors: {}", CONNECTORS.join(", "))?;
    writeln!(out, "Example:")?;
    writeln!(out, "$ trellis install mail --host=smtp.example.com")?;
    writeln!(out, "$ trellis make controller --name=User --type=basic")?;
    writeln!(out, "$ trellis migrate read")
}
