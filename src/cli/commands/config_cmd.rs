//! config command - Read, create, drop and install env file entries

use std::io::{self, BufRead, Write};

use anyhow::{Context as _, Result};

use super::{Connector, Context, Session};
use crate::cli::flags::Invocation;
use crate::doc::metadata::{MethodDoc, MethodTable};
use crate::doc::CommandMetadata;
use crate::prompt::protocol::PromptProtocol;
use crate::ui::output;

const METHODS: &[MethodDoc] = &[
    MethodDoc::undocumented("install"),
    MethodDoc::undocumented("read"),
    MethodDoc::undocumented("create"),
    MethodDoc::undocumented("drop"),
    MethodDoc::undocumented("help"),
];

/// The `config` connector. Its help is static text.
pub struct ConfigConnector {
    table: MethodTable,
    protocol: PromptProtocol,
}

impl Default for ConfigConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigConnector {
    pub fn new() -> Self {
        Self {
            table: MethodTable::new("Config", METHODS),
            protocol: PromptProtocol::new(),
        }
    }

    pub fn run<R: BufRead, W: Write>(
        &self,
        ctx: &Context,
        session: &mut Session<'_, R, W>,
        invocation: &Invocation,
    ) -> Result<()> {
        match invocation.action() {
            Some("install") => install(ctx, session),
            Some("read") => read(ctx, session),
            Some("create") => create(ctx, session),
            Some("drop") => drop_key(ctx, session),
            None | Some("help") => {
                self.help(session.writer())?;
                Ok(())
            }
            Some(other) => {
                session.failure(format!("The action \"{}\" does not exist.", other))?;
                self.help(session.writer())?;
                Ok(())
            }
        }
    }
}

/// Prompt every entry of the package named by `--type`.
fn install<R: BufRead, W: Write>(ctx: &Context, session: &mut Session<'_, R, W>) -> Result<()> {
    let packages = ctx.config.packages();
    let package = session.flag("type").unwrap_or_default().to_string();

    let Some(fields) = packages.get(&package) else {
        let allowed: Vec<_> = packages.names().collect();
        session.message(format!(
            "Expecting the argument --type=<package>, with a valid installation.\nAllowed types: {}",
            allowed.join(", ")
        ))?;
        return Ok(());
    };

    // `--type` selects the package; it is not a field value.
    let mut field_flags = session.flags().clone();
    field_flags.remove("type");
    let title = format!("Installing {}", package);

    let resolved = {
        let mut scoped = Session::new(ctx, session.input(), field_flags);
        scoped
            .resolve(&package, &title, fields)
            .with_context(|| format!("The package \"{}\" is not configured correctly", package))?
    };
    let Some(values) = resolved else {
        return Ok(());
    };

    let mut env = ctx.env_file()?;
    for (name, value) in values.iter() {
        env.set(&format!("{}_{}", package, name), value)?;
    }
    ctx.save_env(&env)?;

    session.message("...")?;
    session.message("Installation completed!")?;
    session.message("...")
}

/// Print the env file, or the effective configuration with `--strict`.
fn read<R: BufRead, W: Write>(ctx: &Context, session: &mut Session<'_, R, W>) -> Result<()> {
    if session.has_flag("strict") {
        let pairs = ctx.config.describe();
        return session.message(output::format_pairs(&pairs));
    }
    let env = ctx.env_file()?;
    let rendered = env.render();
    session.message(rendered.trim_end())
}

/// Add or edit one entry after confirmation.
fn create<R: BufRead, W: Write>(ctx: &Context, session: &mut Session<'_, R, W>) -> Result<()> {
    let (Some(key), Some(value)) = (session.flag("key"), session.flag("value")) else {
        return session.message("The flags --key=<key> and --value=<value> are required");
    };
    let (key, value) = (key.to_string(), value.to_string());

    let mut env = ctx.env_file()?;
    let verb = if env.has(&key) { "edit" } else { "add" };
    let change = env.set(&key, &value)?;

    let question = format!(
        "Are you sure you want to \"{}\" row to config environments?\n...\n{}\n...",
        verb, change
    );
    if session.confirmed(&question)? {
        ctx.save_env(&env)?;
        session.message("Success!")?;
    }
    Ok(())
}

/// Remove one entry after confirmation.
fn drop_key<R: BufRead, W: Write>(ctx: &Context, session: &mut Session<'_, R, W>) -> Result<()> {
    let Some(key) = session.flag("key").map(str::to_string) else {
        return session.message("The flag --key=<key> is required");
    };

    let mut env = ctx.env_file()?;
    if !env.has(&key) {
        return session.message("The config environment does not exist!");
    }

    let question = format!(
        "Are you sure you want to drop the config environment \"{}\"?",
        key
    );
    if session.confirmed(&question)? {
        env.drop(&key);
        ctx.save_env(&env)?;
        session.message("Success!")?;
    }
    Ok(())
}

impl Connector for ConfigConnector {
    fn name(&self) -> &'static str {
        "config"
    }

    fn metadata(&self) -> &dyn CommandMetadata {
        &self.table
    }

    fn protocol(&self) -> &PromptProtocol {
        &self.protocol
    }

    fn help(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "$ trellis config [action] [--name=value, --name=value, ...]")?;
        writeln!(out, "Action: install, read, create, drop or help")?;
        writeln!(out, "Values: --key=<key>, --value=<value>, --type=<package>, --strict, --yes")?;
        writeln!(out, "--key: The env config key (action: create, drop)")?;
        writeln!(out, "--value: The env config value (action: create)")?;
        writeln!(out, "--type: A package from trellis.toml (action: install)")?;
        writeln!(out, "--strict: Show the effective configuration (action: read)")?;
        writeln!(out, "--yes: Skip the confirmation (action: create, drop)")?;
        writeln!(out)
    }
}
