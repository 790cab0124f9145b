//! install connector - Write application and package settings to the env file

use std::io::{BufRead, Write};

use anyhow::{Context as _, Result};

use super::{require_expander, Connector, Context, Session};
use crate::cli::flags::Invocation;
use crate::core::config::Config;
use crate::doc::metadata::{MethodDoc, MethodTable};
use crate::doc::CommandMetadata;
use crate::prompt::field::{PromptField, RuleArg};
use crate::prompt::protocol::{FieldSet, PromptProtocol};
use crate::prompt::resolver::ValueSet;

const METHODS: &[MethodDoc] = &[
    MethodDoc::documented(
        "install",
        "/**
          * Install the framework
          * @return void
          */",
    ),
    MethodDoc::documented(
        "config",
        "/**
          * Install a package configured in trellis.toml
          * @methodExtends prompt
          * @return void
          */",
    ),
    MethodDoc::documented(
        "help",
        "/**
          * Access help (or with added flag --help)
          */",
    ),
];

const CONFIRM_FIELD: &str = "confirm";

/// The `install` connector.
pub struct Install {
    table: MethodTable,
    protocol: PromptProtocol,
}

impl Install {
    /// Built-in `install` entry plus one entry per configured package.
    pub fn new(config: &Config) -> Self {
        let mut protocol = PromptProtocol::new().with("install", Self::install_fields());
        for (name, fields) in config.packages().iter() {
            protocol.add_prompt(name, fields.clone());
        }
        Self {
            table: MethodTable::new("Install", METHODS),
            protocol,
        }
    }

    fn install_fields() -> FieldSet {
        FieldSet::new()
            .with(
                PromptField::text("host", "App name")
                    .with_default("My app")
                    .with_rule("length", [1, 60])
                    .with_error("Required")
                    .with_description("Set your app name"),
            )
            .with(
                PromptField::text("lang", "Language")
                    .with_default("en")
                    .with_rule("length", [2, 2])
                    .with_error("Required and must be 2 characters")
                    .with_description("Set your default language"),
            )
            .with(
                PromptField::text("maintainer_email", "Your email")
                    .with_rule("email", Vec::<RuleArg>::new())
                    .with_error("Required and must be email")
                    .with_description("Set your maintainer email"),
            )
            .with(
                PromptField::text("maintainer_name", "Your full name")
                    .with_rule("length", [1, 160])
                    .with_error("Required")
                    .with_description("Set your maintainer full name"),
            )
            .with(
                PromptField::hidden("debug", "Debug mode")
                    .with_default("1")
                    .with_rule("int", Vec::<RuleArg>::new())
                    .with_error("Required")
                    .with_description("Set debug mode"),
            )
            .with(
                PromptField::hidden("charset", "Set your charset")
                    .with_default("UTF-8")
                    .with_rule("length", [1, 60])
                    .with_error("Required"),
            )
    }

    pub fn run<R: BufRead, W: Write>(
        &self,
        ctx: &Context,
        session: &mut Session<'_, R, W>,
        invocation: &Invocation,
    ) -> Result<()> {
        match invocation.action() {
            None | Some("install") => self.install(ctx, session),
            Some("help") => {
                self.help(session.writer())?;
                Ok(())
            }
            Some(package) => self.package(ctx, session, package),
        }
    }

    /// Install the framework settings as `APP_*` keys.
    fn install<R: BufRead, W: Write>(&self, ctx: &Context, session: &mut Session<'_, R, W>) -> Result<()> {
        let fields = self.protocol.require("install")?;
        let Some(values) = session.resolve("install", "Installing the framework", fields)? else {
            return Ok(());
        };

        write_env(ctx, "app", &values)?;
        session.message("The framework has been successfully installed.")
    }

    /// Install a configured package as `<PACKAGE>_*` keys.
    fn package<R: BufRead, W: Write>(
        &self,
        ctx: &Context,
        session: &mut Session<'_, R, W>,
        package: &str,
    ) -> Result<()> {
        let Some(fields) = self.protocol.get(package) else {
            session.failure(format!("The package \"{}\" does not exist!", package))?;
            return session.message(format!(
                "Declare it under [packages.{}] in {}",
                package,
                ctx.paths.config_file().display()
            ));
        };
        require_expander(self, "config")?;

        let fields = fields.clone().with(PromptField::confirm(
            CONFIRM_FIELD,
            "Are you sure you want to proceed?",
        ));
        if session.has_flag("yes") && !session.has_flag(CONFIRM_FIELD) {
            session.supply(CONFIRM_FIELD, "yes");
        }

        let title = format!("Installing {}", package);
        let resolved = session
            .resolve(package, &title, &fields)
            .with_context(|| format!("The package \"{}\" is not configured correctly", package))?;
        let Some(mut values) = resolved else {
            return Ok(());
        };

        // A supplied --confirm skips the prompt but must still say yes.
        let confirmed = values
            .remove(CONFIRM_FIELD)
            .map_or(true, |answer| answer.trim().eq_ignore_ascii_case("yes"));
        if !confirmed {
            return session.message("Aborting");
        }

        write_env(ctx, package, &values)?;
        session.message("The package has been successfully installed.")
    }
}

/// Set `<PREFIX>_<KEY>` for every value and save the env file.
fn write_env(ctx: &Context, prefix: &str, values: &ValueSet) -> Result<()> {
    let mut env = ctx.env_file()?;
    for (key, value) in values.iter() {
        let line = env.set(&format!("{}_{}", prefix, key), value)?;
        tracing::debug!(line = %line, "env entry set");
    }
    ctx.save_env(&env)
}

impl Connector for Install {
    fn name(&self) -> &'static str {
        "install"
    }

    fn metadata(&self) -> &dyn CommandMetadata {
        &self.table
    }

    fn protocol(&self) -> &PromptProtocol {
        &self.protocol
    }
}
