//! test connector - Run the project's test suites

use std::io::{BufRead, Write};
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context as _, Result};

use super::{Connector, Context, Session};
use crate::cli::flags::Invocation;
use crate::doc::metadata::{MethodDoc, MethodTable};
use crate::doc::CommandMetadata;
use crate::prompt::field::PromptField;
use crate::prompt::protocol::{FieldSet, PromptProtocol};

const METHODS: &[MethodDoc] = &[MethodDoc::documented(
    "test",
    "/**
      * Run all test suites
      * @return void
      */",
)];

/// Build the runner command line.
///
/// `runner` is split on whitespace. `--path` comes next, then every
/// other flag as `--name=value` (bare `--name` when empty), then the
/// positionals.
pub fn runner_command(runner: &str, path: &Path, invocation: &Invocation) -> Result<Command> {
    let mut parts = runner.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("The test runner is empty");
    };

    let mut command = Command::new(program);
    command.args(parts);
    command.arg(format!("--path={}", path.display()));
    for (name, value) in invocation.flags.iter().filter(|(name, _)| *name != "path") {
        if value.is_empty() {
            command.arg(format!("--{}", name));
        } else {
            command.arg(format!("--{}={}", name, value));
        }
    }
    command.args(&invocation.positionals);
    Ok(command)
}

/// The `test` connector.
pub struct TestRunner {
    table: MethodTable,
    protocol: PromptProtocol,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    pub fn new() -> Self {
        Self {
            table: MethodTable::new("Test", METHODS),
            protocol: PromptProtocol::new().with(
                "test",
                FieldSet::new().with(
                    PromptField::hidden("path", "Test path")
                        .with_description("Directory searched for test suites (default: project root)"),
                ),
            ),
        }
    }

    pub fn run<R: BufRead, W: Write>(
        &self,
        ctx: &Context,
        session: &mut Session<'_, R, W>,
        invocation: &Invocation,
    ) -> Result<()> {
        if invocation.action() == Some("help") {
            self.help(session.writer())?;
            return Ok(());
        }

        let fields = self.protocol.require("test")?;
        let Some(values) = session.resolve("test", "Running tests", fields)? else {
            return Ok(());
        };
        let path = match values.get("path").filter(|p| !p.is_empty()) {
            Some(path) => ctx.paths.resolve(path),
            None => ctx.paths.root().to_path_buf(),
        };
        let mut command = runner_command(ctx.config.test_runner(), &path, invocation)?;
        tracing::info!(?command, "running test suites");

        session.writer().flush()?;
        let status = command
            .status()
            .with_context(|| format!("Failed to start test runner \"{}\"", ctx.config.test_runner()))?;
        if !status.success() {
            bail!("Test suites failed ({})", status);
        }
        Ok(())
    }
}

impl Connector for TestRunner {
    fn name(&self) -> &'static str {
        "test"
    }

    fn metadata(&self) -> &dyn CommandMetadata {
        &self.table
    }

    fn protocol(&self) -> &PromptProtocol {
        &self.protocol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::flags::parse;
    use std::ffi::OsStr;

    fn args(command: &Command) -> Vec<&OsStr> {
        command.get_args().collect()
    }

    #[test]
    fn runner_is_split_and_path_comes_first() {
        let invocation = parse(&["--path=tests", "--verbose", "--filter=User", "unit"]);
        let command =
            runner_command("php vendor/bin/unitary", Path::new("/app/tests"), &invocation).unwrap();

        assert_eq!(command.get_program(), "php");
        assert_eq!(
            args(&command),
            ["vendor/bin/unitary", "--path=/app/tests", "--filter=User", "--verbose", "unit"]
        );
    }

    #[test]
    fn empty_runner_is_an_error() {
        assert!(runner_command("  ", Path::new("."), &parse::<&str>(&[])).is_err());
    }

    #[test]
    fn help_lists_the_test_method() {
        let out = crate::ui::help::HelpRenderer::new(
            TestRunner::new().metadata(),
            TestRunner::new().protocol(),
        )
        .render_to_string()
        .unwrap();
        assert!(out.contains("test:test"));
        assert!(out.contains("Run all test suites"));
        assert!(out.contains("--path: Directory searched for test suites"));
    }
}
