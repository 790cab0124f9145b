//! server connector - Run the PHP built-in development server

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context as _, Result};

use super::{Connector, Context, Session};
use crate::cli::flags::Invocation;
use crate::doc::metadata::{MethodDoc, MethodTable};
use crate::doc::CommandMetadata;
use crate::prompt::protocol::PromptProtocol;

const METHODS: &[MethodDoc] = &[
    MethodDoc::undocumented("start"),
    MethodDoc::undocumented("help"),
];

/// Where and how to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    pub dir: PathBuf,
}

impl ServerOptions {
    /// Flags first, then configuration.
    pub fn resolve(ctx: &Context, invocation: &Invocation) -> Result<Self> {
        let flag = |name: &str| invocation.flags.get(name).filter(|v| !v.is_empty());

        let host = flag("host")
            .cloned()
            .unwrap_or_else(|| ctx.config.server_host().to_string());
        let port = match flag("port") {
            Some(port) => port
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .with_context(|| format!("Invalid port \"{}\"", port))?,
            None => ctx.config.server_port(),
        };
        let dir = match flag("dir") {
            Some(dir) => ctx.paths.resolve(dir),
            None => ctx.paths.public_dir().to_path_buf(),
        };
        Ok(Self { host, port, dir })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.address())
    }
}

/// `<php> -S host:port -t dir`
pub fn server_command(php: &str, options: &ServerOptions, dir: &Path) -> Command {
    let mut command = Command::new(php);
    command.arg("-S").arg(options.address()).arg("-t").arg(dir);
    command
}

/// The `server` connector. Its help is static text.
pub struct Server {
    table: MethodTable,
    protocol: PromptProtocol,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        Self {
            table: MethodTable::new("Server", METHODS),
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
            Some("start") => self.start(ctx, session, invocation),
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

    fn start<R: BufRead, W: Write>(
        &self,
        ctx: &Context,
        session: &mut Session<'_, R, W>,
        invocation: &Invocation,
    ) -> Result<()> {
        let options = ServerOptions::resolve(ctx, invocation)?;
        let Ok(dir) = options.dir.canonicalize() else {
            bail!("Invalid directory path to public directory: {}", options.dir.display());
        };
        if !dir.is_dir() {
            bail!("Invalid directory path to public directory: {}", dir.display());
        }

        let url = options.url();
        session.message("Trellis server has started, visit below to display your app.")?;
        session.message(format!("Visit: {}", url))?;

        if session.has_flag("open") {
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, url = %url, "failed to open browser");
                session.failure(format!("Could not open {} in a browser", url))?;
            }
        }

        let mut command = server_command(ctx.config.php(), &options, &dir);
        tracing::info!(?command, "starting development server");
        let status = command.status().context("Could not connect to host!")?;
        if !status.success() {
            bail!("Could not connect to host! ({})", status);
        }
        Ok(())
    }
}

impl Connector for Server {
    fn name(&self) -> &'static str {
        "server"
    }

    fn metadata(&self) -> &dyn CommandMetadata {
        &self.table
    }

    fn protocol(&self) -> &PromptProtocol {
        &self.protocol
    }

    fn help(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "$ trellis server [action] [--name=value, --name=value, ...]")?;
        writeln!(out, "Action: start or help")?;
        writeln!(out, "Values: --host=<host>, --port=<port>, --dir=<dir>, --open")?;
        writeln!(out, "--host: Host to listen on (default: localhost)")?;
        writeln!(out, "--port: Port to listen on (default: 8080)")?;
        writeln!(out, "--dir: Document root, relative to the project (default: public)")?;
        writeln!(out, "--open: Open the app in a browser")?;
        writeln!(out)
    }
}
