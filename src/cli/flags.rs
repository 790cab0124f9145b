//! cli::flags
//!
//! Parsing of connector trailing tokens into positionals and supplied flags.
//!
//! | Token form        | Result                                   |
//! |-------------------|------------------------------------------|
//! | `--name=value`    | flag `name` = `value`                    |
//! | `--name`          | flag `name` = `""` (presence only)       |
//! | `--`              | every later token is positional          |
//! | anything else     | positional                               |
//!
//! A bare `--name` never consumes the next token, so `--yes mail` keeps
//! `mail` as the action. Repeated flags keep the last value.

use crate::prompt::resolver::SuppliedFlags;

/// Parsed connector tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub positionals: Vec<String>,
    pub flags: SuppliedFlags,
}

impl Invocation {
    /// First positional, usually the action or target name.
    pub fn action(&self) -> Option<&str> {
        self.positionals.first().map(String::as_str)
    }

    /// Whether `--help` was given.
    pub fn wants_help(&self) -> bool {
        self.flags.contains_key("help")
    }
}

/// Split `tokens` into positionals and flags.
pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Invocation {
    let mut invocation = Invocation::default();
    let mut iter = tokens.iter().map(|t| AsRef::<str>::as_ref(t));

    while let Some(token) = iter.next() {
        if token == "--" {
            invocation
                .positionals
                .extend(iter.by_ref().map(str::to_string));
            break;
        }

        let Some(body) = token.strip_prefix("--") else {
            invocation.positionals.push(token.to_string());
            continue;
        };

        let (name, value) = body.split_once('=').unwrap_or((body, ""));

        if name.is_empty() {
            tracing::warn!(token, "ignoring flag without a name");
            continue;
        }
        invocation.flags.insert(name.to_string(), value.to_string());
    }

    tracing::debug!(
        positionals = ?invocation.positionals,
        flags = ?invocation.flags.keys().collect::<Vec<_>>(),
        "parsed connector tokens"
    );
    invocation
}
