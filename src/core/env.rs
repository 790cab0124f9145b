//! core::env
//!
//! Reading and rewriting `.env` files.
//!
//! # Format
//!
//! ```text
//! # comment
//! APP_HOST="My app"
//! APP_LANG=en
//! ```
//!
//! Keys are normalised to uppercase. Comments, blank lines and unparseable
//! lines are kept verbatim so a rewrite only touches the entries that
//! changed. Values are double-quoted on output when they contain
//! whitespace, `#`, `=` or quotes. Inside double quotes `\\`, `\"`, `\n`
//! and `\r` are escapes, so multi-line values stay on one line.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::fs::{write_atomic, WriteError};

/// Errors from env file operations.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to read env file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("invalid env key '{0}', use letters, digits and '_'")]
    InvalidKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry { key: String, value: String },
    Verbatim(String),
}

/// An env file held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    lines: Vec<Line>,
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static key pattern"))
}

impl EnvFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path`. A missing file is an empty env.
    pub fn load(path: &Path) -> Result<Self, EnvError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Self::parse(&contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "env file missing, starting empty");
                Ok(Self::new())
            }
            Err(source) => Err(EnvError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(contents: &str) -> Self {
        let lines = contents.lines().map(parse_line).collect();
        Self { lines }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_uppercase();
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value } if *k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Entry keys in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, .. } => Some(key.as_str()),
            Line::Verbatim(_) => None,
        })
    }

    /// Set `key` to `value`, updating in place or appending.
    ///
    /// Returns the rendered `KEY=VALUE` line.
    pub fn set(&mut self, key: &str, value: &str) -> Result<String, EnvError> {
        if !key_pattern().is_match(key) {
            return Err(EnvError::InvalidKey(key.to_string()));
        }
        let key = key.to_uppercase();
        let existing = self.lines.iter_mut().find_map(|line| match line {
            Line::Entry { key: k, value } if *k == key => Some(value),
            _ => None,
        });
        match existing {
            Some(slot) => *slot = value.to_string(),
            None => self.lines.push(Line::Entry {
                key: key.clone(),
                value: value.to_string(),
            }),
        }
        Ok(render_entry(&key, value))
    }

    /// Remove `key`. Returns whether it existed.
    pub fn drop(&mut self, key: &str) -> bool {
        let key = key.to_uppercase();
        let before = self.lines.len();
        self.lines
            .retain(|line| !matches!(line, Line::Entry { key: k, .. } if *k == key));
        self.lines.len() != before
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry { key, value } => out.push_str(&render_entry(key, value)),
                Line::Verbatim(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }

    /// Write the rendered file to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), EnvError> {
        write_atomic(path, self.render().as_bytes())?;
        Ok(())
    }
}

fn parse_line(raw: &str) -> Line {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Line::Verbatim(raw.to_string());
    }
    let body = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let Some((key, value)) = body.split_once('=') else {
        return Line::Verbatim(raw.to_string());
    };
    let key = key.trim();
    if !key_pattern().is_match(key) {
        return Line::Verbatim(raw.to_string());
    }
    Line::Entry {
        key: key.to_uppercase(),
        value: parse_value(value.trim()),
    }
}

fn parse_value(value: &str) -> String {
    if value.len() >= 2 {
        if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            return unescape(inner);
        }
        if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
            return inner.to_string();
        }
    }
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end().to_string(),
        None => value.to_string(),
    }
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other @ ('"' | '\\')) => out.push(other),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn render_entry(key: &str, value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '=' | '\\'));
    if needs_quotes {
        let mut escaped = String::with_capacity(value.len() + 2);
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                other => escaped.push(other),
            }
        }
        format!("{}=\"{}\"", key, escaped)
    } else {
        format!("{}={}", key, value)
    }
}
