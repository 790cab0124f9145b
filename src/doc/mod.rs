//! doc
//!
//! Structured comment blocks attached to command methods.
//!
//! # Overview
//!
//! A doc block is the raw `/** ... */` text documenting one command method.
//! [`DocComment::parse`] turns it into a tag map plus a flattened
//! description. The help renderer reads both: the description becomes the
//! help line and the `methodExtends` tag marks a virtual-method expander.
//!
//! # Format
//!
//! ```text
//! /**
//!  * Install a configured package
//!  * @methodExtends prompt
//!  * @param string $action package name
//!  */
//! ```
//!
//! Decoration characters (`/`, `*`, whitespace) are stripped from both ends
//! of every line. Lines of the form `@tag rest` are tags; every other
//! non-empty line is description text.

pub mod metadata;

pub use metadata::{CommandMetadata, MethodDoc};

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// Tag that turns a documented method into a virtual-method expander.
pub const METHOD_EXTENDS_TAG: &str = "methodExtends";

/// Parsed documentation for one method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// Method the block was attached to (empty when parsed standalone).
    pub method: String,
    /// Free-text lines joined with single spaces, absent when there were none.
    pub description: Option<String>,
    /// Tag bodies in order of appearance, keyed by tag name.
    pub tags: BTreeMap<String, Vec<String>>,
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^@(\w+)(?:\s+(.*))?$").expect("static tag pattern"))
}

/// Characters stripped from both ends of each doc line.
fn is_decoration(c: char) -> bool {
    matches!(c, '/' | '*' | ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B')
}

impl DocComment {
    /// Parse a raw comment block.
    ///
    /// Never fails: a block without recognizable content yields an empty
    /// tag map and no description.
    pub fn parse(raw: &str) -> Self {
        let mut tags: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut description = Vec::new();

        for line in raw.split("\r\n").flat_map(|l| l.split(['\r', '\n'])) {
            let line = line.trim_matches(is_decoration);
            if line.is_empty() {
                continue;
            }

            match tag_pattern().captures(line) {
                Some(caps) => {
                    let body = caps.get(2).map(|m| m.as_str().trim_end()).unwrap_or("");
                    tags.entry(caps[1].to_string())
                        .or_default()
                        .push(body.to_string());
                }
                None => description.push(line),
            }
        }

        DocComment {
            method: String::new(),
            description: (!description.is_empty()).then(|| description.join(" ")),
            tags,
        }
    }

    /// Parse a block and record which method it documents.
    pub fn for_method(method: &str, raw: &str) -> Self {
        DocComment {
            method: method.to_string(),
            ..Self::parse(raw)
        }
    }

    /// All bodies recorded for `tag`.
    pub fn tag(&self, tag: &str) -> &[String] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First body recorded for `tag`.
    pub fn first_tag(&self, tag: &str) -> Option<&str> {
        self.tag(tag).first().map(String::as_str)
    }

    /// Whether this method expands help for protocol-only entries.
    pub fn extends_prompt(&self) -> bool {
        self.first_tag(METHOD_EXTENDS_TAG) == Some("prompt")
    }
}
