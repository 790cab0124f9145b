//! ui::help
//!
//! Help text generated from method documentation and the prompt protocol.
//!
//! # Layout
//!
//! ```text
//! install:install                         Install the framework
//!                                          Arguments
//!                                          --host: Set your app name (example: My app)
//!                                          --lang: Set your default language (example: en)
//! ```
//!
//! The label column is [`LABEL_WIDTH`] characters wide. Undocumented
//! methods, methods without a matching field-set, fields with `help = false`
//! and field-sets whose first field is not a declared prompt are left out.
//!
//! A method documented with `@methodExtends prompt` renders one block per
//! protocol entry that has no real method of its own, reusing the method's
//! description.
//!
//! Rendering only reads the protocol, so the same inputs always produce the
//! same text.

use std::io::{self, Write};

use crate::doc::CommandMetadata;
use crate::prompt::protocol::PromptProtocol;

/// Width of the `command:method` label column.
pub const LABEL_WIDTH: usize = 40;

/// Renders help blocks for one command.
pub struct HelpRenderer<'a> {
    metadata: &'a dyn CommandMetadata,
    protocol: &'a PromptProtocol,
}

impl<'a> HelpRenderer<'a> {
    pub fn new(metadata: &'a dyn CommandMetadata, protocol: &'a PromptProtocol) -> Self {
        Self { metadata, protocol }
    }

    /// Write the full help page: heading, blocks and a usage example.
    pub fn render_page(&self, out: &mut dyn Write) -> io::Result<()> {
        let command = self.metadata.class_name().to_lowercase();
        writeln!(out)?;
        writeln!(out, "Trellis CLI commands")?;
        writeln!(
            out,
            "Below are all the available inputs for the {} commands.",
            command
        )?;
        writeln!(out)?;
        self.render(out)?;
        writeln!(
            out,
            "Example usage: trellis {} [action] --arg=1 --arg=2",
            command
        )
    }

    /// Write one block per documented method or virtual entry.
    pub fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        let class = self.metadata.class_name().to_lowercase();
        let methods = self.metadata.method_names();

        for method in &methods {
            let Some(doc) = self.metadata.doc_comment(method) else {
                continue;
            };
            let Some(description) = doc.description.as_deref() else {
                continue;
            };

            if doc.extends_prompt() {
                for entry in self.protocol.names() {
                    if !methods.contains(&entry) {
                        self.block(out, &class, entry, description)?;
                    }
                }
            } else {
                self.block(out, &class, method, description)?;
            }
        }
        Ok(())
    }

    /// Render into a string.
    pub fn render_to_string(&self) -> io::Result<String> {
        let mut buf = Vec::new();
        self.render_page(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn block(
        &self,
        out: &mut dyn Write,
        class: &str,
        entry: &str,
        description: &str,
    ) -> io::Result<()> {
        let Some(fields) = self.protocol.get(entry) else {
            return Ok(());
        };
        if !fields.is_prompt_set() {
            return Ok(());
        }

        let label = format!("{}:{}", class, entry);
        let pad = " ".repeat(LABEL_WIDTH.saturating_sub(label.len()).max(1));
        let fill = " ".repeat(LABEL_WIDTH + 1);

        writeln!(out, "{}{}{}", label, pad, description)?;
        writeln!(out, "{}Arguments", fill)?;
        for field in fields.iter().filter(|f| f.help) {
            let example = field
                .default_value()
                .map(|d| format!(" (example: {})", d))
                .unwrap_or_default();
            writeln!(
                out,
                "{}--{}: {}{}",
                fill,
                field.name,
                field.help_text(),
                example
            )?;
        }
        writeln!(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::metadata::{MethodDoc, MethodTable};
    use crate::prompt::field::PromptField;
    use crate::prompt::protocol::FieldSet;

    const METHODS: &[MethodDoc] = &[
        MethodDoc::documented("install", "/**\n * Install the framework\n */"),
        MethodDoc::documented(
            "config",
            "/**\n * Install a configured package\n * @methodExtends prompt\n */",
        ),
        MethodDoc::undocumented("helper"),
    ];

    fn protocol() -> PromptProtocol {
        PromptProtocol::new()
            .with(
                "install",
                FieldSet::new()
                    .with(
                        PromptField::text("host", "App name")
                            .with_default("My app")
                            .with_description("Set your app name"),
                    )
                    .with(PromptField::text("lang", "Language"))
                    .with(PromptField::hidden("charset", "Charset").without_help()),
            )
            .with(
                "mail",
                FieldSet::new().with(PromptField::text("host", "SMTP host")),
            )
            .with(
                "helper",
                FieldSet::new().with(PromptField::text("x", "Never shown")),
            )
            .with(
                "scaffold",
                FieldSet::new().with(PromptField::plain("x", "y")),
            )
    }

    fn rendered() -> String {
        let table = MethodTable::new("Install", METHODS);
        let protocol = protocol();
        let mut out = Vec::new();
        HelpRenderer::new(&table, &protocol).render(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn renders_method_block() {
        let out = rendered();
        let fill = " ".repeat(LABEL_WIDTH + 1);
        let label = format!("install:install{}", " ".repeat(LABEL_WIDTH - 15));

        assert!(out.contains(&format!("{}Install the framework\n", label)));
        assert!(out.contains(&format!("{}Arguments\n", fill)));
        assert!(out.contains(&format!(
            "{}--host: Set your app name (example: My app)\n",
            fill
        )));
        assert!(out.contains(&format!("{}--lang: Language\n", fill)));
        assert!(!out.contains("--charset"));
    }

    #[test]
    fn expands_virtual_entries() {
        let out = rendered();
        assert!(out.contains("install:mail"));
        assert!(out.contains("Install a configured package"));
        assert!(out.contains("--host: SMTP host"));
        // Real methods are not re-rendered by the expander.
        assert_eq!(out.matches("install:install").count(), 1);
        // Undocumented methods stay invisible.
        assert!(!out.contains("install:helper"));
        // Field-sets without a declared first field are skipped.
        assert!(!out.contains("install:scaffold"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let table = MethodTable::new("Install", METHODS);
        let protocol = protocol();
        let renderer = HelpRenderer::new(&table, &protocol);
        assert_eq!(
            renderer.render_to_string().unwrap(),
            renderer.render_to_string().unwrap()
        );
    }

    #[test]
    fn long_labels_keep_a_separator() {
        let long = "x".repeat(LABEL_WIDTH + 5);
        let protocol =
            PromptProtocol::new().with(&long, FieldSet::new().with(PromptField::text("a", "A")));
        const MAKE: &[MethodDoc] = &[MethodDoc::documented(
            "make",
            "/** Make files\n * @methodExtends prompt */",
        )];
        let table = MethodTable::new("Make", MAKE);
        let mut out = Vec::new();
        HelpRenderer::new(&table, &protocol).render(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(&format!("make:{} Make files", long)));
    }
}
