//! doc::metadata
//!
//! Method metadata provider for help rendering.
//!
//! # Design
//!
//! Commands do not rely on runtime reflection. Each command exposes a
//! sidecar table of its methods and their raw doc blocks through
//! [`CommandMetadata`]. Anything that can answer "which methods exist" and
//! "what is the doc block for this method" can feed the help renderer.

use super::DocComment;

/// One entry in a command's method table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDoc {
    /// Method (verb) name.
    pub name: &'static str,
    /// Raw doc block, or `None` for undocumented methods.
    pub doc: Option<&'static str>,
}

impl MethodDoc {
    /// A documented method.
    pub const fn documented(name: &'static str, doc: &'static str) -> Self {
        Self {
            name,
            doc: Some(doc),
        }
    }

    /// A method without a doc block; it never appears in help.
    pub const fn undocumented(name: &'static str) -> Self {
        Self { name, doc: None }
    }
}

/// Narrow metadata interface over a command object.
pub trait CommandMetadata {
    /// Display name of the command (used as the help label prefix).
    fn class_name(&self) -> &str;

    /// Declared method names, in declaration order.
    fn method_names(&self) -> Vec<&str>;

    /// Raw doc block for `method`, if it has one.
    fn doc_block(&self, method: &str) -> Option<&str>;

    /// Parsed doc comment for `method`.
    ///
    /// Returns `None` when the method is undocumented.
    fn doc_comment(&self, method: &str) -> Option<DocComment> {
        self.doc_block(method)
            .map(|raw| DocComment::for_method(method, raw))
    }
}

/// Static method table implementing [`CommandMetadata`].
#[derive(Debug, Clone, Copy)]
pub struct MethodTable {
    class_name: &'static str,
    methods: &'static [MethodDoc],
}

impl MethodTable {
    /// Create a table for `class_name`.
    pub const fn new(class_name: &'static str, methods: &'static [MethodDoc]) -> Self {
        Self {
            class_name,
            methods,
        }
    }
}

impl CommandMetadata for MethodTable {
    fn class_name(&self) -> &str {
        self.class_name
    }

    fn method_names(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name).collect()
    }

    fn doc_block(&self, method: &str) -> Option<&str> {
        self.methods
            .iter()
            .find(|m| m.name == method)
            .and_then(|m| m.doc)
    }
}
