//! prompt::field
//!
//! One prompt field: how an argument is declared, asked for and checked.
//!
//! # Example
//!
//! ```
//! use trellis::prompt::field::{FieldType, PromptField};
//!
//! let field = PromptField::text("host", "App name")
//!     .with_default("My app")
//!     .with_rule("length", [1, 60])
//!     .with_error("Required")
//!     .with_description("Set your app name");
//!
//! assert_eq!(field.kind(), FieldType::Text);
//! assert_eq!(field.default.as_deref(), Some("My app"));
//! assert_eq!(field.rule.as_ref().map(|r| r.name.as_str()), Some("length"));
//! ```

use std::fmt;
use std::sync::Arc;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

/// How a field's value is collected when it has to be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text line.
    Text,
    /// Never shown; resolved from its default.
    Hidden,
    /// Pick one key from `items`.
    Select,
    /// Gate the whole field-set on a `yes` answer.
    Confirm,
    /// Text read without terminal echo.
    Masked,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::Hidden => "hidden",
            FieldType::Select => "select",
            FieldType::Confirm => "confirm",
            FieldType::Masked => "masked",
        };
        f.write_str(name)
    }
}

/// A single validation rule argument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RuleArg {
    Int(i64),
    Text(String),
}

impl RuleArg {
    /// Integer view of the argument, if it is one (or parses as one).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RuleArg::Int(n) => Some(*n),
            RuleArg::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for RuleArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleArg::Int(n) => write!(f, "{}", n),
            RuleArg::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RuleArg {
    fn from(n: i64) -> Self {
        RuleArg::Int(n)
    }
}

impl From<i32> for RuleArg {
    fn from(n: i32) -> Self {
        RuleArg::Int(i64::from(n))
    }
}

impl From<&str> for RuleArg {
    fn from(s: &str) -> Self {
        RuleArg::Text(s.to_string())
    }
}

impl From<String> for RuleArg {
    fn from(s: String) -> Self {
        RuleArg::Text(s)
    }
}

/// A named validator plus its arguments, e.g. `length: [1, 60]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRule {
    pub name: String,
    pub args: Vec<RuleArg>,
}

impl ValidationRule {
    pub fn new<I, A>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<RuleArg>,
    {
        Self {
            name: name.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The `required` rule: non-blank input.
    pub fn required() -> Self {
        Self {
            name: "required".to_string(),
            args: Vec::new(),
        }
    }
}

/// Deserializes a `validate` table, keeping only the first entry.
///
/// Rule tables may list several validators; only the first one is active.
fn first_rule<'de, D>(deserializer: D) -> Result<Option<ValidationRule>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FirstRule;

    impl<'de> Visitor<'de> for FirstRule {
        type Value = Option<ValidationRule>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a table of validator name to argument list")
        }

        fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
            let mut first = None;
            while let Some((name, args)) = map.next_entry::<String, Vec<RuleArg>>()? {
                if first.is_none() {
                    first = Some(ValidationRule { name, args });
                }
            }
            Ok(first)
        }
    }

    deserializer.deserialize_map(FirstRule)
}

/// Failure message for a field: fixed text, or derived from the failing rule.
#[derive(Clone)]
pub enum ErrorMessage {
    Literal(String),
    FromRule(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl ErrorMessage {
    pub fn from_rule<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        ErrorMessage::FromRule(Arc::new(f))
    }

    /// Resolve the message for a failure of `rule`.
    pub fn resolve(&self, rule: &str) -> String {
        match self {
            ErrorMessage::Literal(s) => s.clone(),
            ErrorMessage::FromRule(f) => f(rule),
        }
    }
}

impl fmt::Debug for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMessage::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            ErrorMessage::FromRule(_) => f.write_str("FromRule(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for ErrorMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ErrorMessage::Literal)
    }
}

/// Selectable items for a `select` field, in presentation order.
pub type Choices = Vec<(String, String)>;

fn ordered_items<'de, D>(deserializer: D) -> Result<Choices, D::Error>
where
    D: Deserializer<'de>,
{
    struct Items;

    impl<'de> Visitor<'de> for Items {
        type Value = Choices;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a table of item key to label")
        }

        fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
            let mut items = Vec::new();
            while let Some((key, label)) = map.next_entry::<String, String>()? {
                items.push((key, label));
            }
            Ok(items)
        }
    }

    deserializer.deserialize_map(Items)
}

/// Declared form of a field as it appears in a config table.
///
/// The field name is the table key, so it is not part of the body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: Option<FieldType>,
    pub message: Option<String>,
    pub default: Option<String>,
    #[serde(deserialize_with = "first_rule")]
    pub validate: Option<ValidationRule>,
    pub error: Option<ErrorMessage>,
    pub description: Option<String>,
    pub help: Option<bool>,
    #[serde(deserialize_with = "ordered_items")]
    pub items: Choices,
}

/// One declared argument of a command.
#[derive(Debug, Clone)]
pub struct PromptField {
    pub name: String,
    /// Declared type; `None` for plain-default entries.
    pub field_type: Option<FieldType>,
    /// Prompt label; `None` for plain-default entries.
    pub message: Option<String>,
    pub default: Option<String>,
    pub rule: Option<ValidationRule>,
    pub error: Option<ErrorMessage>,
    pub description: Option<String>,
    pub help: bool,
    pub items: Choices,
}

impl PromptField {
    pub fn new(name: &str, field_type: FieldType, message: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: Some(field_type),
            message: Some(message.to_string()),
            default: None,
            rule: None,
            error: None,
            description: None,
            help: true,
            items: Vec::new(),
        }
    }

    pub fn text(name: &str, message: &str) -> Self {
        Self::new(name, FieldType::Text, message)
    }

    pub fn hidden(name: &str, message: &str) -> Self {
        Self::new(name, FieldType::Hidden, message)
    }

    pub fn masked(name: &str, message: &str) -> Self {
        Self::new(name, FieldType::Masked, message)
    }

    pub fn confirm(name: &str, message: &str) -> Self {
        Self::new(name, FieldType::Confirm, message)
    }

    pub fn select<I, K, V>(name: &str, message: &str, items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut field = Self::new(name, FieldType::Select, message);
        field.items = items
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        field
    }

    /// An entry that only carries a default value.
    pub fn plain(name: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: None,
            message: None,
            default: Some(default.to_string()),
            rule: None,
            error: None,
            description: None,
            help: true,
            items: Vec::new(),
        }
    }

    /// Build a field from its config table form.
    pub fn from_spec(name: &str, spec: FieldSpec) -> Self {
        Self {
            name: name.to_string(),
            field_type: spec.kind,
            message: spec.message,
            default: spec.default,
            rule: spec.validate,
            error: spec.error,
            description: spec.description,
            help: spec.help.unwrap_or(true),
            items: spec.items,
        }
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn with_rule<I, A>(mut self, name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<RuleArg>,
    {
        // First rule wins.
        if self.rule.is_none() {
            self.rule = Some(ValidationRule::new(name, args));
        }
        self
    }

    pub fn with_error(mut self, message: &str) -> Self {
        self.error = Some(ErrorMessage::Literal(message.to_string()));
        self
    }

    pub fn with_error_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.error = Some(ErrorMessage::from_rule(f));
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn without_help(mut self) -> Self {
        self.help = false;
        self
    }

    /// Effective type; plain-default entries are collected as text.
    pub fn kind(&self) -> FieldType {
        self.field_type.unwrap_or(FieldType::Text)
    }

    /// Whether the field declares both a type and a message.
    pub fn is_declared(&self) -> bool {
        self.field_type.is_some() && self.message.is_some()
    }

    /// Label shown when prompting, falling back to the capitalised name.
    pub fn label(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => capitalize(&self.name),
        }
    }

    /// Non-empty default value.
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref().filter(|d| !d.is_empty())
    }

    /// Message printed when `rule` rejects a value.
    pub fn failure_message(&self, rule: &str) -> Option<String> {
        self.error.as_ref().map(|e| e.resolve(rule))
    }

    /// Help text: description, falling back to the prompt message.
    pub fn help_text(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(self.message.as_deref())
            .unwrap_or("")
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
