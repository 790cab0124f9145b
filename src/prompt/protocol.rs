//! prompt::protocol
//!
//! Field-sets and the per-command prompt protocol.
//!
//! # Ordering
//!
//! Both [`FieldSet`] and [`PromptProtocol`] preserve insertion order.
//! Field order is prompting and help order; entry order is help order.
//!
//! # Composition
//!
//! A command starts from its compiled-in entries and may register more
//! with [`PromptProtocol::add_prompt`] while it is being constructed.
//! After construction the protocol is only read.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;

use super::field::{FieldSpec, PromptField};

/// Errors from malformed protocol declarations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("prompt '{0}' does not exist")]
    UnknownPrompt(String),

    #[error("prompt '{0}' is not configured correctly: {1}")]
    Malformed(String, String),

    #[error("command '{0}' has no documented prompt expander")]
    MissingExpander(String),
}

/// Ordered collection of fields belonging to one command verb.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<PromptField>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: PromptField) -> Self {
        self.insert(field);
        self
    }

    /// Insert a field, replacing one with the same name in place.
    pub fn insert(&mut self, field: PromptField) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PromptField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<PromptField> {
        let idx = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(idx))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PromptField> {
        self.fields.iter()
    }

    pub fn first(&self) -> Option<&PromptField> {
        self.fields.first()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether this is a genuine prompt set: its first field declares
    /// both a type and a message.
    pub fn is_prompt_set(&self) -> bool {
        self.first().is_some_and(PromptField::is_declared)
    }

    /// Check every declared field can actually be prompted.
    pub fn check(&self, entry: &str) -> Result<(), ProtocolError> {
        for field in &self.fields {
            if field.kind() == super::field::FieldType::Select && field.items.is_empty() {
                return Err(ProtocolError::Malformed(
                    entry.to_string(),
                    format!("select field '{}' has no items", field.name),
                ));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a PromptField;
    type IntoIter = std::slice::Iter<'a, PromptField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl FromIterator<PromptField> for FieldSet {
    fn from_iter<I: IntoIterator<Item = PromptField>>(iter: I) -> Self {
        let mut set = FieldSet::new();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

/// A config entry: a full field table or a plain default value.
#[derive(Deserialize)]
#[serde(untagged)]
enum EntryForm {
    Field(FieldSpec),
    Text(String),
    Int(i64),
    Bool(bool),
}

impl<'de> Deserialize<'de> for FieldSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = FieldSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table of field name to field definition or default value")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<FieldSet, M::Error> {
                let mut set = FieldSet::new();
                while let Some((name, form)) = map.next_entry::<String, EntryForm>()? {
                    let field = match form {
                        EntryForm::Field(spec) => PromptField::from_spec(&name, spec),
                        EntryForm::Text(value) => PromptField::plain(&name, &value),
                        EntryForm::Int(value) => PromptField::plain(&name, &value.to_string()),
                        EntryForm::Bool(value) => {
                            PromptField::plain(&name, if value { "1" } else { "0" })
                        }
                    };
                    if set.contains(&name) {
                        return Err(de::Error::custom(format!("duplicate field '{}'", name)));
                    }
                    set.insert(field);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}

/// Named field-sets for one command, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PromptProtocol {
    entries: Vec<(String, FieldSet)>,
}

impl PromptProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with(mut self, name: &str, set: FieldSet) -> Self {
        self.add_prompt(name, set);
        self
    }

    /// Register (or replace) the field-set for `name`.
    pub fn add_prompt(&mut self, name: &str, set: FieldSet) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = set,
            None => self.entries.push((name.to_string(), set)),
        }
    }

    pub fn has_prompt(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&FieldSet> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, set)| set)
    }

    /// Field-set for `name`, or [`ProtocolError::UnknownPrompt`].
    pub fn require(&self, name: &str) -> Result<&FieldSet, ProtocolError> {
        self.get(name)
            .ok_or_else(|| ProtocolError::UnknownPrompt(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSet)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for PromptProtocol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ProtocolVisitor;

        impl<'de> Visitor<'de> for ProtocolVisitor {
            type Value = PromptProtocol;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table of prompt name to field table")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<PromptProtocol, M::Error> {
                let mut protocol = PromptProtocol::new();
                while let Some((name, set)) = map.next_entry::<String, FieldSet>()? {
                    protocol.add_prompt(&name, set);
                }
                Ok(protocol)
            }
        }

        deserializer.deserialize_map(ProtocolVisitor)
    }
}
