//! prompt::resolver
//!
//! Merges supplied flags, hidden defaults and interactive answers.
//!
//! # Precedence
//!
//! For each field, in declaration order:
//!
//! 1. A supplied flag with the field's name is taken verbatim. It is not
//!    re-validated; the caller that supplied it is trusted.
//! 2. A `hidden` field falls back to its default (or the empty string)
//!    without being shown or validated.
//! 3. Everything else is left pending for interactive resolution.
//!
//! Flags that match no field are ignored.
//!
//! # Invariant
//!
//! The resolved names and the pending names are disjoint and together
//! equal the original field-set's names.

use std::collections::BTreeMap;

use super::field::FieldType;
use super::protocol::FieldSet;

/// Externally supplied `--name=value` pairs.
pub type SuppliedFlags = BTreeMap<String, String>;

/// Ordered name to value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueSet {
    values: Vec<(String, String)>,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing an earlier value in place.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.values.iter().position(|(n, _)| n == name)?;
        Some(self.values.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValueSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ValueSet::new();
        for (k, v) in iter {
            let key: String = k.into();
            set.insert(&key, v);
        }
        set
    }
}

/// Outcome of partitioning one field-set.
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    /// Values taken verbatim from supplied flags.
    pub explicit: ValueSet,
    /// Hidden-field defaults applied without interaction.
    pub silent: ValueSet,
    /// Fields that still need interactive resolution.
    pub pending: FieldSet,
    /// Declaration order of the original field-set.
    order: Vec<String>,
}

impl ResolutionResult {
    /// Everything resolved without interaction, in declaration order.
    pub fn resolved(&self) -> ValueSet {
        self.order
            .iter()
            .filter_map(|name| {
                self.explicit
                    .get(name)
                    .or_else(|| self.silent.get(name))
                    .map(|v| (name.as_str(), v))
            })
            .collect()
    }

    /// Whether anything is left to ask for.
    pub fn needs_input(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Merge interactively collected values with the non-interactive ones.
    ///
    /// Explicit and silent values win over interactive values on a name
    /// collision. Output follows the original declaration order; extra
    /// interactive names are appended.
    pub fn merge(&self, interactive: &ValueSet) -> ValueSet {
        let mut merged = ValueSet::new();
        for name in &self.order {
            let value = self
                .explicit
                .get(name)
                .or_else(|| self.silent.get(name))
                .or_else(|| interactive.get(name));
            if let Some(value) = value {
                merged.insert(name, value);
            }
        }
        for (name, value) in interactive.iter() {
            if !merged.contains(name) {
                merged.insert(name, value);
            }
        }
        merged
    }
}

/// Partitions field-sets against the flags supplied on the command line.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentResolver<'a> {
    flags: &'a SuppliedFlags,
}

impl<'a> ArgumentResolver<'a> {
    pub fn new(flags: &'a SuppliedFlags) -> Self {
        Self { flags }
    }

    /// Split `fields` into resolved values and a pending residual set.
    pub fn partition(&self, fields: &FieldSet) -> ResolutionResult {
        let mut result = ResolutionResult::default();

        for field in fields {
            result.order.push(field.name.clone());

            if let Some(value) = self.flags.get(&field.name) {
                tracing::debug!(field = %field.name, "resolved from supplied flag");
                result.explicit.insert(&field.name, value.as_str());
            } else if field.kind() == FieldType::Hidden {
                tracing::debug!(field = %field.name, "resolved from hidden default");
                result
                    .silent
                    .insert(&field.name, field.default.clone().unwrap_or_default());
            } else {
                result.pending.insert(field.clone());
            }
        }

        result
    }

    /// The flag value for `name`, if supplied.
    pub fn flag(&self, name: &str) -> Option<&'a str> {
        self.flags.get(name).map(String::as_str)
    }
}
