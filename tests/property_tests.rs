//! Property-based tests for the prompt protocol layer.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated field-sets, flags and doc blocks.

use std::collections::BTreeMap;

use proptest::prelude::*;

use trellis::cli::flags;
use trellis::doc::DocComment;
use trellis::prompt::field::{FieldType, PromptField};
use trellis::prompt::protocol::FieldSet;
use trellis::prompt::resolver::{ArgumentResolver, SuppliedFlags, ValueSet};

/// Strategy for a field kind.
fn field_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::Text),
        Just(FieldType::Hidden),
        Just(FieldType::Masked),
        Just(FieldType::Select),
    ]
}

/// Strategy for a field-set with unique names `f0..fn`.
fn field_set() -> impl Strategy<Value = FieldSet> {
    prop::collection::vec((field_type(), prop::option::of("[a-z0-9]{0,8}")), 0..8).prop_map(
        |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (kind, default))| {
                    let name = format!("f{}", i);
                    let mut field = PromptField::new(&name, kind, &format!("Field {}", i));
                    if kind == FieldType::Select {
                        field.items = vec![("a".into(), "A".into())];
                    }
                    match default {
                        Some(default) => field.with_default(&default),
                        None => field,
                    }
                })
                .collect::<FieldSet>()
        },
    )
}

/// Strategy for supplied flags over a name space wider than the field-set.
fn supplied_flags() -> impl Strategy<Value = SuppliedFlags> {
    prop::collection::btree_map("f[0-9]{1}|extra[a-z]{0,3}", "[ -~]{0,12}", 0..10)
}

/// Strategy for a word that is neither a tag nor decoration.
fn word() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9,.]{0,10}"
}

proptest! {
    /// Every field lands in exactly one partition.
    #[test]
    fn partition_is_disjoint_and_complete(fields in field_set(), flags in supplied_flags()) {
        let result = ArgumentResolver::new(&flags).partition(&fields);

        for field in &fields {
            let name = field.name.as_str();
            let places = [
                result.explicit.contains(name),
                result.silent.contains(name),
                result.pending.contains(name),
            ];
            prop_assert_eq!(places.iter().filter(|p| **p).count(), 1, "field {}", name);
        }
        prop_assert_eq!(
            result.explicit.len() + result.silent.len() + result.pending.len(),
            fields.len()
        );
    }

    /// A supplied flag always wins and is used verbatim.
    #[test]
    fn supplied_flags_win(fields in field_set(), flags in supplied_flags()) {
        let result = ArgumentResolver::new(&flags).partition(&fields);

        for field in &fields {
            match flags.get(&field.name) {
                Some(value) => {
                    prop_assert_eq!(result.explicit.get(&field.name), Some(value.as_str()));
                }
                None => {
                    prop_assert!(!result.explicit.contains(&field.name));
                }
            }
        }
        // Flags that match no field are ignored.
        for name in result.explicit.keys() {
            prop_assert!(fields.contains(name));
        }
    }

    /// Only unsupplied hidden fields are resolved silently, from their default.
    #[test]
    fn hidden_fields_never_prompt(fields in field_set(), flags in supplied_flags()) {
        let result = ArgumentResolver::new(&flags).partition(&fields);

        for field in &result.pending {
            prop_assert_ne!(field.kind(), FieldType::Hidden);
        }
        for (name, value) in result.silent.iter() {
            let field = fields.get(name).unwrap();
            prop_assert_eq!(field.kind(), FieldType::Hidden);
            prop_assert_eq!(value, field.default.as_deref().unwrap_or(""));
        }
    }

    /// Merging answers for the pending fields yields every field in declaration order.
    #[test]
    fn merge_restores_declaration_order(fields in field_set(), flags in supplied_flags()) {
        let result = ArgumentResolver::new(&flags).partition(&fields);
        let answers: ValueSet = result
            .pending
            .keys()
            .map(|name| (name, format!("answer-{}", name)))
            .collect();

        let merged = result.merge(&answers);
        let order: Vec<&str> = merged.keys().collect();
        let expected: Vec<&str> = fields.keys().collect();
        prop_assert_eq!(order, expected);

        if !result.needs_input() {
            prop_assert_eq!(result.resolved(), merged);
        }
    }

    /// `--name=value` tokens parse back to the same flags.
    #[test]
    fn flag_tokens_parse(pairs in prop::collection::btree_map("[a-z_]{1,8}", "[^\\s]{0,10}", 0..6)) {
        let tokens: Vec<String> = pairs.iter().map(|(k, v)| format!("--{}={}", k, v)).collect();
        let invocation = flags::parse(&tokens);
        prop_assert!(invocation.positionals.is_empty());
        prop_assert_eq!(invocation.flags, pairs);
    }

    /// Description lines are joined with single spaces; tags keep their order.
    #[test]
    fn doc_comment_parse(
        lines in prop::collection::vec(prop::collection::vec(word(), 1..4), 0..4),
        params in prop::collection::vec(word(), 0..4),
    ) {
        let mut raw = String::from("/**\n");
        for line in &lines {
            raw.push_str(&format!(" * {}\n", line.join(" ")));
        }
        for param in &params {
            raw.push_str(&format!(" * @param {}\n", param));
        }
        raw.push_str(" */");

        let doc = DocComment::parse(&raw);
        let description: Vec<String> = lines.iter().map(|l| l.join(" ")).collect();
        if description.is_empty() {
            prop_assert!(doc.description.is_none());
        } else {
            prop_assert_eq!(doc.description.clone(), Some(description.join(" ")));
        }
        prop_assert_eq!(doc.tag("param"), params.as_slice());

        let expected: BTreeMap<&str, usize> = if params.is_empty() {
            BTreeMap::new()
        } else {
            BTreeMap::from([("param", params.len())])
        };
        let actual: BTreeMap<&str, usize> =
            doc.tags.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        prop_assert_eq!(actual, expected);
    }
}
