//! ui::validate
//!
//! Named input validators.
//!
//! # Built-in Rules
//!
//! | Name        | Arguments      | Accepts                                  |
//! |-------------|----------------|------------------------------------------|
//! | `required`  | none           | input that is not blank                  |
//! | `length`    | `[min, max?]`  | character count within bounds            |
//! | `int`       | none           | optional sign followed by digits         |
//! | `email`     | none           | `local@domain.tld`                       |
//! | `domain`    | none           | hostname labels separated by dots        |
//! | `pregMatch` | `[class]`      | only characters from the given class     |
//!
//! Further rules can be added with [`ValidatorRegistry::register`] without
//! touching the prompt code.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use thiserror::Error;

use crate::prompt::field::{RuleArg, ValidationRule};

/// Errors from validator lookup or misconfigured rule arguments.
///
/// These are programming errors in a protocol declaration, not user errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidateError {
    #[error("the validation '{0}' does not exist")]
    UnknownRule(String),

    #[error("invalid arguments for validation '{rule}': {message}")]
    InvalidArgs { rule: String, message: String },
}

/// A validator: input value plus rule arguments to pass/fail.
pub type ValidatorFn = dyn Fn(&str, &[RuleArg]) -> Result<bool, ValidateError> + Send + Sync;

/// Name to validator mapping.
#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<ValidatorFn>>,
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.validators.keys().collect();
        names.sort();
        f.debug_struct("ValidatorRegistry")
            .field("validators", &names)
            .finish()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ValidatorRegistry {
    /// Registry with no validators.
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Registry with the built-in rules.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("required", |value, _| Ok(!value.trim().is_empty()));
        registry.register("length", length);
        registry.register("int", |value, _| Ok(int_pattern().is_match(value)));
        registry.register("email", |value, _| Ok(is_email(value)));
        registry.register("domain", |value, _| Ok(is_domain(value)));
        registry.register("pregMatch", preg_match);
        registry
    }

    /// Add or replace a validator.
    pub fn register<F>(&mut self, name: &str, validator: F)
    where
        F: Fn(&str, &[RuleArg]) -> Result<bool, ValidateError> + Send + Sync + 'static,
    {
        self.validators.insert(name.to_string(), Arc::new(validator));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Run `rule` against `value`. No rule always passes.
    pub fn check(&self, value: &str, rule: Option<&ValidationRule>) -> Result<bool, ValidateError> {
        let Some(rule) = rule else {
            return Ok(true);
        };
        let validator = self
            .validators
            .get(&rule.name)
            .ok_or_else(|| ValidateError::UnknownRule(rule.name.clone()))?;
        validator(value, &rule.args)
    }
}

fn int_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[+-]?\d+$").expect("static int pattern"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@([^@\s]+)$").expect("static email pattern")
    })
}

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .expect("static label pattern")
    })
}

fn bound(rule: &str, args: &[RuleArg], idx: usize) -> Result<Option<usize>, ValidateError> {
    match args.get(idx) {
        None => Ok(None),
        Some(arg) => arg
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ValidateError::InvalidArgs {
                rule: rule.to_string(),
                message: format!("'{}' is not a non-negative integer", arg),
            }),
    }
}

fn length(value: &str, args: &[RuleArg]) -> Result<bool, ValidateError> {
    let min = bound("length", args, 0)?.unwrap_or(0);
    let max = bound("length", args, 1)?;
    let len = value.chars().count();
    Ok(len >= min && max.map_or(true, |max| len <= max))
}

fn is_domain(value: &str) -> bool {
    let host = value.strip_suffix('.').unwrap_or(value);
    !host.is_empty() && host.len() <= 253 && host.split('.').all(|l| label_pattern().is_match(l))
}

fn is_email(value: &str) -> bool {
    if value.len() > 254 {
        return false;
    }
    let Some(caps) = email_pattern().captures(value) else {
        return false;
    };
    let domain = &caps[1];
    domain.contains('.') && is_domain(domain)
}

fn preg_match(value: &str, args: &[RuleArg]) -> Result<bool, ValidateError> {
    let class = args.first().ok_or_else(|| ValidateError::InvalidArgs {
        rule: "pregMatch".to_string(),
        message: "missing character class".to_string(),
    })?;
    let class = class.to_string().replace(['[', ']'], "");
    let pattern = Regex::new(&format!("^[{}]+$", class)).map_err(|e| {
        ValidateError::InvalidArgs {
            rule: "pregMatch".to_string(),
            message: e.to_string(),
        }
    })?;
    Ok(pattern.is_match(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(value: &str, name: &str, args: Vec<RuleArg>) -> bool {
        let rule = ValidationRule {
            name: name.to_string(),
            args,
        };
        ValidatorRegistry::builtin().check(value, Some(&rule)).unwrap()
    }

    #[test]
    fn no_rule_passes() {
        assert!(ValidatorRegistry::builtin().check("", None).unwrap());
    }

    #[test]
    fn required_rejects_blank() {
        assert!(!check("", "required", vec![]));
        assert!(!check("   ", "required", vec![]));
        assert!(check("x", "required", vec![]));
    }

    #[test]
    fn length_bounds_count_characters() {
        let args = || vec![RuleArg::Int(3), RuleArg::Int(5)];
        assert!(!check("ab", "length", args()));
        assert!(check("abc", "length", args()));
        assert!(check("åäöüé", "length", args()));
        assert!(!check("abcdef", "length", args()));
        assert!(check("abcdefgh", "length", vec![RuleArg::Int(1)]));
    }

    #[test]
    fn int_and_email_and_domain() {
        assert!(check("42", "int", vec![]));
        assert!(check("-7", "int", vec![]));
        assert!(!check("4.2", "int", vec![]));
        assert!(!check("", "int", vec![]));

        assert!(check("dev@example.com", "email", vec![]));
        assert!(!check("dev@example", "email", vec![]));
        assert!(!check("no-at-sign.com", "email", vec![]));

        assert!(check("example.com", "domain", vec![]));
        assert!(check("localhost", "domain", vec![]));
        assert!(!check("-bad-.com", "domain", vec![]));
        assert!(!check("two..dots", "domain", vec![]));
    }

    #[test]
    fn preg_match_uses_character_class() {
        let args = || vec![RuleArg::Text("a-zA-Z_".into())];
        assert!(check("User_Profile", "pregMatch", args()));
        assert!(!check("user-profile", "pregMatch", args()));
        assert!(!check("", "pregMatch", args()));
    }

    #[test]
    fn unknown_rule_is_an_error() {
        let rule = ValidationRule::new("nope", Vec::<RuleArg>::new());
        assert_eq!(
            ValidatorRegistry::builtin().check("x", Some(&rule)),
            Err(ValidateError::UnknownRule("nope".into()))
        );
    }

    #[test]
    fn bad_length_args_are_an_error() {
        let rule = ValidationRule::new("length", ["many"]);
        assert!(matches!(
            ValidatorRegistry::builtin().check("x", Some(&rule)),
            Err(ValidateError::InvalidArgs { .. })
        ));
    }

    #[test]
    fn custom_validator_can_be_registered() {
        let mut registry = ValidatorRegistry::builtin();
        registry.register("yesno", |v, _| Ok(v == "y" || v == "n"));
        let rule = ValidationRule::new("yesno", Vec::<RuleArg>::new());
        assert!(registry.check("y", Some(&rule)).unwrap());
        assert!(!registry.check("maybe", Some(&rule)).unwrap());
    }
}
