//! ui::prompts
//!
//! Interactive line input: steps, required values, masked input,
//! confirmation gates and choice menus.
//!
//! # Design
//!
//! [`InteractiveInput`] is generic over its reader and writer so the same
//! code drives a real terminal and scripted test input. Every prompt is a
//! blocking line read.
//!
//! Validation failures never surface as errors: the prompt is repeated
//! until the user gives a conforming value. There is no retry limit. The
//! only ways out of a retry loop are a valid answer, end of input
//! ([`PromptError::EndOfInput`]) or a misconfigured rule.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use super::validate::{ValidateError, ValidatorRegistry};
use crate::prompt::field::{ErrorMessage, FieldType, PromptField, ValidationRule};
use crate::prompt::protocol::FieldSet;
use crate::prompt::resolver::ValueSet;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("input ended while waiting for an answer")]
    EndOfInput,

    #[error("not in interactive mode; supply {0}")]
    NotInteractive(String),

    #[error("choice list is empty")]
    EmptyChoices,

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// How masked input is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Masking {
    /// Read from the controlling terminal with echo disabled.
    Terminal,
    /// Echo cannot be suppressed; warn and read a plain line.
    Unsupported,
}

const CONFIRM_PROMPT: &str = "Type 'yes' to continue: ";
const MASKED_RETRY: &str = "Input is required. Try again!";
const INVALID_VALUE: &str = "Invalid value, try again";
const UNMASKED_WARNING: &str =
    "Warning: the input will not be masked, this terminal cannot hide typed characters.";

/// Line-oriented terminal interaction.
pub struct InteractiveInput<R, W> {
    reader: R,
    writer: W,
    validators: ValidatorRegistry,
    masking: Masking,
    warned_unmasked: bool,
}

impl InteractiveInput<io::StdinLock<'static>, io::Stdout> {
    /// Prompts on the process's stdin/stdout with terminal masking.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout()).with_masking(Masking::Terminal)
    }
}

impl<R: BufRead, W: Write> InteractiveInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            validators: ValidatorRegistry::builtin(),
            masking: Masking::Unsupported,
            warned_unmasked: false,
        }
    }

    pub fn with_validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    pub fn with_masking(mut self, masking: Masking) -> Self {
        self.masking = masking;
        self
    }

    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Write `message`, followed by a newline unless `line_break` is false.
    pub fn write(&mut self, message: &str, line_break: bool) -> Result<(), PromptError> {
        self.writer.write_all(message.as_bytes())?;
        if line_break {
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Read one line without its line terminator.
    fn read_line(&mut self) -> Result<String, PromptError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(PromptError::EndOfInput);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }

    /// Ask once. An empty answer becomes `default` when there is one.
    pub fn step(&mut self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        let prompt = match default.filter(|d| !d.is_empty()) {
            Some(d) => format!("{} (Default value \"{}\"): ", message, d),
            None => format!("{}: ", message),
        };
        self.write(&prompt, false)?;

        let line = self.read_line()?;
        if line.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(line)
    }

    /// Run `rule` against `value`; no rule always passes.
    pub fn validate(&self, value: &str, rule: Option<&ValidationRule>) -> Result<bool, PromptError> {
        Ok(self.validators.check(value, rule)?)
    }

    /// Ask until the answer satisfies `rule` (`required` when `None`).
    pub fn required(
        &mut self,
        message: &str,
        rule: Option<&ValidationRule>,
    ) -> Result<String, PromptError> {
        let fallback = ValidationRule::required();
        let rule = rule.unwrap_or(&fallback);
        loop {
            let line = self.step(message, None)?;
            if self.validate(&line, Some(rule))? {
                return Ok(line);
            }
            tracing::debug!(rule = %rule.name, "required input rejected");
        }
    }

    /// Ask for a value without echoing it; blank input is rejected
    /// unless `rule` says otherwise.
    pub fn masked(
        &mut self,
        message: Option<&str>,
        rule: Option<&ValidationRule>,
        error: Option<&ErrorMessage>,
    ) -> Result<String, PromptError> {
        let label = prompt_label(
            &format!("{} (masked input)", message.unwrap_or("Input your value")),
            "Input your value",
        );
        let fallback = ValidationRule::required();
        let rule = rule.unwrap_or(&fallback);

        loop {
            if self.masking == Masking::Unsupported && !self.warned_unmasked {
                self.warned_unmasked = true;
                self.write(UNMASKED_WARNING, true)?;
            }
            self.write(&format!("{} ", label), false)?;
            let value = self.read_secret()?;
            if self.masking == Masking::Terminal {
                // Echo was off, so the user's Enter never reached the screen.
                self.write("", true)?;
            }

            if self.validate(&value, Some(rule))? {
                return Ok(value);
            }
            let retry = match error {
                Some(error) => error.resolve(&rule.name),
                None => MASKED_RETRY.to_string(),
            };
            self.write(&retry, true)?;
        }
    }

    fn read_secret(&mut self) -> Result<String, PromptError> {
        if self.masking == Masking::Terminal {
            match rpassword::read_password() {
                Ok(secret) => return Ok(secret),
                Err(e) => {
                    tracing::warn!(error = %e, "cannot suppress terminal echo");
                    self.masking = Masking::Unsupported;
                    self.warned_unmasked = true;
                    self.write("", true)?;
                    self.write(UNMASKED_WARNING, true)?;
                }
            }
        }
        self.read_line()
    }

    /// Ask for `yes`. Anything else declines and prints "Aborting".
    pub fn confirmed(&mut self, message: &str) -> Result<bool, PromptError> {
        self.write(message, true)?;
        self.write(CONFIRM_PROMPT, false)?;
        let answer = self.read_line()?;
        if answer.trim().eq_ignore_ascii_case("yes") {
            self.write("...", true)?;
            Ok(true)
        } else {
            self.write("Aborting", true)?;
            Ok(false)
        }
    }

    /// Run `action` once if the user confirms; `Ok(None)` if declined.
    pub fn confirm<T, F>(&mut self, message: &str, action: F) -> Result<Option<T>, PromptError>
    where
        F: FnOnce(&mut Self) -> T,
    {
        if self.confirmed(message)? {
            Ok(Some(action(self)))
        } else {
            Ok(None)
        }
    }

    /// Print `choices` and ask until one of their keys is entered.
    pub fn choose(
        &mut self,
        choices: &[(String, String)],
        prompt: Option<&str>,
    ) -> Result<String, PromptError> {
        self.choose_with(choices, prompt, None, None)
    }

    /// `choose` with a default taken on empty input and a message printed
    /// after each rejected key.
    fn choose_with(
        &mut self,
        choices: &[(String, String)],
        prompt: Option<&str>,
        default: Option<&str>,
        error: Option<&str>,
    ) -> Result<String, PromptError> {
        let (Some((first, _)), Some((last, _))) = (choices.first(), choices.last()) else {
            return Err(PromptError::EmptyChoices);
        };
        let message = if first == last {
            format!("You can at the moment only choose ({})", first)
        } else {
            format!("Choose input between ({}-{})", first, last)
        };

        loop {
            let mut menu = prompt_label(prompt.unwrap_or("Choose input"), "Choose input");
            menu.push('\n');
            for (key, label) in choices {
                menu.push_str(&format!("{}: {}\n", key, label));
            }
            self.write(&menu, false)?;

            let value = match default {
                Some(_) => self.step(&message, default)?,
                None => self.required(&message, None)?,
            };
            if choices.iter().any(|(key, _)| *key == value) {
                return Ok(value);
            }
            tracing::debug!(value = %value, "choice is not a listed key");
            if let Some(error) = error {
                self.write(error, true)?;
            }
        }
    }

    /// Collect one field according to its type.
    pub fn dispatch(&mut self, field: &PromptField) -> Result<String, PromptError> {
        let label = field.label();
        let rule = field.rule.as_ref();

        match field.kind() {
            FieldType::Masked => self.masked(Some(&label), rule, field.error.as_ref()),
            FieldType::Select => {
                let error = field.failure_message(rule.map_or("required", |r| r.name.as_str()));
                self.choose_with(
                    &field.items,
                    Some(&label),
                    field.default_value(),
                    error.as_deref(),
                )
            }
            FieldType::Confirm => {
                let accepted = self.confirmed(&label)?;
                Ok(if accepted { "yes" } else { "no" }.to_string())
            }
            FieldType::Text | FieldType::Hidden => loop {
                let value = self.step(&label, field.default_value())?;
                if self.validate(&value, rule)? {
                    break Ok(value);
                }
                let message = rule
                    .and_then(|r| field.failure_message(&r.name))
                    .unwrap_or_else(|| INVALID_VALUE.to_string());
                self.write(&message, true)?;
            },
        }
    }

    /// Walk a field-set in order.
    ///
    /// Hidden fields take their default without asking. A declined
    /// `confirm` field aborts the whole set with `Ok(None)`.
    pub fn collect(
        &mut self,
        title: Option<&str>,
        fields: &FieldSet,
    ) -> Result<Option<ValueSet>, PromptError> {
        if let Some(title) = title {
            self.write(title, true)?;
        }

        let mut values = ValueSet::new();
        for field in fields {
            match field.kind() {
                FieldType::Hidden => {
                    values.insert(&field.name, field.default.clone().unwrap_or_default());
                }
                FieldType::Confirm => {
                    if self.dispatch(field)? != "yes" {
                        return Ok(None);
                    }
                }
                _ => {
                    let value = self.dispatch(field)?;
                    values.insert(&field.name, value);
                }
            }
        }
        Ok(Some(values))
    }
}

/// Normalise a prompt so it ends with exactly one colon.
fn prompt_label(prompt: &str, fallback: &str) -> String {
    let prompt = if prompt.is_empty() { fallback } else { prompt };
    format!("{}:", prompt.trim_end_matches(':'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    type Scripted = InteractiveInput<Cursor<Vec<u8>>, Vec<u8>>;

    fn scripted(lines: &[&str]) -> Scripted {
        let mut input = lines.join("\n");
        input.push('\n');
        InteractiveInput::new(Cursor::new(input.into_bytes()), Vec::new())
    }

    fn output(input: Scripted) -> String {
        let (_, out) = input.into_parts();
        String::from_utf8(out).unwrap()
    }

    fn remaining(input: Scripted) -> String {
        let (mut reader, _) = input.into_parts();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        rest
    }

    #[test]
    fn step_substitutes_default_on_empty_line() {
        let mut input = scripted(&[""]);
        assert_eq!(input.step("Port", Some("8080")).unwrap(), "8080");
        assert_eq!(output(input), "Port (Default value \"8080\"): ");
    }

    #[test]
    fn step_returns_raw_line() {
        let mut input = scripted(&["  spaced  "]);
        assert_eq!(input.step("Name", Some("x")).unwrap(), "  spaced  ");

        let mut input = scripted(&[""]);
        assert_eq!(input.step("Name", None).unwrap(), "");
    }

    #[test]
    fn required_retries_until_valid() {
        let rule = ValidationRule::new("length", [3, 5]);
        let mut input = scripted(&["ab", "abcd", "extra"]);

        assert_eq!(input.required("Code", Some(&rule)).unwrap(), "abcd");
        assert_eq!(remaining(input), "extra\n");
    }

    #[test]
    fn required_stops_at_end_of_input() {
        let mut input = InteractiveInput::new(Cursor::new(b"\n".to_vec()), Vec::new());
        assert!(matches!(
            input.required("Name", None),
            Err(PromptError::EndOfInput)
        ));
    }

    #[test]
    fn confirm_runs_action_once_on_yes() {
        let mut input = scripted(&["  YeS "]);
        let mut runs = 0;
        let result = input
            .confirm("Drop key?", |_| {
                runs += 1;
            })
            .unwrap();
        assert!(result.is_some());
        assert_eq!(runs, 1);
    }

    #[test]
    fn confirm_declines_without_error() {
        let mut input = scripted(&["y"]);
        let mut runs = 0;
        let result = input.confirm("Drop key?", |_| runs += 1).unwrap();
        assert!(result.is_none());
        assert_eq!(runs, 0);
        assert!(output(input).ends_with("Aborting\n"));
    }

    #[test]
    fn choose_rejects_unknown_key() {
        let choices = vec![
            ("1".to_string(), "A".to_string()),
            ("2".to_string(), "B".to_string()),
        ];
        let mut input = scripted(&["9", "2"]);
        assert_eq!(input.choose(&choices, None).unwrap(), "2");

        let out = output(input);
        assert_eq!(out.matches("Choose input between (1-2): ").count(), 2);
        assert!(out.contains("1: A\n2: B\n"));
    }

    #[test]
    fn choose_with_single_option() {
        let choices = vec![("basic".to_string(), "basic".to_string())];
        let mut input = scripted(&["basic"]);
        assert_eq!(input.choose(&choices, Some("Type")).unwrap(), "basic");
        assert!(output(input).contains("You can at the moment only choose (basic)"));
    }

    #[test]
    fn choose_empty_fails_without_reading() {
        let mut input = scripted(&["1"]);
        assert!(matches!(
            input.choose(&[], None),
            Err(PromptError::EmptyChoices)
        ));
        assert_eq!(remaining(input), "1\n");
    }

    #[test]
    fn dispatch_reprompts_with_field_error() {
        let field = PromptField::text("lang", "Language")
            .with_default("en")
            .with_rule("length", [2, 2])
            .with_error("Required and must be 2 characters");
        let mut input = scripted(&["eng", ""]);

        assert_eq!(input.dispatch(&field).unwrap(), "en");
        let out = output(input);
        assert!(out.contains("Required and must be 2 characters\n"));
        assert_eq!(out.matches("Language (Default value \"en\"): ").count(), 2);
    }

    #[test]
    fn dispatch_select_takes_default_and_field_error() {
        let field = PromptField::select("type", "Type", [("basic", "Basic"), ("resource", "Resource")])
            .with_default("basic")
            .with_error("Pick one of the listed types");
        let mut input = scripted(&["nope", ""]);

        assert_eq!(input.dispatch(&field).unwrap(), "basic");
        let out = output(input);
        assert_eq!(out.matches("Pick one of the listed types\n").count(), 1);
        assert_eq!(out.matches("basic: Basic\n").count(), 2);
        assert!(out.contains("(Default value \"basic\")"));
    }

    #[test]
    fn dispatch_masked_falls_back_to_plain_read() {
        let field = PromptField::masked("password", "Password").with_rule("length", [4, 64]);
        let mut input = scripted(&["abc", "secret"]);

        assert_eq!(input.dispatch(&field).unwrap(), "secret");
        let out = output(input);
        assert_eq!(out.matches(UNMASKED_WARNING).count(), 1);
        assert!(out.contains("Password (masked input): "));
        assert!(out.contains(MASKED_RETRY));
    }

    #[test]
    fn unknown_rule_is_fatal() {
        let field = PromptField::text("x", "X").with_rule("nope", Vec::<String>::new());
        let mut input = scripted(&["value"]);
        assert!(matches!(
            input.dispatch(&field),
            Err(PromptError::Validate(ValidateError::UnknownRule(_)))
        ));
    }

    #[test]
    fn collect_walks_set_and_honours_confirm() {
        let fields = FieldSet::new()
            .with(PromptField::text("host", "Host").with_default("localhost"))
            .with(PromptField::hidden("debug", "Debug").with_default("1"))
            .with(PromptField::confirm("confirm", "Are you sure?"));

        let mut input = scripted(&["", "yes"]);
        let values = input.collect(Some("Installing mail"), &fields).unwrap().unwrap();
        assert_eq!(
            values.iter().collect::<Vec<_>>(),
            vec![("host", "localhost"), ("debug", "1")]
        );

        let mut input = scripted(&["", "no"]);
        assert!(input.collect(None, &fields).unwrap().is_none());
    }

    #[test]
    fn prompt_label_has_single_colon() {
        assert_eq!(prompt_label("Name::", "x"), "Name:");
        assert_eq!(prompt_label("", "Choose input"), "Choose input:");
    }
}
