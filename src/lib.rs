//! Trellis - prompt-driven maintenance commands for PHP web applications
//!
//! Trellis installs an application and its packages into the env file,
//! generates files from templates, applies SQL migrations, runs the
//! development server and the test suites. Every command that needs input
//! declares it as a prompt protocol: supplied `--name=value` flags are used
//! as given, hidden fields fall back to their defaults, and only what is
//! left is asked for interactively.
//!
//! # Architecture
//!
//! - [`cli`] - Argument parsing, connector dispatch and the connectors
//! - [`prompt`] - Prompt fields, protocols and the argument resolver
//! - [`doc`] - Doc-comment parsing and per-command method metadata
//! - [`ui`] - Interactive input, validation, help rendering and output
//! - [`core`] - Configuration, env file, project paths and atomic writes
//!
//! # Invariants
//!
//! 1. A supplied flag is never asked for again
//! 2. Only non-hidden fields without a supplied flag are prompted
//! 3. Resolved values keep the declaration order of their field-set
//! 4. Files are written atomically or not at all

pub mod cli;
pub mod core;
pub mod doc;
pub mod prompt;
pub mod ui;
