//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`prompts`] - Interactive line input: prompts, confirmations, menus
//! - [`validate`] - Named validators used by the prompts
//! - [`help`] - Help text generated from method docs and the protocol
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All output and prompts go through this module so interactive and
//! non-interactive runs behave consistently.

pub mod help;
pub mod output;
pub mod prompts;
pub mod validate;
