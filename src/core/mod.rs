//! core
//!
//! Project-level collaborators used by the connectors.
//!
//! # Modules
//!
//! - [`config`] - Configuration schema and loading
//! - [`env`] - `.env` file reading and rewriting
//! - [`fs`] - Atomic file writes
//! - [`paths`] - Centralized path routing for project files
//!
//! Nothing here prompts or prints; user interaction lives in [`crate::ui`].

pub mod config;
pub mod env;
pub mod fs;
pub mod paths;
