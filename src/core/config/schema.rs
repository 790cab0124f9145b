//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$TRELLIS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/trellis/config.toml`
//! 3. `~/.trellis/config.toml`
//!
//! # Project Config
//!
//! Located at `trellis.toml` in the project root.
//!
//! # Validation
//!
//! Config values are validated after parsing: ports must be non-zero,
//! package names must be usable as env-key prefixes, and every package
//! field-set must be promptable.

use serde::Deserialize;

use super::ConfigError;
use crate::prompt::protocol::PromptProtocol;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// interactive = true
///
/// [server]
/// host = "localhost"
/// port = 8080
/// php = "php"
///
/// [test]
/// runner = "php vendor/bin/unitary"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default interactive mode
    pub interactive: Option<bool>,

    /// Development server defaults
    pub server: Option<ServerDefaults>,

    /// Test runner defaults
    pub test: Option<TestDefaults>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(server) = &self.server {
            server.validate()?;
        }
        if let Some(test) = &self.test {
            test.validate()?;
        }
        Ok(())
    }
}

/// Project configuration.
///
/// # Example
///
/// ```toml
/// env_file = ".env"
/// public_dir = "public"
///
/// [packages.mail]
/// host = { type = "text", message = "SMTP host", default = "localhost" }
/// port = 587
/// password = { type = "masked", message = "SMTP password" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Environment file, relative to the project root (default: ".env")
    pub env_file: Option<String>,

    /// Public web root (default: "public")
    pub public_dir: Option<String>,

    /// Migration directory (default: "database/migrations")
    pub migrations_dir: Option<String>,

    /// Directory holding `make.json` and template files
    pub templates_dir: Option<String>,

    /// Development server overrides
    pub server: Option<ServerDefaults>,

    /// Test runner overrides
    pub test: Option<TestDefaults>,

    /// Installable packages, each an ordered field-set
    pub packages: PromptProtocol,
}

impl ProjectConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, value) in [
            ("env_file", &self.env_file),
            ("public_dir", &self.public_dir),
            ("migrations_dir", &self.migrations_dir),
            ("templates_dir", &self.templates_dir),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!(
                    "{} cannot be empty",
                    label
                )));
            }
        }

        if let Some(server) = &self.server {
            server.validate()?;
        }
        if let Some(test) = &self.test {
            test.validate()?;
        }

        for (name, fields) in self.packages.iter() {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid package name '{}', use letters, digits and '_'",
                    name
                )));
            }
            fields
                .check(name)
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        }

        Ok(())
    }
}

/// Development server settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerDefaults {
    /// Host to bind
    pub host: Option<String>,

    /// Port to bind
    pub port: Option<u16>,

    /// PHP executable used for the built-in server
    pub php: Option<String>,

    /// Document root served by the built-in server
    pub public_dir: Option<String>,
}

impl ServerDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == Some(0) {
            return Err(ConfigError::InvalidValue(
                "server port cannot be 0".to_string(),
            ));
        }
        if self.host.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::InvalidValue(
                "server host cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Test runner settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TestDefaults {
    /// Command line of the test runner
    pub runner: Option<String>,
}

impl TestDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "test runner cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod global_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = GlobalConfig::default();
            assert!(config.interactive.is_none());
            assert!(config.server.is_none());
        }

        #[test]
        fn parses_sections() {
            let config: GlobalConfig = toml::from_str(
                r#"
                interactive = false

                [server]
                port = 9000

                [test]
                runner = "vendor/bin/phpunit"
                "#,
            )
            .unwrap();

            assert_eq!(config.interactive, Some(false));
            assert_eq!(config.server.unwrap().port, Some(9000));
            assert!(config.test.is_some());
        }

        #[test]
        fn zero_port_rejected() {
            let config = GlobalConfig {
                server: Some(ServerDefaults {
                    port: Some(0),
                    ..Default::default()
                }),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn reject_unknown_fields() {
            let result: Result<GlobalConfig, _> = toml::from_str("colour = true");
            assert!(result.is_err());
        }
    }

    mod project_config {
        use super::*;

        #[test]
        fn packages_keep_document_order() {
            let config: ProjectConfig = toml::from_str(
                r#"
                [packages.mail]
                host = { type = "text", message = "SMTP host" }

                [packages.database]
                host = { type = "text", message = "Database host", default = "127.0.0.1" }
                name = "app"
                "#,
            )
            .unwrap();

            let names: Vec<_> = config.packages.names().collect();
            assert_eq!(names, vec!["mail", "database"]);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn invalid_package_name_rejected() {
            let config: ProjectConfig = toml::from_str(
                r#"
                [packages."bad-name"]
                host = "x"
                "#,
            )
            .unwrap();
            assert!(config.validate().is_err());
        }

        #[test]
        fn empty_select_rejected() {
            let config: ProjectConfig = toml::from_str(
                r#"
                [packages.cache]
                driver = { type = "select", message = "Driver" }
                "#,
            )
            .unwrap();
            assert!(config.validate().is_err());
        }

        #[test]
        fn empty_env_file_rejected() {
            let config = ProjectConfig {
                env_file: Some(" ".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
    }
}
