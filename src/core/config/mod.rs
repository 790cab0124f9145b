//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Trellis has two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Settings and installable packages for one application
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$TRELLIS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/trellis/config.toml`
//! 3. `~/.trellis/config.toml`
//!
//! # Project Config Location
//!
//! `trellis.toml` in the project root.
//!
//! # Example
//!
//! ```no_run
//! use trellis::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/app"))).unwrap();
//! let config = result.config;
//!
//! println!("Env file: {}", config.env_file());
//! println!("Serving on port {}", config.server_port());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, ProjectConfig, ServerDefaults, TestDefaults};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::prompt::protocol::PromptProtocol;

/// File name of the project config.
pub const PROJECT_CONFIG_FILE: &str = "trellis.toml";

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_PUBLIC_DIR: &str = "public";
pub const DEFAULT_MIGRATIONS_DIR: &str = "database/migrations";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PHP: &str = "php";
pub const DEFAULT_TEST_RUNNER: &str = "php vendor/bin/unitary";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence automatically: project over global over
/// built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Project configuration (defaults when no `trellis.toml` exists)
    pub project: ProjectConfig,
    global_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
}

impl Config {
    /// Configuration built from a project table alone, with global defaults
    /// and no backing files.
    pub fn with_project(project: ProjectConfig) -> Self {
        Self {
            project,
            ..Self::default()
        }
    }

    /// Load configuration from default locations.
    ///
    /// If `project_root` is provided, also loads `trellis.toml` from it.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(project_root: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();
        let global_path = Self::find_global(&mut warnings);
        Self::load_from(global_path.as_deref(), project_root, warnings)
    }

    /// Load configuration from an explicit global file path.
    pub fn load_from(
        global_path: Option<&Path>,
        project_root: Option<&Path>,
        warnings: Vec<ConfigWarning>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let global: GlobalConfig = match global_path {
            Some(path) => read_toml(path)?,
            None => GlobalConfig::default(),
        };

        let project_path = project_root
            .map(Self::project_config_path)
            .filter(|p| p.exists());
        let project: ProjectConfig = match &project_path {
            Some(path) => read_toml(path)?,
            None => ProjectConfig::default(),
        };

        global.validate()?;
        project.validate()?;

        tracing::debug!(
            global = ?global_path,
            project = ?project_path,
            packages = project.packages.len(),
            "loaded configuration"
        );

        Ok(ConfigLoadResult {
            config: Config {
                global,
                project,
                global_path: global_path.map(Path::to_path_buf),
                project_path,
            },
            warnings,
        })
    }

    /// Locate the global config file, if any.
    fn find_global(warnings: &mut Vec<ConfigWarning>) -> Option<PathBuf> {
        // 1. Check $TRELLIS_CONFIG
        if let Ok(path) = std::env::var("TRELLIS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            warnings.push(ConfigWarning {
                message: "TRELLIS_CONFIG points to a missing file, ignoring it".to_string(),
                path,
            });
        }

        // 2. Check $XDG_CONFIG_HOME/trellis/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("trellis/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.trellis/config.toml
        dirs::home_dir()
            .map(|home| home.join(".trellis/config.toml"))
            .filter(|path| path.exists())
    }

    /// Path of the project config for `root`.
    pub fn project_config_path(root: &Path) -> PathBuf {
        root.join(PROJECT_CONFIG_FILE)
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Check if interactive mode is enabled by default.
    ///
    /// Defaults to `true` if not configured.
    pub fn interactive(&self) -> bool {
        self.global.interactive.unwrap_or(true)
    }

    pub fn env_file(&self) -> &str {
        self.project.env_file.as_deref().unwrap_or(DEFAULT_ENV_FILE)
    }

    /// Public web root.
    ///
    /// `public_dir` wins over `[server] public_dir`; project over global.
    pub fn public_dir(&self) -> &str {
        self.project
            .public_dir
            .as_deref()
            .or_else(|| self.server(|s| s.public_dir.as_deref()))
            .unwrap_or(DEFAULT_PUBLIC_DIR)
    }

    pub fn migrations_dir(&self) -> &str {
        self.project
            .migrations_dir
            .as_deref()
            .unwrap_or(DEFAULT_MIGRATIONS_DIR)
    }

    /// Directory with custom make templates, if configured.
    pub fn templates_dir(&self) -> Option<&str> {
        self.project.templates_dir.as_deref()
    }

    pub fn server_host(&self) -> &str {
        self.server(|s| s.host.as_deref()).unwrap_or(DEFAULT_HOST)
    }

    pub fn server_port(&self) -> u16 {
        self.server(|s| s.port).unwrap_or(DEFAULT_PORT)
    }

    pub fn php(&self) -> &str {
        self.server(|s| s.php.as_deref()).unwrap_or(DEFAULT_PHP)
    }

    pub fn test_runner(&self) -> &str {
        self.project
            .test
            .as_ref()
            .and_then(|t| t.runner.as_deref())
            .or_else(|| self.global.test.as_ref().and_then(|t| t.runner.as_deref()))
            .unwrap_or(DEFAULT_TEST_RUNNER)
    }

    /// Installable packages from the project config.
    pub fn packages(&self) -> &PromptProtocol {
        &self.project.packages
    }

    /// Effective settings as `(key, value)` pairs, in a stable order.
    pub fn describe(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("interactive".to_string(), self.interactive().to_string()),
            ("env_file".to_string(), self.env_file().to_string()),
            ("public_dir".to_string(), self.public_dir().to_string()),
            ("migrations_dir".to_string(), self.migrations_dir().to_string()),
            (
                "templates_dir".to_string(),
                self.templates_dir().unwrap_or("(built-in)").to_string(),
            ),
            ("server.host".to_string(), self.server_host().to_string()),
            ("server.port".to_string(), self.server_port().to_string()),
            ("server.php".to_string(), self.php().to_string()),
            ("test.runner".to_string(), self.test_runner().to_string()),
        ];
        for (key, path) in [
            ("config.global", self.global_config_loaded_from()),
            ("config.project", self.project_config_loaded_from()),
        ] {
            let source = path.map_or_else(|| "(none)".to_string(), |p| p.display().to_string());
            out.push((key.to_string(), source));
        }
        for (name, fields) in self.packages().iter() {
            let keys: Vec<_> = fields.keys().collect();
            out.push((format!("packages.{}", name), keys.join(", ")));
        }
        out
    }

    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    /// First value found in project `[server]`, then global `[server]`.
    fn server<'a, T>(&'a self, pick: impl Fn(&'a ServerDefaults) -> Option<T>) -> Option<T> {
        self.project
            .server
            .as_ref()
            .and_then(&pick)
            .or_else(|| self.global.server.as_ref().and_then(&pick))
    }
}

/// Read and parse a TOML config file.
fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(global: Option<&str>, project: Option<&str>) -> Result<Config, ConfigError> {
        let temp = TempDir::new().unwrap();
        let global_path = global.map(|contents| {
            let path = temp.path().join("global.toml");
            fs::write(&path, contents).unwrap();
            path
        });
        if let Some(contents) = project {
            fs::write(temp.path().join(PROJECT_CONFIG_FILE), contents).unwrap();
        }
        Config::load_from(global_path.as_deref(), Some(temp.path()), Vec::new())
            .map(|r| r.config)
    }

    #[test]
    fn load_empty_defaults() {
        let config = load(None, None).unwrap();

        assert!(config.interactive());
        assert_eq!(config.env_file(), ".env");
        assert_eq!(config.public_dir(), "public");
        assert_eq!(config.migrations_dir(), "database/migrations");
        assert_eq!(config.server_host(), "localhost");
        assert_eq!(config.server_port(), 8080);
        assert_eq!(config.php(), "php");
        assert_eq!(config.test_runner(), "php vendor/bin/unitary");
        assert!(config.packages().is_empty());
        assert!(config.project_config_loaded_from().is_none());
    }

    #[test]
    fn load_global_values() {
        let config = load(
            Some(
                r#"
                interactive = false

                [server]
                port = 9000
                "#,
            ),
            None,
        )
        .unwrap();

        assert!(!config.interactive());
        assert_eq!(config.server_port(), 9000);
        assert!(config.global_config_loaded_from().is_some());
    }

    #[test]
    fn precedence_project_overrides_global() {
        let config = load(
            Some(
                r#"
                [server]
                host = "0.0.0.0"
                port = 9000
                public_dir = "www"

                [test]
                runner = "global-runner"
                "#,
            ),
            Some(
                r#"
                [server]
                port = 8000

                [test]
                runner = "vendor/bin/phpunit"
                "#,
            ),
        )
        .unwrap();

        assert_eq!(config.server_host(), "0.0.0.0");
        assert_eq!(config.server_port(), 8000);
        assert_eq!(config.public_dir(), "www");
        assert_eq!(config.test_runner(), "vendor/bin/phpunit");
    }

    #[test]
    fn public_dir_key_wins_over_server_table() {
        let config = load(
            None,
            Some(
                r#"
                public_dir = "htdocs"

                [server]
                public_dir = "www"
                "#,
            ),
        )
        .unwrap();
        assert_eq!(config.public_dir(), "htdocs");
    }

    #[test]
    fn packages_loaded_from_project() {
        let config = load(
            None,
            Some(
                r#"
                [packages.mail]
                host = { type = "text", message = "SMTP host", default = "localhost" }
                port = 587
                "#,
            ),
        )
        .unwrap();

        let mail = config.packages().get("mail").unwrap();
        assert_eq!(mail.keys().collect::<Vec<_>>(), vec!["host", "port"]);

        let described = config.describe();
        assert!(described
            .iter()
            .any(|(k, v)| k == "packages.mail" && v == "host, port"));
    }

    #[test]
    fn with_project_has_no_backing_files() {
        let project: ProjectConfig = toml::from_str("public_dir = \"web\"").unwrap();
        let config = Config::with_project(project);

        assert_eq!(config.public_dir(), "web");
        assert_eq!(config.server_port(), DEFAULT_PORT);
        assert!(config.global_config_loaded_from().is_none());
        assert!(config.project_config_loaded_from().is_none());
        assert!(config
            .describe()
            .iter()
            .any(|(k, v)| k == "config.project" && v == "(none)"));
    }

    #[test]
    fn unknown_fields_rejected() {
        let result = load(None, Some("trunk = \"main\""));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn invalid_values_rejected() {
        let result = load(Some("[server]\nport = 0"), None);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }
}
