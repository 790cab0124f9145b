//! core::paths
//!
//! Centralized path routing for project files.
//!
//! Every location trellis reads or writes inside a project is computed
//! here from the project root and the loaded [`Config`]. Relative config
//! values are joined onto the root; absolute values are used as-is.
//!
//! # Example
//!
//! ```
//! use trellis::core::config::Config;
//! use trellis::core::paths::ProjectPaths;
//! use std::path::PathBuf;
//!
//! let paths = ProjectPaths::new(PathBuf::from("/srv/app"), &Config::default());
//!
//! assert_eq!(paths.env_file(), PathBuf::from("/srv/app/.env"));
//! assert_eq!(
//!     paths.migration_ledger(),
//!     PathBuf::from("/srv/app/database/migrations/.applied.json")
//! );
//! ```

use std::path::{Path, PathBuf};

use super::config::Config;

/// File name of the applied-migrations ledger.
pub const MIGRATION_LEDGER: &str = ".applied.json";

/// Resolved project locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
    env_file: PathBuf,
    public_dir: PathBuf,
    migrations_dir: PathBuf,
    templates_dir: Option<PathBuf>,
}

impl ProjectPaths {
    pub fn new(root: PathBuf, config: &Config) -> Self {
        let join = |rel: &str| root.join(rel);
        Self {
            env_file: join(config.env_file()),
            public_dir: join(config.public_dir()),
            migrations_dir: join(config.migrations_dir()),
            templates_dir: config.templates_dir().map(join),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn env_file(&self) -> PathBuf {
        self.env_file.clone()
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    pub fn migration_ledger(&self) -> PathBuf {
        self.migrations_dir.join(MIGRATION_LEDGER)
    }

    pub fn templates_dir(&self) -> Option<&Path> {
        self.templates_dir.as_deref()
    }

    /// Resolve a path relative to the project root.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn config_file(&self) -> PathBuf {
        Config::project_config_path(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProjectConfig;

    fn config(project: ProjectConfig) -> Config {
        Config::with_project(project)
    }

    #[test]
    fn defaults_join_root() {
        let paths = ProjectPaths::new(PathBuf::from("/app"), &Config::default());
        assert_eq!(paths.root(), Path::new("/app"));
        assert_eq!(paths.env_file(), PathBuf::from("/app/.env"));
        assert_eq!(paths.public_dir(), Path::new("/app/public"));
        assert_eq!(paths.migrations_dir(), Path::new("/app/database/migrations"));
        assert!(paths.templates_dir().is_none());
        assert_eq!(paths.config_file(), PathBuf::from("/app/trellis.toml"));
    }

    #[test]
    fn configured_dirs_are_used() {
        let paths = ProjectPaths::new(
            PathBuf::from("/app"),
            &config(ProjectConfig {
                env_file: Some("config/.env.local".into()),
                public_dir: Some("www".into()),
                templates_dir: Some("stubs".into()),
                ..Default::default()
            }),
        );
        assert_eq!(paths.env_file(), PathBuf::from("/app/config/.env.local"));
        assert_eq!(paths.public_dir(), Path::new("/app/www"));
        assert_eq!(paths.templates_dir(), Some(Path::new("/app/stubs")));
    }

    #[test]
    fn absolute_values_are_kept() {
        let paths = ProjectPaths::new(
            PathBuf::from("/app"),
            &config(ProjectConfig {
                migrations_dir: Some("/var/migrations".into()),
                ..Default::default()
            }),
        );
        assert_eq!(
            paths.migration_ledger(),
            PathBuf::from("/var/migrations/.applied.json")
        );
    }
}
