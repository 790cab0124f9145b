//! migrate connector - Apply SQL migrations
//!
//! # Architecture
//!
//! Migrations are the `*.sql` files under the migrations directory, in
//! path order. The prompt offers `0` (All) plus one numbered item per
//! file; `--migration` accepts either the number or the migration name.
//!
//! Applying goes through the [`Migrator`] trait. [`LedgerMigrator`]
//! records each applied migration with its SHA-256 checksum in a JSON
//! ledger next to the migrations, and skips migrations whose name and
//! checksum are already recorded. A migration whose file changed since it
//! was recorded is applied again.

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::{Connector, Context, Session};
use crate::cli::flags::Invocation;
use crate::core::fs::{write_atomic, WriteError};
use crate::doc::metadata::{MethodDoc, MethodTable};
use crate::doc::CommandMetadata;
use crate::prompt::field::PromptField;
use crate::prompt::protocol::{FieldSet, PromptProtocol};

const METHODS: &[MethodDoc] = &[MethodDoc::documented(
    "migrate",
    "/**
      * Migrate the database
      * @return void
      */",
)];

const ALL: &str = "0";

/// One migration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Path relative to the migrations directory, without `.sql`.
    pub name: String,
    pub path: PathBuf,
    pub sql: String,
    /// Hex SHA-256 of `sql`.
    pub checksum: String,
}

impl Migration {
    pub fn new(name: &str, path: PathBuf, sql: String) -> Self {
        let checksum = hex::encode(Sha256::digest(sql.as_bytes()));
        Self {
            name: name.to_string(),
            path,
            sql,
            checksum,
        }
    }
}

/// Result of applying one migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    Applied,
    AlreadyApplied,
}

/// Applies migrations.
pub trait Migrator {
    /// SQL that applying `migration` would run.
    fn read(&self, migration: &Migration) -> String {
        migration.sql.clone()
    }

    fn apply(&mut self, migration: &Migration) -> Result<MigrationOutcome>;
}

/// Errors from the migration ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read ledger {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger corrupted: {0}")]
    Corrupted(String),

    #[error("failed to serialize ledger: {0}")]
    Serialize(String),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// A recorded migration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub name: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
}

/// [`Migrator`] that records applied migrations in a JSON file.
#[derive(Debug)]
pub struct LedgerMigrator {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
}

impl LedgerMigrator {
    /// Open the ledger at `path`. A missing file is an empty ledger.
    pub fn open(path: PathBuf) -> Result<Self, LedgerError> {
        let entries = match fs::read_to_string(&path) {
            Ok(json) => {
                serde_json::from_str(&json).map_err(|e| LedgerError::Corrupted(e.to_string()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(LedgerError::Read { path, source }),
        };
        Ok(Self { path, entries })
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn is_applied(&self, migration: &Migration) -> bool {
        self.entries
            .iter()
            .any(|e| e.name == migration.name && e.checksum == migration.checksum)
    }

    fn save(&self) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| LedgerError::Serialize(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())?;
        Ok(())
    }
}

impl Migrator for LedgerMigrator {
    fn apply(&mut self, migration: &Migration) -> Result<MigrationOutcome> {
        if self.is_applied(migration) {
            return Ok(MigrationOutcome::AlreadyApplied);
        }

        let entry = LedgerEntry {
            name: migration.name.clone(),
            checksum: migration.checksum.clone(),
            applied_at: Utc::now(),
        };
        match self.entries.iter_mut().find(|e| e.name == migration.name) {
            Some(existing) => {
                tracing::warn!(migration = %migration.name, "migration changed since it was applied");
                *existing = entry;
            }
            None => self.entries.push(entry),
        }
        self.save()?;
        Ok(MigrationOutcome::Applied)
    }
}

/// The `migrate` connector.
pub struct Migrate {
    table: MethodTable,
    protocol: PromptProtocol,
    migrations: Vec<Migration>,
    dir: PathBuf,
}

impl Migrate {
    /// Discover migrations. A missing directory has none.
    pub fn new(ctx: &Context) -> Result<Self> {
        let dir = ctx.paths.migrations_dir().to_path_buf();
        let migrations = discover(&dir)?;
        tracing::debug!(dir = %dir.display(), count = migrations.len(), "discovered migrations");

        let protocol = PromptProtocol::new().with("migrate", Self::fields(&migrations));
        Ok(Self {
            table: MethodTable::new("Migrate", METHODS),
            protocol,
            migrations,
            dir,
        })
    }

    fn fields(migrations: &[Migration]) -> FieldSet {
        let items = std::iter::once((ALL.to_string(), "All".to_string())).chain(
            migrations
                .iter()
                .enumerate()
                .map(|(i, m)| ((i + 1).to_string(), m.name.clone())),
        );
        FieldSet::new()
            .with(
                PromptField::select("migration", "Choose migration", items)
                    .with_description("Choose a migration file"),
            )
            .with(
                PromptField::hidden("read", "Read sql output without migration")
                    .with_description("Read sql output without migration"),
            )
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn run<R: BufRead, W: Write>(
        &self,
        session: &mut Session<'_, R, W>,
        invocation: &Invocation,
        migrator: &mut dyn Migrator,
    ) -> Result<()> {
        let read_only = match invocation.action() {
            None | Some("migrate") => session.has_flag("read"),
            Some("read") => true,
            Some("help") => {
                self.help(session.writer())?;
                return Ok(());
            }
            Some(other) => {
                session.failure(format!("The action \"{}\" does not exist.", other))?;
                self.help(session.writer())?;
                return Ok(());
            }
        };

        if self.migrations.is_empty() {
            return session.message(format!("No migrations found in {}", self.dir.display()));
        }

        let fields = self.protocol.require("migrate")?;
        let resolved = session
            .resolve("migrate", "Install the database", fields)
            .context("The package \"migrate\" is not configured correctly")?;
        let Some(values) = resolved else {
            return Ok(());
        };

        let selected = self.select(values.get("migration").unwrap_or(ALL))?;
        for migration in selected {
            if read_only {
                session.message(migrator.read(migration))?;
                continue;
            }
            match migrator.apply(migration)? {
                MigrationOutcome::Applied => {
                    session.message(format!("{} has successfully migrated!", migration.name))?
                }
                MigrationOutcome::AlreadyApplied => {
                    session.message(format!("{} is already migrated.", migration.name))?
                }
            }
        }
        Ok(())
    }

    /// Migrations for a menu key or a migration name.
    fn select(&self, choice: &str) -> Result<Vec<&Migration>> {
        let choice = choice.trim();
        if choice == ALL {
            return Ok(self.migrations.iter().collect());
        }
        let by_index = choice
            .parse::<usize>()
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.migrations.get(i));
        let found = by_index.or_else(|| {
            let name = choice.strip_suffix(".sql").unwrap_or(choice);
            self.migrations.iter().find(|m| m.name == name)
        });
        match found {
            Some(migration) => Ok(vec![migration]),
            None => bail!("The migration \"{}\" does not exist!", choice),
        }
    }
}

/// Every `*.sql` file under `dir`, sorted by path.
fn discover(dir: &Path) -> Result<Vec<Migration>> {
    let mut files = Vec::new();
    if dir.is_dir() {
        collect_sql(dir, &mut files)?;
    }
    files.sort();

    files
        .into_iter()
        .map(|path| -> Result<Migration> {
            let relative = path.strip_prefix(dir).unwrap_or(path.as_path()).with_extension("");
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let sql = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(Migration::new(&name, path, sql))
        })
        .collect()
}

fn collect_sql(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_sql(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    Ok(())
}

impl Connector for Migrate {
    fn name(&self) -> &'static str {
        "migrate"
    }

    fn metadata(&self) -> &dyn CommandMetadata {
        &self.table
    }

    fn protocol(&self) -> &PromptProtocol {
        &self.protocol
    }
}
