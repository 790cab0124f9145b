//! core::fs
//!
//! Atomic file writes.
//!
//! Every file trellis produces (`.env`, generated sources, the migration
//! ledger) is written to a temp file in the target directory, synced, and
//! renamed over the destination. Readers never observe a half-written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error from an atomic write.
#[derive(Debug, Error)]
#[error("failed to write '{path}': {source}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Write `contents` to `path` atomically, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), WriteError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap(path))?;
    }

    let temp_path = temp_path_for(path);
    let mut file = fs::File::create(&temp_path).map_err(wrap(&temp_path))?;
    file.write_all(contents).map_err(wrap(&temp_path))?;
    file.sync_all().map_err(wrap(&temp_path))?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(wrap(path)(e));
    }

    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote file");
    Ok(())
}

fn wrap(path: &Path) -> impl FnOnce(std::io::Error) -> WriteError {
    let path = path.to_path_buf();
    move |source| WriteError { path, source }
}

/// `.<name>.tmp` next to the destination.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_parents_and_writes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app/Models/UserRequestModel.php");

        write_atomic(&path, b"<?php\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "<?php\n");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn replaces_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".env");
        fs::write(&path, "OLD=1\n").unwrap();

        write_atomic(&path, b"NEW=1\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "NEW=1\n");
    }

    #[test]
    fn reports_failing_path() {
        let temp = TempDir::new().unwrap();
        // A file where a directory is expected.
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let err = write_atomic(&blocker.join("child.txt"), b"x").unwrap_err();
        assert!(err.path.starts_with(&blocker));
    }
}
