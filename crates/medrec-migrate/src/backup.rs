//! Run artifacts: pre-run backup, post-run audit copy.
//!
//! The backup is the sole recovery mechanism: there is no run-wide
//! rollback, so a timestamped copy of the embedded store is taken
//! before any destructive step.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{MigrateError, Result};

/// Copy the store file to a timestamped backup before destructive work.
///
/// The backup lands next to the store unless `dir` overrides it.
pub fn backup_store(store: &Path, dir: Option<&Path>, at: DateTime<Utc>) -> Result<PathBuf> {
    if !store.is_file() {
        return Err(MigrateError::Precondition(format!(
            "cannot back up missing store: {}",
            store.display()
        )));
    }

    let file_name = store
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| MigrateError::Config(format!("invalid store path: {}", store.display())))?;
    let backup_name = format!("{}.backup_{}", file_name, at.format("%Y%m%d_%H%M%S"));

    let target_dir = match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.to_path_buf()
        }
        None => store.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
    };

    let backup_path = target_dir.join(backup_name);
    std::fs::copy(store, &backup_path)?;
    info!("Backup created: {}", backup_path.display());
    Ok(backup_path)
}

/// Copy the migrated store to an audit location after the run.
pub fn audit_copy(store: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::copy(store, dest)?;
    info!("Audit copy written: {}", dest.display());
    Ok(())
}
