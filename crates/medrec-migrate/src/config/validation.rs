//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.dir.as_os_str().is_empty() {
        return Err(MigrateError::Config("source.dir is required".into()));
    }
    if config.source.record_element.trim().is_empty() {
        return Err(MigrateError::Config(
            "source.record_element must not be empty".into(),
        ));
    }

    if config.store.path.as_os_str().is_empty() {
        return Err(MigrateError::Config("store.path is required".into()));
    }

    if let Some(server) = &config.server {
        if server.host.is_empty() {
            return Err(MigrateError::Config("server.host is required".into()));
        }
        if server.database.is_empty() {
            return Err(MigrateError::Config("server.database is required".into()));
        }
        if server.user.is_empty() {
            return Err(MigrateError::Config("server.user is required".into()));
        }
        match server.ssl_mode.as_str() {
            "disable" | "require" | "verify-full" => {}
            other => {
                return Err(MigrateError::Config(format!(
                    "server.ssl_mode must be one of disable, require, verify-full, got '{}'",
                    other
                )));
            }
        }
    }

    if config.migration.batch_capacity == 0 {
        return Err(MigrateError::Config(
            "migration.batch_capacity must be at least 1".into(),
        ));
    }
    if config.migration.tables.is_empty() {
        return Err(MigrateError::Config(
            "migration.tables must list at least one table".into(),
        ));
    }

    Ok(())
}
