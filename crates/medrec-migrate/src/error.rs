//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A precondition failed before any destructive work started
    /// (missing source file, unreachable destination, absent store).
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// XML source could not be read or parsed.
    #[error("XML source error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Embedded store (SQLite) error.
    #[error("Embedded store error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// Server store (PostgreSQL) error.
    #[error("Server store error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Connection pool error with context.
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Delete or bulk insert failed for a specific table.
    #[error("Load failed for table {table}: {message}")]
    Load { table: String, message: String },

    /// Reconciliation failed (row counts could not be compared).
    #[error("Verification error: {0}")]
    Verify(String),

    /// IO error (file operations, backups).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred.
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Load error for a table.
    pub fn load(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Load {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Json(_) => 1,
            MigrateError::Precondition(_) => 2,
            MigrateError::Load { .. } => 3,
            MigrateError::Sqlite(_) | MigrateError::Postgres(_) | MigrateError::Pool { .. } => 4,
            MigrateError::Xml(_) => 5,
            MigrateError::Verify(_) => 6,
            MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
