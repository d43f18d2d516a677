//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::descriptor::default_table_order;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Legacy XML export location (import source).
    pub source: SourceConfig,

    /// Embedded store (import destination, transfer source).
    pub store: StoreConfig,

    /// Server store (transfer destination). Optional: import-only
    /// deployments never touch it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Legacy XML export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory holding the export files.
    pub dir: PathBuf,

    /// Patients export file name.
    #[serde(default = "default_patients_file")]
    pub patients_file: String,

    /// Visits export file name.
    #[serde(default = "default_visits_file")]
    pub visits_file: String,

    /// Prescriptions export file name.
    #[serde(default = "default_prescriptions_file")]
    pub prescriptions_file: String,

    /// Payments export file name.
    #[serde(default = "default_payments_file")]
    pub payments_file: String,

    /// Repeating record element name inside each export.
    #[serde(default = "default_record_element")]
    pub record_element: String,
}

impl SourceConfig {
    /// Export file path for a destination table, if the table has one.
    pub fn file_for(&self, table: &str) -> Option<PathBuf> {
        let name = match table {
            "patients" => &self.patients_file,
            "visits" => &self.visits_file,
            "prescriptions" => &self.prescriptions_file,
            "payments" => &self.payments_file,
            _ => return None,
        };
        Some(self.dir.join(name))
    }
}

/// Embedded store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Server store (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Target schema (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,

    /// SSL mode: disable, require, or verify-full (default: "disable").
    #[serde(default = "default_disable")]
    pub ssl_mode: String,
}

// Manual Debug so connection dumps in logs never leak the password.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Records accumulated before a transactional flush.
    #[serde(default = "default_batch_capacity")]
    pub batch_capacity: usize,

    /// Rejected records logged per table before counting silently.
    #[serde(default = "default_error_sample_limit")]
    pub error_sample_limit: u64,

    /// Directory for the pre-run backup (default: next to the store).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    /// Post-run audit copy of the store, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_copy: Option<PathBuf>,

    /// Table processing order for the inter-store transfer.
    #[serde(default = "default_table_order")]
    pub tables: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_capacity: default_batch_capacity(),
            error_sample_limit: default_error_sample_limit(),
            backup_dir: None,
            audit_copy: None,
            tables: default_table_order(),
        }
    }
}

// Default value functions for serde

fn default_patients_file() -> String {
    "pat.xml".to_string()
}

fn default_visits_file() -> String {
    "vi.xml".to_string()
}

fn default_prescriptions_file() -> String {
    "or.xml".to_string()
}

fn default_payments_file() -> String {
    "pay.xml".to_string()
}

fn default_record_element() -> String {
    "Table_Contenu".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_disable() -> String {
    "disable".to_string()
}

fn default_batch_capacity() -> usize {
    1000
}

fn default_error_sample_limit() -> u64 {
    5
}
