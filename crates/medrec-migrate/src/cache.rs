//! Cross-table patient lookup.
//!
//! Payments denormalize patient display names. The cache is the
//! minimal code → (first, last) projection of the already-loaded
//! patients table, built exactly once per run after that table
//! finishes loading, and read-only for the remainder of the run. It is
//! never refreshed mid-run: within one run the source is static, and
//! every run rebuilds it from scratch anyway.

use std::collections::HashMap;

use sqlx::Row;
use tracing::info;

use crate::error::Result;
use crate::store::SqliteStore;

/// Patient code → (first name, last name).
#[derive(Debug, Clone, Default)]
pub struct PatientCache {
    entries: HashMap<i64, (String, String)>,
}

impl PatientCache {
    /// Build the cache from the loaded patients table.
    pub async fn load(store: &SqliteStore) -> Result<Self> {
        let rows = sqlx::query("SELECT code, first_name, last_name FROM patients")
            .fetch_all(store.pool())
            .await?;

        let entries: HashMap<i64, (String, String)> = rows
            .iter()
            .map(|row| {
                let code: i64 = row.get(0);
                let first: String = row.get(1);
                let last: String = row.get(2);
                (code, (first, last))
            })
            .collect();

        info!("Patient cache ready: {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Build a cache from known entries (tests, tooling).
    pub fn from_entries(
        entries: impl IntoIterator<Item = (i64, (String, String))>,
    ) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Look up a patient by code.
    #[must_use]
    pub fn get(&self, code: i64) -> Option<(&str, &str)> {
        self.entries
            .get(&code)
            .map(|(first, last)| (first.as_str(), last.as_str()))
    }

    /// Number of cached patients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
