//! Server store (PostgreSQL) access.
//!
//! Uses deadpool-postgres for connection pooling. Writes never touch
//! schema: the store reads column metadata from the destination and
//! only ever deletes and inserts rows. Values are bound as text and
//! cast to the destination column type inside the statement, which
//! keeps the writer agnostic of the exact column types the schema
//! declares.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use rustls::ClientConfig;
use tokio_postgres::types::ToSql;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, info, warn};

use super::BatchWriter;
use crate::config::ServerConfig;
use crate::core::{TableDescriptor, Value};
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL's per-statement bind parameter ceiling.
const MAX_BIND_PARAMS: usize = 65_535;

/// One destination column as the server describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgColumn {
    /// Column name.
    pub name: String,

    /// Column type per information_schema (e.g. "integer", "text").
    pub data_type: String,
}

/// Server-side PostgreSQL store.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
    schema: String,
}

impl PgStore {
    /// Connect to the server and verify the connection.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let mut pg_config = config.pg_config();
        pg_config.connect_timeout(POOL_CONNECTION_TIMEOUT);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = match config.ssl_mode.as_str() {
            "disable" => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(1)
                    .build()
                    .map_err(|e| MigrateError::pool(e, "creating PostgreSQL pool"))?
            }
            mode => {
                let tls = MakeRustlsConnect::new(build_tls_config(mode)?);
                let mgr = Manager::from_config(pg_config, tls, mgr_config);
                Pool::builder(mgr)
                    .max_size(1)
                    .build()
                    .map_err(|e| MigrateError::pool(e, "creating PostgreSQL pool"))?
            }
        };

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "testing PostgreSQL connection"))?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }

    /// Target schema name.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    fn qualify(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }

    /// Read the destination's column metadata for a table, in ordinal
    /// order. An empty result means the table does not exist.
    pub async fn columns(&self, table: &str) -> Result<Vec<PgColumn>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "reading column metadata"))?;
        let rows = client
            .query(
                "SELECT column_name, data_type \
                 FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 \
                 ORDER BY ordinal_position",
                &[&self.schema, &table],
            )
            .await?;
        Ok(rows
            .iter()
            .map(|row| PgColumn {
                name: row.get(0),
                data_type: row.get(1),
            })
            .collect())
    }

    /// Batch writer for one table.
    pub fn writer(&self, table: impl Into<String>, columns: Vec<PgColumn>) -> PgTableWriter {
        PgTableWriter {
            pool: self.pool.clone(),
            schema: self.schema.clone(),
            table: table.into(),
            columns,
        }
    }

    /// Row count for a table.
    pub async fn row_count(&self, table: &str) -> Result<i64> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "counting rows"))?;
        let sql = format!("SELECT COUNT(*) FROM {}", self.qualify(table));
        let row = client.query_one(&sql, &[]).await?;
        Ok(row.get(0))
    }

    /// Reset the sequence behind a generated-id column so the next
    /// value is `max(existing id) + 1`, or `1` for an empty table.
    ///
    /// Idempotent: re-running on an already-correct sequence changes
    /// nothing. Returns the next value, or `None` when the descriptor
    /// has no generated id or no sequence backs the column.
    pub async fn reset_sequence(&self, desc: &TableDescriptor) -> Result<Option<i64>> {
        let Some(id_col) = desc.generated_id else {
            return Ok(None);
        };

        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "resetting sequence"))?;

        let qualified = format!("{}.{}", self.schema, desc.name);
        let row = client
            .query_one(
                "SELECT pg_get_serial_sequence($1, $2)",
                &[&qualified, &id_col],
            )
            .await?;
        let sequence: Option<String> = row.get(0);
        let Some(sequence) = sequence else {
            debug!("{}: no sequence behind column {}", desc.name, id_col);
            return Ok(None);
        };

        let sql = format!(
            "SELECT MAX({})::bigint FROM {}",
            quote_ident(id_col),
            self.qualify(desc.name)
        );
        let max: Option<i64> = client.query_one(&sql, &[]).await?.get(0);

        let next = match max {
            Some(max) => {
                client
                    .query_one("SELECT setval($1::regclass, $2)", &[&sequence, &max])
                    .await?;
                max + 1
            }
            None => {
                client
                    .query_one("SELECT setval($1::regclass, 1, false)", &[&sequence])
                    .await?;
                1
            }
        };

        info!("{}: sequence {} reset, next value {}", desc.name, sequence, next);
        Ok(Some(next))
    }
}

/// Batch writer bound to one table of the server store.
pub struct PgTableWriter {
    pool: Pool,
    schema: String,
    table: String,
    columns: Vec<PgColumn>,
}

impl PgTableWriter {
    fn qualify(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    fn insert_sql(&self, row_count: usize) -> String {
        let cols = self
            .columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut values = Vec::with_capacity(row_count);
        let mut param = 1;
        for _ in 0..row_count {
            let row = self
                .columns
                .iter()
                .map(|c| {
                    let placeholder = format!("CAST(${} AS {})", param, c.data_type);
                    param += 1;
                    placeholder
                })
                .collect::<Vec<_>>()
                .join(", ");
            values.push(format!("({})", row));
        }

        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.qualify(),
            cols,
            values.join(", ")
        )
    }

    fn rows_per_statement(&self) -> usize {
        (MAX_BIND_PARAMS / self.columns.len().max(1)).max(1)
    }
}

#[async_trait]
impl BatchWriter for PgTableWriter {
    fn table(&self) -> &str {
        &self.table
    }

    async fn delete_all(&self) -> Result<u64> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "deleting destination rows"))?;
        let sql = format!("DELETE FROM {}", self.qualify());
        Ok(client.execute(&sql, &[]).await?)
    }

    async fn write_batch(&self, rows: &[Vec<Value>]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "writing batch"))?;
        let tx = client.transaction().await?;
        let mut written = 0u64;

        for chunk in rows.chunks(self.rows_per_statement()) {
            let sql = self.insert_sql(chunk.len());
            let params: Vec<Option<String>> = chunk
                .iter()
                .flat_map(|row| {
                    debug_assert_eq!(row.len(), self.columns.len());
                    row.iter().map(Value::to_text)
                })
                .collect();
            let refs: Vec<&(dyn ToSql + Sync)> =
                params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
            written += tx.execute(&sql, &refs).await?;
        }

        tx.commit().await?;
        Ok(written)
    }
}

/// Quote a PostgreSQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build TLS configuration for non-disable SSL modes.
fn build_tls_config(ssl_mode: &str) -> Result<ClientConfig> {
    match ssl_mode {
        "require" => {
            warn!("ssl_mode=require: TLS enabled but server certificate is not verified.");
            Ok(ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth())
        }
        "verify-full" => {
            let mut root_store = rustls::RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            Ok(ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth())
        }
        other => Err(MigrateError::Config(format!(
            "Invalid ssl_mode '{}'. Valid options: disable, require, verify-full",
            other
        ))),
    }
}

/// Certificate verifier that accepts any certificate, backing
/// `ssl_mode=require` (encryption without verification).
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
