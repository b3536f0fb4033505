//! Batched insert-or-ignore writer for `fipe_carros`

use super::{redact_url, Backend, PersistError};
use crate::CollectedRecord;
use serde::Serialize;
use sqlx::any::{AnyPoolOptions, AnyQueryResult};
use sqlx::{AnyPool, Row};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Rows per transaction
pub const BATCH_SIZE: usize = 100;

/// Destination table
pub const TABLE_NAME: &str = "fipe_carros";

const MAX_CONNECTIONS: u32 = 5;

const INSERT_SQL: &str = "INSERT INTO fipe_carros (\
     marca, modelo, ano_modelo, combustivel, valor_str, valor, codigo_fipe, sigla_combustivel, data_consulta\
     ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
     ON CONFLICT (codigo_fipe, ano_modelo, combustivel) DO NOTHING";

/// Outcome of [`FipeWriter::write`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// Rows sent in batches that committed
    pub submitted: usize,
    /// Rows the database reported as actually inserted
    pub inserted: u64,
    /// Records dropped for missing `codigo_fipe`, `ano_modelo` or `valor`
    pub filtered_out: usize,
    /// Batches that failed and were skipped
    pub failed_batches: usize,
}

/// Writes collected records into `fipe_carros`
#[derive(Debug, Clone)]
pub struct FipeWriter {
    pool: AnyPool,
    backend: Backend,
}

impl FipeWriter {
    /// Open a pool for a PostgreSQL or SQLite URL
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, PersistError> {
        sqlx::any::install_default_drivers();
        let (backend, url) = Backend::detect(database_url)?;

        let options = match backend {
            Backend::Postgres => AnyPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(Duration::from_secs(10)),
            // An in-memory database lives as long as its one connection
            Backend::Sqlite => AnyPoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        };
        let pool = options
            .connect(&url)
            .await
            .map_err(|e| PersistError::Connect(e.to_string()))?;

        info!(%backend, url = %redact_url(&url), "Connected to database");
        Ok(Self { pool, backend })
    }

    /// Backend in use
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Create `fipe_carros` and its uniqueness constraint if absent
    pub async fn ensure_schema(&self) -> Result<(), PersistError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (\
             {id}, \
             marca VARCHAR(100), \
             modelo VARCHAR(150), \
             ano_modelo INTEGER, \
             combustivel VARCHAR(50), \
             valor_str VARCHAR(20), \
             valor FLOAT, \
             codigo_fipe VARCHAR(20), \
             sigla_combustivel VARCHAR(10), \
             data_consulta VARCHAR(50), \
             CONSTRAINT unique_fipe UNIQUE (codigo_fipe, ano_modelo, combustivel)\
             )",
            id = self.backend.id_column()
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| PersistError::Schema(e.to_string()))?;
        debug!(table = TABLE_NAME, "Schema ensured");
        Ok(())
    }

    /// Insert-or-ignore every persistable record.
    ///
    /// Records without `codigo_fipe`, `ano_modelo` or `valor` are dropped.
    /// Each batch of [`BATCH_SIZE`] rows commits on its own; a failing batch
    /// is logged and skipped.
    pub async fn write(&self, records: &[CollectedRecord]) -> WriteReport {
        let mut report = WriteReport::default();

        let rows: Vec<&CollectedRecord> = records.iter().filter(|r| r.is_persistable()).collect();
        report.filtered_out = records.len() - rows.len();

        if records.is_empty() {
            info!("No records collected, table ensured only");
            return report;
        }
        if rows.is_empty() {
            warn!(filtered_out = report.filtered_out, "No valid records after filtering");
            return report;
        }

        info!(
            rows = rows.len(),
            batch_size = BATCH_SIZE,
            filtered_out = report.filtered_out,
            "Saving records"
        );

        for (index, chunk) in rows.chunks(BATCH_SIZE).enumerate() {
            let batch = index + 1;
            match self.write_batch(batch, chunk).await {
                Ok(inserted) => {
                    report.submitted += chunk.len();
                    report.inserted += inserted;
                    debug!(batch, rows = chunk.len(), inserted, "Batch committed");
                }
                Err(e) => {
                    report.failed_batches += 1;
                    error!(batch, rows = chunk.len(), error = %e, "Batch failed, skipping");
                }
            }
        }

        info!(
            submitted = report.submitted,
            inserted = report.inserted,
            failed_batches = report.failed_batches,
            "Records saved"
        );
        report
    }

    async fn write_batch(&self, batch: usize, rows: &[&CollectedRecord]) -> Result<u64, PersistError> {
        let batch_error = |e: sqlx::Error| PersistError::Batch {
            batch,
            message: e.to_string(),
        };

        let mut tx = self.pool.begin().await.map_err(batch_error)?;
        let mut inserted = 0;
        for row in rows {
            let result: AnyQueryResult = sqlx::query(INSERT_SQL)
                .bind(row.marca.clone())
                .bind(row.modelo.clone())
                .bind(row.ano_modelo)
                .bind(row.combustivel.clone())
                .bind(row.valor_str.clone())
                .bind(row.valor)
                .bind(row.codigo_fipe.clone())
                .bind(row.sigla_combustivel.clone())
                .bind(row.data_consulta.clone())
                .execute(&mut *tx)
                .await
                .map_err(batch_error)?;
            inserted += result.rows_affected();
        }
        tx.commit().await.map_err(batch_error)?;
        Ok(inserted)
    }

    /// Rows currently in `fipe_carros`
    pub async fn count(&self) -> Result<i64, PersistError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) FROM {TABLE_NAME}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PersistError::Query(e.to_string()))?;
        row.try_get::<i64, _>(0)
            .map_err(|e| PersistError::Query(e.to_string()))
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
