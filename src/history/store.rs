// src/history/store.rs
// SQLite-backed scan history. Concurrency control is left to SQLite:
// AUTOINCREMENT hands out ids, the write lock serializes inserts.

use sqlx::SqlitePool;
use tracing::debug;

use super::types::{NewScan, ScanRecord, ScanStats, REMEDIES_ENCODING_V1};
use super::StoreError;
use crate::server::db;

#[derive(Clone)]
pub struct ScanStore {
    pool: SqlitePool,
}

impl ScanStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one scan and return its id. Identical submissions are not
    /// deduplicated.
    pub async fn create(&self, scan: &NewScan) -> Result<i64, StoreError> {
        let remedies = scan
            .remedies
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO history
                (plant_name, disease_name, confidence, image_url, remedies, remedies_encoding)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&scan.plant_name)
        .bind(&scan.disease_name)
        .bind(scan.confidence)
        .bind(&scan.image_url)
        .bind(remedies)
        .bind(REMEDIES_ENCODING_V1)
        .fetch_one(&self.pool)
        .await?;

        debug!("Stored scan {} ({:?})", id, scan.disease_name);
        Ok(id)
    }

    /// All scans, newest first. Rows written within the same millisecond
    /// fall back to id order.
    pub async fn list(&self) -> Result<Vec<ScanRecord>, StoreError> {
        let records = sqlx::query_as::<_, ScanRecord>(
            r#"
            SELECT id, plant_name, disease_name, confidence, image_url,
                   remedies, remedies_encoding, created_at
            FROM history
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Totals from a single statement, so both counts see the same rows
    pub async fn stats(&self) -> Result<ScanStats, StoreError> {
        let (total, healthy): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN disease_name LIKE '%healthy%' THEN 1 ELSE 0 END), 0)
            FROM history
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ScanStats::from_counts(total, healthy))
    }

    pub async fn schema_version(&self) -> Result<i64, StoreError> {
        db::get_schema_version(&self.pool).await
    }

    /// Cheap liveness check used by /health
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
