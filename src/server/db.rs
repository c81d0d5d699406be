//! Database pool configuration and migrations

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::history::StoreError;

/// Migrations embedded from `./migrations` at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Pool tuning knobs, filled from the service config
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Create an optimized SQLite connection pool
///
/// The database file is created if missing. WAL lets readers proceed while
/// SQLite serializes the writers; the busy timeout makes concurrent inserts
/// wait for the write lock instead of failing.
pub async fn create_optimized_pool(database_url: &str, settings: &PoolSettings) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(settings.busy_timeout);

    let pool = SqlitePoolOptions::new()
        // SQLite is single-writer, but can have multiple readers
        .max_connections(settings.max_connections.max(1))
        .min_connections(1)
        .acquire_timeout(settings.acquire_timeout)
        // Recycle connections periodically
        .max_lifetime(Duration::from_secs(1800))
        .idle_timeout(Duration::from_secs(600))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Single-connection in-memory pool.
///
/// Every `:memory:` connection is its own database, so the pool must never
/// open a second one or recycle the first.
pub async fn connect_in_memory() -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Apply any pending migrations.
///
/// Uses SQLite's `_sqlx_migrations` table to track applied migrations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    let pending = MIGRATOR
        .migrations
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .count();

    info!("Checking {} known migrations...", pending);

    MIGRATOR.run(pool).await?;

    info!("Migrations complete");
    Ok(())
}

/// Get current schema version (number of applied migrations)
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i64, StoreError> {
    let result: Option<(i64,)> = sqlx::query_as(
        "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1"
    )
    .fetch_optional(pool)
    .await?;

    Ok(result.map(|(c,)| c).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = connect_in_memory().await.unwrap();

        run_migrations(&pool).await.unwrap();
        let first = get_schema_version(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let second = get_schema_version(&pool).await.unwrap();

        assert!(first >= 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_migrations_upgrade_first_release_table() {
        let pool = connect_in_memory().await.unwrap();

        // Layout written by the first server release
        sqlx::query(
            r#"
            CREATE TABLE history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plant_name TEXT,
                disease_name TEXT,
                confidence REAL,
                image_url TEXT,
                remedies TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO history (plant_name, disease_name, confidence, image_url, remedies, created_at)
             VALUES ('Tomato', 'Tomato Healthy', 97.5, 'data:image/jpeg;base64,AAAA', '{\"remedies\":[]}', '2024-05-01 09:30:00')",
        )
        .execute(&pool)
        .await
        .unwrap();

        run_migrations(&pool).await.unwrap();
        let store = crate::history::ScanStore::new(pool);

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].remedies_encoding, crate::history::REMEDIES_ENCODING_V1);
        assert_eq!(records[0].created_at.to_rfc3339(), "2024-05-01T09:30:00+00:00");

        let id = store
            .create(&crate::history::NewScan {
                plant_name: Some("Potato".into()),
                disease_name: Some("Early Blight".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(id, 2);

        let records = store.list().await.unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1]);

        let stats = store.stats().await.unwrap();
        assert_eq!((stats.total_scans, stats.healthy_plants, stats.diseased_plants), (2, 1, 1));
    }

    #[tokio::test]
    async fn test_file_pool_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("scans.db").display());

        let pool = create_optimized_pool(&url, &PoolSettings::default()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        pool.close().await;
    }
}
