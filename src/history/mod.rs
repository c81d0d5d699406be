// src/history/mod.rs
// Scan history: durable, ordered log of scan results and aggregate stats over it

pub mod store;
pub mod types;

pub use store::ScanStore;
pub use types::{
    CreateScanRequest, CreatedScan, HealthStatus, NewScan, ScanRecord, ScanStats,
    ValidationError, ValidationMode, REMEDIES_ENCODING_V1,
};

/// Storage-layer failures. Everything here surfaces to the caller as a
/// server error; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Failed to encode remedies: {0}")]
    Encode(#[from] serde_json::Error),
}
