//! Client Feature Store
//!
//! Holds the applicant feature table in memory and answers id-keyed lookups.
//! The table is loaded once and never mutated afterwards.

mod record;
mod table;

pub use record::{coerce_client_id, ClientRecord, Fields};
pub use table::{FeatureTable, DEFAULT_ID_COLUMN};

use thiserror::Error;

/// Feature store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Client {0} not found")]
    NotFound(i64),
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    #[error("Failed to load feature table from {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("Invalid feature table: {0}")]
    Parse(String),
}
