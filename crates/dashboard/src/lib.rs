//! Credit Scoring Dashboard Client
//!
//! Stateful client over the inference service:
//! - Memoized client and column lookups (TTL or process lifetime)
//! - Session holding the loaded client and its last prediction
//! - What-if re-scoring of allow-listed variables
//! - Local feature importances and terminal rendering

mod cache;
mod client;
pub mod command;
mod config;
mod dashboard;
mod importances;
pub mod render;
mod session;

pub use cache::ResponseCache;
pub use client::{HttpScoringApi, PredictionResult, Record, ScoringApi};
pub use command::Command;
pub use config::DashboardConfig;
pub use dashboard::{Comparison, Dashboard, PredictionOutcome};
pub use importances::{FeatureImportance, LocalImportances};
pub use session::{compute_modifications, Session, MODIFIABLE_VARS, VARIABLES_TO_PLOT};

use thiserror::Error;

/// Dashboard errors; all are shown to the user and never end the session
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by the service: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Service returned {status}: {detail}")]
    UpstreamStatus { status: u16, detail: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Variable {0} cannot be modified")]
    NotAllowed(String),

    #[error("No client loaded")]
    NoClientLoaded,

    #[error("Local importances unavailable: {0}")]
    Importances(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}
