//! API Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use feature_store::StoreError;
use scoring::ScoringError;
use thiserror::Error;
use tracing::error;

/// Request-scoped errors, rendered as `{"detail": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Client non trouvé")]
    ClientNotFound(i64),
    #[error("Colonne non trouvée")]
    ColumnNotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ClientNotFound(_) | ApiError::ColumnNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Scoring(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::ClientNotFound(id),
            StoreError::UnknownColumn(name) => ApiError::ColumnNotFound(name),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            ApiError::Scoring(_) | ApiError::Internal(_) => {
                error!("Request failed: {}", self);
                "Erreur interne".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

/// Errors that abort service startup
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Feature table error: {0}")]
    Store(#[from] StoreError),
    #[error("Model error: {0}")]
    Scoring(#[from] ScoringError),
    #[error("Scaler feature {0} is not a column of the feature table")]
    MissingFeature(String),
    #[error("Metrics recorder error: {0}")]
    Metrics(String),
    #[error("Logging setup error: {0}")]
    Logging(String),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}
