//! Prediction Routes

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use feature_store::coerce_client_id;
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::service::PredictionResult;
use crate::AppState;

/// Body of `POST /predict`
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(deserialize_with = "lax_client_id")]
    pub id_client: i64,
}

/// Body of `POST /predict_custom`
#[derive(Debug, Deserialize)]
pub struct PredictCustomRequest {
    #[serde(deserialize_with = "lax_client_id")]
    pub id_client: i64,
    /// Column name to overriding value
    #[serde(default)]
    pub modifications: BTreeMap<String, f64>,
}

/// Accept the same id forms as the table: integers, integral floats and
/// numeric strings
fn lax_client_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    coerce_client_id(&raw)
        .ok_or_else(|| de::Error::custom(format!("id_client must be an integer, got {}", raw)))
}

/// Score a stored client
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    state.service.predict(request.id_client).map(Json)
}

/// Score a stored client with overridden fields
pub async fn predict_custom(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictCustomRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    state
        .service
        .predict_custom(request.id_client, &request.modifications)
        .map(Json)
}
