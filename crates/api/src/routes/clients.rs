//! Client Routes

use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use feature_store::ClientRecord;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

/// Get one client's full record
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    client_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ClientRecord>, ApiError> {
    let Path(client_id) = client_id.map_err(|e| ApiError::Validation(e.body_text()))?;
    state.service.get_record(client_id).cloned().map(Json)
}

/// Get the first rows of the table
pub async fn get_first(State(state): State<Arc<AppState>>) -> Json<Vec<ClientRecord>> {
    Json(state.service.get_first().to_vec())
}
