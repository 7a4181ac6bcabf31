//! Column Routes

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

/// Get every non-missing value of a column
pub async fn get_column(
    State(state): State<Arc<AppState>>,
    Path(column_name): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    state.service.get_column(&column_name).map(Json)
}
