use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;

use crate::models;
use crate::state::AppState;

/// Current state of one task, straight from the store.
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get(&task_id) {
        Some(task) => Json(task).into_response(),
        None => models::error(StatusCode::NOT_FOUND, format!("Task {task_id} not found")),
    }
}
