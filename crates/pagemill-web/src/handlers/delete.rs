use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;

use pagemill_core::lifecycle;

use crate::models::{self, MessageResponse};
use crate::state::AppState;

/// Mark a task for deletion and schedule the deferred purge. Asking again
/// for a task that is already marked does not schedule a second purge.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    let Some(task) = state.store.get(&task_id) else {
        return models::error(StatusCode::NOT_FOUND, format!("Task {task_id} not found"));
    };

    if !task.scheduled_for_deletion {
        lifecycle::schedule_delete(state.store.clone(), state.config.clone(), task_id.clone());
    }

    Json(MessageResponse {
        message: format!("Task {task_id} scheduled for deletion"),
    })
    .into_response()
}
