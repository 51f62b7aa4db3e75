use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::sync::Arc;

use pagemill_core::{TaskState, lifecycle};

use crate::models::{self, UploadResponse};
use crate::state::AppState;
use crate::upload::{self, is_pdf_filename};

/// Accept one PDF, register a pending task and hand it to the background
/// runtime. The response returns before any extraction work happens.
pub async fn upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> impl IntoResponse {
    let form = match upload::parse_multipart(multipart).await {
        Ok(form) => form,
        Err(e) => return models::error(StatusCode::BAD_REQUEST, e),
    };

    // Reject before creating any task record or file.
    if !is_pdf_filename(&form.filename) {
        return models::error(StatusCode::BAD_REQUEST, "Only PDF files are allowed");
    }

    let task_id = pagemill_core::new_task_id();
    let upload_path = state.config.upload_path(&task_id);

    if let Err(e) = tokio::fs::write(&upload_path, &form.data).await {
        tracing::error!(task_id, error = %e, "failed to save upload");
        return models::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("File upload failed: {e}"),
        );
    }

    state.store.insert(TaskState::new(task_id.as_str()));
    tracing::info!(task_id, filename = %form.filename, size = form.data.len(), "upload accepted");

    lifecycle::spawn_task(
        state.store.clone(),
        state.extractor.clone(),
        state.config.clone(),
        task_id.clone(),
        form.options,
    );

    Json(UploadResponse {
        task_id,
        message: "PDF uploaded successfully. Processing started.".to_string(),
    })
    .into_response()
}
