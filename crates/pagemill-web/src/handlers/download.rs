use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use pagemill_core::TaskPhase;
use pagemill_report::OutputFormat;

use crate::models;
use crate::state::AppState;

/// Stream a completed task's result file. The content type follows the
/// extension the serializer actually used, not the requested format.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    let Some(task) = state.store.get(&task_id) else {
        return models::error(StatusCode::NOT_FOUND, format!("Task {task_id} not found"));
    };

    if task.status != TaskPhase::Completed {
        return models::error(StatusCode::BAD_REQUEST, "Processing not yet completed");
    }

    let Some(result_file) = task.result_file else {
        return models::error(StatusCode::NOT_FOUND, "Result file not found");
    };

    let file = match tokio::fs::File::open(&result_file).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(task_id, error = %e, "result file missing on disk");
            return models::error(StatusCode::NOT_FOUND, "Result file not found");
        }
    };

    let media_type = media_type_for(&result_file);
    let filename = result_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| task_id.clone());

    let headers = [
        (header::CONTENT_TYPE, media_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    (headers, Body::from_stream(ReaderStream::new(file))).into_response()
}

/// Content type for a result file, derived from its extension. Anything
/// the serializer did not produce downloads as plain text.
fn media_type_for(path: &std::path::Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(OutputFormat::from_name)
        .map(|format| format.media_type())
        .unwrap_or("text/plain")
}
