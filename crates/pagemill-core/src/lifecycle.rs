//! Background processing of one task and its deferred cleanup.

use std::path::PathBuf;
use std::sync::Arc;

use pagemill_extract::{ExtractError, Extractor};
use pagemill_report::{ReportError, write_document};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::store::TaskStore;
use crate::{Config, ProcessingOptions, TaskPhase};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),
    #[error("serialization error: {0}")]
    Report(#[from] ReportError),
    #[error("no output file generated")]
    NoArtifact,
    #[error("background task failed: {0}")]
    Join(String),
}

/// Hand one uploaded file to the background runtime and return immediately.
/// All outcomes, success or failure, land in the store.
pub fn spawn_task(
    store: TaskStore,
    extractor: Arc<Extractor>,
    config: Arc<Config>,
    task_id: String,
    options: ProcessingOptions,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        process_task(&store, extractor, &config, &task_id, options).await;
    })
}

/// Drive a task through its stages, recording every transition in the
/// store. Never returns an error; failures become task state. The uploaded
/// file is removed once processing ends, whichever way it ends.
pub async fn process_task(
    store: &TaskStore,
    extractor: Arc<Extractor>,
    config: &Config,
    task_id: &str,
    options: ProcessingOptions,
) {
    let upload_path = config.upload_path(task_id);
    tracing::info!(task_id, upload = %upload_path.display(), "starting processing");

    set_stage(store, task_id, 10, "Processing started");
    set_stage(store, task_id, 20, "Validating PDF");

    match run_stages(extractor, config, task_id, options, upload_path.clone()).await {
        Ok(result_file) => {
            tracing::info!(task_id, result = %result_file.display(), "processing completed");
            store.update(task_id, |task| {
                task.status = TaskPhase::Completed;
                task.progress = 100;
                task.result_file = Some(result_file.clone());
                task.message = Some("Processing completed successfully".to_string());
            });
        }
        Err(ProcessError::NoArtifact) => {
            tracing::error!(task_id, "processing produced no output file");
            store.update(task_id, |task| {
                task.status = TaskPhase::Failed;
                task.progress = 0;
                task.message = Some("Processing failed - no output file generated".to_string());
            });
        }
        Err(e) => {
            tracing::error!(task_id, error = %e, "processing failed");
            store.update(task_id, |task| {
                task.status = TaskPhase::Failed;
                task.progress = 0;
                task.message = Some(format!("Processing failed: {e}"));
            });
        }
    }

    // The raw upload never outlives its task's processing.
    if let Err(e) = std::fs::remove_file(&upload_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(task_id, error = %e, "failed to remove uploaded file");
        }
    }
}

async fn run_stages(
    extractor: Arc<Extractor>,
    config: &Config,
    task_id: &str,
    options: ProcessingOptions,
    upload_path: PathBuf,
) -> Result<PathBuf, ProcessError> {
    let dest = config.result_dest(task_id);
    let result_file = tokio::task::spawn_blocking(move || -> Result<PathBuf, ProcessError> {
        let doc = extractor.extract(&upload_path, options.method, options.include_metadata)?;
        let path = write_document(&doc, &dest, &options.output_format, options.text_only)?;
        Ok(path)
    })
    .await
    .map_err(|e| ProcessError::Join(e.to_string()))??;

    if !result_file.is_file() {
        return Err(ProcessError::NoArtifact);
    }
    Ok(result_file)
}

fn set_stage(store: &TaskStore, task_id: &str, progress: u8, message: &str) {
    store.update(task_id, |task| {
        task.status = TaskPhase::Processing;
        task.progress = progress;
        task.message = Some(message.to_string());
    });
}

/// Mark a task for deletion now and purge its files and store entry after
/// the configured grace period. Purging a task that is already gone is a
/// quiet no-op, so repeated delete requests are harmless.
pub fn schedule_delete(store: TaskStore, config: Arc<Config>, task_id: String) -> JoinHandle<()> {
    store.update(&task_id, |task| task.scheduled_for_deletion = true);
    tracing::info!(task_id, delay_secs = config.delete_delay.as_secs(), "deletion scheduled");
    tokio::spawn(async move {
        tokio::time::sleep(config.delete_delay).await;
        purge_task(&store, &config, &task_id);
    })
}

fn purge_task(store: &TaskStore, config: &Config, task_id: &str) {
    let Some(task) = store.get(task_id) else {
        return;
    };

    let upload_path = config.upload_path(task_id);
    if upload_path.is_file() {
        if let Err(e) = std::fs::remove_file(&upload_path) {
            tracing::warn!(task_id, error = %e, "failed to remove uploaded file");
        }
    }
    if let Some(result_file) = &task.result_file {
        if result_file.is_file() {
            if let Err(e) = std::fs::remove_file(result_file) {
                tracing::warn!(task_id, error = %e, "failed to remove result file");
            }
        }
    }
    store.remove(task_id);
    tracing::info!(task_id, "task deleted after delay");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskState;
    use pagemill_extract::strategy::ExtractionStrategy;
    use pagemill_extract::strategy::mock::{MockPage, MockStrategy};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    // ── helpers ──

    fn test_config(root: &Path) -> Arc<Config> {
        let config = Config {
            upload_dir: root.join("uploads"),
            results_dir: root.join("results"),
            ..Config::default()
        };
        fs::create_dir_all(&config.upload_dir).unwrap();
        fs::create_dir_all(&config.results_dir).unwrap();
        Arc::new(config)
    }

    fn make_upload(config: &Config, task_id: &str) -> PathBuf {
        let path = config.upload_path(task_id);
        fs::write(&path, b"%PDF-1.4\nstub").unwrap();
        path
    }

    fn mock_extractor(pages: Vec<MockPage>) -> Arc<Extractor> {
        let strategies: Vec<Arc<dyn ExtractionStrategy>> =
            vec![Arc::new(MockStrategy::new("mock", pages))];
        Arc::new(Extractor::new(strategies))
    }

    fn failing_extractor() -> Arc<Extractor> {
        let strategies: Vec<Arc<dyn ExtractionStrategy>> =
            vec![Arc::new(MockStrategy::failing("mock", "boom"))];
        Arc::new(Extractor::new(strategies))
    }

    // ── processing ──

    #[tokio::test]
    async fn completed_task_reaches_one_hundred() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let upload = make_upload(&config, "t1");
        let store = TaskStore::new();
        store.insert(TaskState::new("t1"));

        let extractor = mock_extractor(vec![MockPage::text("Hello world")]);
        process_task(&store, extractor, &config, "t1", ProcessingOptions::default()).await;

        let task = store.get("t1").unwrap();
        assert_eq!(task.status, TaskPhase::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(
            task.message.as_deref(),
            Some("Processing completed successfully")
        );
        let result_file = task.result_file.unwrap();
        assert!(result_file.is_file());
        assert_eq!(result_file.extension().unwrap(), "csv");
        assert!(!upload.exists(), "upload should be removed after processing");
    }

    #[tokio::test]
    async fn failed_extraction_resets_progress() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let upload = make_upload(&config, "t1");
        let store = TaskStore::new();
        store.insert(TaskState::new("t1"));

        process_task(
            &store,
            failing_extractor(),
            &config,
            "t1",
            ProcessingOptions::default(),
        )
        .await;

        let task = store.get("t1").unwrap();
        assert_eq!(task.status, TaskPhase::Failed);
        assert_eq!(task.progress, 0);
        let message = task.message.unwrap();
        assert!(message.starts_with("Processing failed:"), "got: {message}");
        assert!(task.result_file.is_none());
        assert!(!upload.exists(), "upload should be removed after failure");
    }

    #[tokio::test]
    async fn invalid_upload_fails_validation() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let upload = config.upload_path("t1");
        fs::write(&upload, b"not a pdf at all").unwrap();
        let store = TaskStore::new();
        store.insert(TaskState::new("t1"));

        let extractor = mock_extractor(vec![MockPage::text("unused")]);
        process_task(&store, extractor, &config, "t1", ProcessingOptions::default()).await;

        let task = store.get("t1").unwrap();
        assert_eq!(task.status, TaskPhase::Failed);
        assert!(task.message.unwrap().starts_with("Processing failed:"));
        assert!(!upload.exists());
    }

    #[tokio::test]
    async fn unwritable_results_dir_fails_task() {
        let dir = TempDir::new().unwrap();
        let config = Arc::new(Config {
            upload_dir: dir.path().join("uploads"),
            results_dir: dir.path().join("missing").join("results"),
            ..Config::default()
        });
        fs::create_dir_all(&config.upload_dir).unwrap();
        make_upload(&config, "t1");
        let store = TaskStore::new();
        store.insert(TaskState::new("t1"));

        let extractor = mock_extractor(vec![MockPage::text("Hello")]);
        process_task(&store, extractor, &config, "t1", ProcessingOptions::default()).await;

        let task = store.get("t1").unwrap();
        assert_eq!(task.status, TaskPhase::Failed);
        assert_eq!(task.progress, 0);
    }

    #[tokio::test]
    async fn honors_requested_format() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        make_upload(&config, "t1");
        let store = TaskStore::new();
        store.insert(TaskState::new("t1"));

        let options = ProcessingOptions {
            output_format: "json".to_string(),
            ..ProcessingOptions::default()
        };
        let extractor = mock_extractor(vec![MockPage::text("Hello")]);
        process_task(&store, extractor, &config, "t1", options).await;

        let task = store.get("t1").unwrap();
        assert_eq!(task.status, TaskPhase::Completed);
        let result_file = task.result_file.unwrap();
        assert_eq!(result_file.extension().unwrap(), "json");
    }

    #[tokio::test]
    async fn processing_missing_task_entry_is_harmless() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let upload = make_upload(&config, "ghost");
        let store = TaskStore::new();

        let extractor = mock_extractor(vec![MockPage::text("Hello")]);
        process_task(&store, extractor, &config, "ghost", ProcessingOptions::default()).await;

        assert!(store.is_empty());
        assert!(!upload.exists());
    }

    // ── deferred deletion ──

    #[tokio::test(start_paused = true)]
    async fn delete_marks_then_purges_after_delay() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let result_file = config.results_dir.join("t1.csv");
        fs::write(&result_file, "page_number,text,error\n").unwrap();

        let store = TaskStore::new();
        let mut task = TaskState::new("t1");
        task.status = TaskPhase::Completed;
        task.result_file = Some(result_file.clone());
        store.insert(task);

        let handle = schedule_delete(store.clone(), config.clone(), "t1".to_string());
        assert!(store.get("t1").unwrap().scheduled_for_deletion);
        assert!(result_file.is_file(), "purge waits for the grace period");

        handle.await.unwrap();
        assert!(store.get("t1").is_none());
        assert!(!result_file.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_is_quiet_when_task_already_gone() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let store = TaskStore::new();
        store.insert(TaskState::new("t1"));
        store.insert(TaskState::new("t2"));

        let handle = schedule_delete(store.clone(), config.clone(), "t1".to_string());
        store.remove("t1");
        handle.await.unwrap();

        assert!(store.get("t1").is_none());
        assert!(store.get("t2").is_some(), "other tasks are untouched");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_delete_requests_are_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let store = TaskStore::new();
        store.insert(TaskState::new("t1"));

        let first = schedule_delete(store.clone(), config.clone(), "t1".to_string());
        let second = schedule_delete(store.clone(), config.clone(), "t1".to_string());
        first.await.unwrap();
        second.await.unwrap();

        assert!(store.is_empty());
    }
}
