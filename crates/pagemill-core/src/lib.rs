use std::path::PathBuf;
use std::time::Duration;

use pagemill_extract::{ExtractConfig, ExtractionMethod};
use serde::Serialize;

pub mod config_file;
pub mod lifecycle;
pub mod pool;
pub mod store;
pub mod sweep;

// Re-export for convenience
pub use lifecycle::{ProcessError, process_task, schedule_delete, spawn_task};
pub use pool::{BatchEvent, BatchPool, FileJob, FileOutcome, FileSuccess};
pub use store::TaskStore;
pub use sweep::sweep_stale_files;

/// Generate a fresh task identifier.
pub fn new_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Where a task currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPhase {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPhase::Pending => "pending",
            TaskPhase::Processing => "processing",
            TaskPhase::Completed => "completed",
            TaskPhase::Failed => "failed",
        }
    }

    /// Completed and failed tasks never change phase again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskPhase::Completed | TaskPhase::Failed)
    }
}

/// Everything the service knows about one task. This is both the stored
/// record and the status payload returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskState {
    pub task_id: String,
    pub status: TaskPhase,
    /// 0-100 while a task advances; reset to 0 when it fails.
    pub progress: u8,
    pub result_file: Option<PathBuf>,
    pub message: Option<String>,
    pub scheduled_for_deletion: bool,
}

impl TaskState {
    /// A freshly accepted task, waiting for a worker.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskPhase::Pending,
            progress: 0,
            result_file: None,
            message: Some("Preparing to process PDF".to_string()),
            scheduled_for_deletion: false,
        }
    }
}

/// Per-upload knobs carried from the request into processing.
#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    /// Requested output format name. Unknown names fall back to CSV at
    /// serialization time, so this stays a plain string here.
    pub output_format: String,
    pub method: ExtractionMethod,
    pub include_metadata: bool,
    pub text_only: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            output_format: "csv".to_string(),
            method: ExtractionMethod::Auto,
            include_metadata: true,
            text_only: false,
        }
    }
}

/// Service configuration shared by the HTTP boundary and the background
/// workers.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory incoming uploads are written to.
    pub upload_dir: PathBuf,
    /// Directory finished result files land in.
    pub results_dir: PathBuf,
    /// Bind address for the HTTP server.
    pub host: String,
    pub port: u16,
    /// Blocking workers for CLI batch runs.
    pub workers: usize,
    /// Pages per call when a document is extracted in groups.
    pub chunk_size: usize,
    /// File size in MiB above which grouped extraction is forced.
    pub max_file_mb: u64,
    /// Grace period between a delete request and the purge.
    pub delete_delay: Duration,
    /// Age past which leftover files are swept at startup.
    pub retention: Duration,
    /// Requests allowed per client within `rate_window`.
    pub rate_limit: u32,
    pub rate_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            results_dir: PathBuf::from("results"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            workers: 2,
            chunk_size: 1000,
            max_file_mb: 100,
            delete_delay: Duration::from_secs(300),
            retention: Duration::from_secs(3600),
            rate_limit: 5,
            rate_window: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Defaults overlaid with whatever the config file provides.
    pub fn from_file(file: config_file::ConfigFile) -> Self {
        let mut config = Self::default();
        if let Some(service) = file.service {
            if let Some(host) = service.host {
                config.host = host;
            }
            if let Some(port) = service.port {
                config.port = port;
            }
            if let Some(dir) = service.upload_dir {
                config.upload_dir = PathBuf::from(dir);
            }
            if let Some(dir) = service.results_dir {
                config.results_dir = PathBuf::from(dir);
            }
        }
        if let Some(processing) = file.processing {
            if let Some(workers) = processing.workers {
                config.workers = workers;
            }
            if let Some(chunk_size) = processing.chunk_size {
                config.chunk_size = chunk_size;
            }
            if let Some(max_file_mb) = processing.max_file_mb {
                config.max_file_mb = max_file_mb;
            }
        }
        if let Some(cleanup) = file.cleanup {
            if let Some(secs) = cleanup.delete_delay_secs {
                config.delete_delay = Duration::from_secs(secs);
            }
            if let Some(secs) = cleanup.retention_secs {
                config.retention = Duration::from_secs(secs);
            }
        }
        if let Some(limits) = file.limits {
            if let Some(max) = limits.max_requests {
                config.rate_limit = max;
            }
            if let Some(secs) = limits.window_seconds {
                config.rate_window = Duration::from_secs(secs);
            }
        }
        config
    }

    /// Config file cascade (CWD `.pagemill.toml`, then the platform config
    /// dir) over built-in defaults.
    pub fn load() -> Self {
        Self::from_file(config_file::load_config())
    }

    pub fn upload_path(&self, task_id: &str) -> PathBuf {
        self.upload_dir.join(format!("{task_id}.pdf"))
    }

    /// Extension-less destination stem for a task's result file. The
    /// serializer appends the extension of the format actually used.
    pub fn result_dest(&self, task_id: &str) -> PathBuf {
        self.results_dir.join(task_id)
    }

    pub fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            chunk_size: self.chunk_size,
            max_file_mb: self.max_file_mb,
        }
    }
}
