//! Worker pool for batch extraction runs.
//!
//! The CLI fans a directory of PDFs out to a fixed number of workers. Each
//! worker pulls jobs from a shared queue, runs the blocking extraction off
//! the async runtime, and reports back per file. One bad file never stops
//! the rest of the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pagemill_extract::Extractor;
use pagemill_report::write_document;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ProcessingOptions;

/// One file extraction job submitted to the pool.
pub struct FileJob {
    /// Source PDF.
    pub path: PathBuf,
    /// Extension-less destination stem for this file's output.
    pub dest: PathBuf,
    pub result_tx: oneshot::Sender<FileOutcome>,
    pub index: usize,
    pub total: usize,
    /// Progress callback for this job (emits Started, Completed, Failed).
    pub progress: Arc<dyn Fn(BatchEvent) + Send + Sync>,
}

/// Progress notification emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    Completed {
        index: usize,
        total: usize,
        path: PathBuf,
        output: PathBuf,
        lines: usize,
    },
    Failed {
        index: usize,
        total: usize,
        path: PathBuf,
        error: String,
    },
}

/// Terminal result for one file of a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<FileSuccess, String>,
}

#[derive(Debug, Clone)]
pub struct FileSuccess {
    pub output: PathBuf,
    pub pages: usize,
    pub lines: usize,
}

/// A pool of worker tasks that process file extraction jobs.
///
/// Submit jobs via [`submit()`](BatchPool::submit), receive results via the
/// oneshot receiver paired with each job.
pub struct BatchPool {
    job_tx: async_channel::Sender<FileJob>,
    pool_handle: JoinHandle<()>,
}

impl BatchPool {
    /// Create a new pool with `num_workers` worker tasks sharing one queue.
    pub fn new(
        extractor: Arc<Extractor>,
        options: ProcessingOptions,
        cancel: CancellationToken,
        num_workers: usize,
    ) -> Self {
        let (job_tx, job_rx) = async_channel::unbounded::<FileJob>();

        let pool_handle = tokio::spawn(async move {
            let mut worker_handles = Vec::with_capacity(num_workers.max(1));

            for _ in 0..num_workers.max(1) {
                worker_handles.push(tokio::spawn(worker_loop(
                    job_rx.clone(),
                    extractor.clone(),
                    options.clone(),
                    cancel.clone(),
                )));
            }

            // Drop our clone so workers are the last holders
            drop(job_rx);

            for handle in worker_handles {
                let _ = handle.await;
            }
        });

        Self {
            job_tx,
            pool_handle,
        }
    }

    /// Get a cloneable sender for submitting jobs from multiple tasks.
    pub fn sender(&self) -> async_channel::Sender<FileJob> {
        self.job_tx.clone()
    }

    /// Submit a job to the pool.
    pub async fn submit(&self, job: FileJob) {
        let _ = self.job_tx.send(job).await;
    }

    /// Close the pool and wait for in-flight jobs to finish.
    pub async fn shutdown(self) {
        self.job_tx.close();
        let _ = self.pool_handle.await;
    }
}

async fn worker_loop(
    job_rx: async_channel::Receiver<FileJob>,
    extractor: Arc<Extractor>,
    options: ProcessingOptions,
    cancel: CancellationToken,
) {
    while let Ok(job) = job_rx.recv().await {
        if cancel.is_cancelled() {
            break;
        }

        let FileJob {
            path,
            dest,
            result_tx,
            index,
            total,
            progress,
        } = job;

        progress(BatchEvent::Started {
            index,
            total,
            path: path.clone(),
        });

        let outcome = {
            let extractor = extractor.clone();
            let options = options.clone();
            let source = path.clone();
            tokio::task::spawn_blocking(move || process_file(&extractor, &options, &source, &dest))
                .await
                .unwrap_or_else(|e| Err(format!("background task failed: {e}")))
        };

        match &outcome {
            Ok(success) => progress(BatchEvent::Completed {
                index,
                total,
                path: path.clone(),
                output: success.output.clone(),
                lines: success.lines,
            }),
            Err(error) => progress(BatchEvent::Failed {
                index,
                total,
                path: path.clone(),
                error: error.clone(),
            }),
        }

        let _ = result_tx.send(FileOutcome {
            path,
            result: outcome,
        });
    }
}

fn process_file(
    extractor: &Extractor,
    options: &ProcessingOptions,
    path: &Path,
    dest: &Path,
) -> Result<FileSuccess, String> {
    let doc = extractor
        .extract(path, options.method, options.include_metadata)
        .map_err(|e| e.to_string())?;
    let pages = doc.page_count;
    let lines = doc.total_lines();
    let output =
        write_document(&doc, dest, &options.output_format, options.text_only).map_err(|e| e.to_string())?;
    Ok(FileSuccess {
        output,
        pages,
        lines,
    })
}
