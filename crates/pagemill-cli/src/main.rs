use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use pagemill_core::{BatchEvent, BatchPool, Config, FileJob, FileOutcome, ProcessingOptions};
use pagemill_extract::strategy::ExtractionStrategy;
use pagemill_extract::strategy::lopdf::LopdfStrategy;
use pagemill_extract::{ExtractionMethod, Extractor};
use pagemill_mupdf::MupdfStrategy;
use pagemill_report::OutputFormat;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{filter::LevelFilter, fmt};

mod output;

use output::ColorMode;

/// Extract text from PDF files into CSV, JSON or Parquet tables
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// PDF file or directory of PDF files to process
    input: PathBuf,

    /// Directory where extracted tables are written
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: csv, json or parquet
    #[arg(short, long, default_value = "csv")]
    format: String,

    /// Extraction method: auto, primary or secondary
    #[arg(short, long, default_value = "auto")]
    method: String,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Skip document metadata in the output
    #[arg(long)]
    no_metadata: bool,

    /// Emit only the text column, without page and line numbers
    #[arg(long)]
    text_only: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    fmt().with_max_level(level).with_target(false).init();

    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let color = ColorMode(!cli.no_color);
    let mut stdout = std::io::stdout();

    // Resolve configuration: CLI flags > env vars > config file defaults
    let config = Config::load();
    let workers = cli
        .workers
        .or_else(|| {
            std::env::var("PAGEMILL_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
        })
        .unwrap_or(config.workers);

    let Some(method) = ExtractionMethod::from_name(&cli.method) else {
        anyhow::bail!(
            "Unknown extraction method: {} (expected auto, primary or secondary)",
            cli.method
        );
    };
    if OutputFormat::from_name(&cli.format).is_none() {
        anyhow::bail!(
            "Unknown output format: {} (expected csv, json or parquet)",
            cli.format
        );
    }

    if !cli.input.exists() {
        anyhow::bail!("File not found: {}", cli.input.display());
    }

    let files = collect_inputs(&cli.input)?;
    if files.is_empty() {
        anyhow::bail!("No PDF files found in {}", cli.input.display());
    }

    let output_dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir)?;

    let options = ProcessingOptions {
        output_format: cli.format.clone(),
        method,
        include_metadata: !cli.no_metadata,
        text_only: cli.text_only,
    };

    let strategies: Vec<Arc<dyn ExtractionStrategy>> =
        vec![Arc::new(MupdfStrategy::new()), Arc::new(LopdfStrategy)];
    let extractor = Arc::new(Extractor::with_config(strategies, config.extract_config()));

    output::print_batch_header(
        &mut stdout,
        &cli.input.display().to_string(),
        files.len(),
        &cli.format,
        method.as_str(),
        workers,
        color,
    )?;

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let pool = BatchPool::new(extractor, options, cancel.clone(), workers);

    let total = files.len();
    let bar = make_progress_bar(total as u64);
    let progress = batch_progress(&bar, color);

    let mut receivers = Vec::with_capacity(total);
    for (index, path) in files.iter().enumerate() {
        let (result_tx, result_rx) = oneshot::channel();
        let dest = match path.file_stem() {
            Some(stem) => output_dir.join(stem),
            None => output_dir.join(format!("document_{}", index + 1)),
        };
        pool.submit(FileJob {
            path: path.clone(),
            dest,
            result_tx,
            index,
            total,
            progress: progress.clone(),
        })
        .await;
        receivers.push(result_rx);
    }

    let mut outcomes: Vec<FileOutcome> = Vec::with_capacity(total);
    let mut cancelled = false;
    for rx in receivers {
        match rx.await {
            Ok(outcome) => outcomes.push(outcome),
            // Sender dropped: the pool stopped taking jobs after cancellation
            Err(_) => {
                cancelled = true;
                break;
            }
        }
    }
    pool.shutdown().await;

    if cancelled {
        bar.abandon_with_message("Cancelled");
    } else {
        bar.finish_with_message(format!(
            "Processed {} files in {:.0?}",
            outcomes.len(),
            bar.elapsed()
        ));
    }

    writeln!(stdout)?;
    output::print_failed_files(&mut stdout, &outcomes, color)?;
    output::print_summary(&mut stdout, &outcomes, &output_dir, color)?;

    if cancelled {
        anyhow::bail!("Cancelled before all files were processed");
    }
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, outcomes.len());
    }
    Ok(())
}

/// A single file, or every `.pdf` in a directory, sorted by name.
fn collect_inputs(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let entry = entry?;
        let path = entry.path();
        let is_pdf = path.is_file()
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false);
        if is_pdf {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn make_progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {msg} [{bar:40.cyan/dim}] {pos}/{len} (eta {eta})",
        )
        .unwrap()
        .progress_chars("=> "),
    );
    bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn batch_progress(bar: &ProgressBar, color: ColorMode) -> Arc<dyn Fn(BatchEvent) + Send + Sync> {
    let bar = bar.clone();
    Arc::new(move |event| match event {
        BatchEvent::Started { path, .. } => {
            bar.set_message(output::file_label(&path));
        }
        BatchEvent::Completed { .. } => {
            bar.inc(1);
        }
        BatchEvent::Failed {
            index,
            total,
            path,
            error,
        } => {
            bar.println(output::failure_line(index, total, &path, &error, color));
            bar.inc(1);
        }
    })
}
