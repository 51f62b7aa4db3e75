use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use pagemill_core::FileOutcome;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// File name of a path, falling back to the full path for display.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// One-line failure notice, printed above the progress bar as it happens.
pub fn failure_line(
    index: usize,
    total: usize,
    path: &Path,
    error: &str,
    color: ColorMode,
) -> String {
    if color.enabled() {
        format!(
            "[{}/{}] {} {}: {}",
            index + 1,
            total,
            "FAILED".red(),
            file_label(path),
            error
        )
    } else {
        format!(
            "[{}/{}] FAILED {}: {}",
            index + 1,
            total,
            file_label(path),
            error
        )
    }
}

/// Print the batch header before processing starts.
pub fn print_batch_header(
    w: &mut dyn Write,
    input: &str,
    total: usize,
    format: &str,
    method: &str,
    workers: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Extracting text from {}...", input)?;
    writeln!(w, "Found {} PDF files to process", total)?;

    let settings = format!(
        "(format: {}, method: {}, workers: {})",
        format, method, workers
    );
    if color.enabled() {
        writeln!(w, "{}", settings.dimmed())?;
    } else {
        writeln!(w, "{}", settings)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Print the detailed report for every file that failed.
pub fn print_failed_files(
    w: &mut dyn Write,
    outcomes: &[FileOutcome],
    color: ColorMode,
) -> std::io::Result<()> {
    if !outcomes.iter().any(|o| o.result.is_err()) {
        return Ok(());
    }

    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold().red())?;
        writeln!(w, "{}", "FAILED FILES".bold().red())?;
        writeln!(w, "{}", sep.bold().red())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "FAILED FILES")?;
        writeln!(w, "{}", sep)?;
    }

    for outcome in outcomes {
        if let Err(error) = &outcome.result {
            writeln!(w)?;
            if color.enabled() {
                writeln!(w, "{} {}", "File:".bold(), outcome.path.display())?;
                writeln!(w, "{} {}", "Error:".red(), error)?;
            } else {
                writeln!(w, "File: {}", outcome.path.display())?;
                writeln!(w, "Error: {}", error)?;
            }
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Print the final summary.
pub fn print_summary(
    w: &mut dyn Write,
    outcomes: &[FileOutcome],
    output_dir: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
    let failed = outcomes.len() - succeeded;
    let pages: usize = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .map(|s| s.pages)
        .sum();
    let lines: usize = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok())
        .map(|s| s.lines)
        .sum();

    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", sep)?;
    }

    writeln!(w, "  Files processed: {}", outcomes.len())?;

    if color.enabled() {
        writeln!(w, "  {} {}", "Succeeded:".green(), succeeded)?;
    } else {
        writeln!(w, "  Succeeded: {}", succeeded)?;
    }
    if failed > 0 {
        if color.enabled() {
            writeln!(w, "  {} {}", "Failed:".red(), failed)?;
        } else {
            writeln!(w, "  Failed: {}", failed)?;
        }
    }

    if succeeded > 0 {
        let msg = format!("Extracted {} lines across {} pages", lines, pages);
        writeln!(w)?;
        if color.enabled() {
            writeln!(w, "  {}", msg.dimmed())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
        writeln!(w, "  Results written to: {}", output_dir.display())?;
    }

    writeln!(w)?;
    Ok(())
}
