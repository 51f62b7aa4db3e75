//! Startup cleanup of leftover upload and result files.

use std::path::Path;
use std::time::{Duration, SystemTime};

/// Remove files older than `retention` (by mtime) from each directory.
/// Returns how many were removed. Directories that cannot be read and
/// entries without a readable mtime are skipped.
pub fn sweep_stale_files(dirs: &[&Path], retention: Duration) -> usize {
    let now = SystemTime::now();
    let mut removed = 0;

    for dir in dirs {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "cannot read directory for cleanup");
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            let stale = now
                .duration_since(modified)
                .map(|age| age > retention)
                .unwrap_or(false);
            if stale {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        tracing::debug!(path = %path.display(), "removed stale file");
                        removed += 1;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "failed to remove stale file")
                    }
                }
            }
        }
    }

    tracing::info!(removed, "cleaned up old files during startup");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn removes_only_stale_files() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("old.pdf");
        fs::write(&old, b"stub").unwrap();
        // Make the file's age unambiguous against a zero retention.
        std::thread::sleep(Duration::from_millis(20));

        let removed = sweep_stale_files(&[dir.path()], Duration::ZERO);
        assert_eq!(removed, 1);
        assert!(!old.exists());
    }

    #[test]
    fn keeps_fresh_files() {
        let dir = TempDir::new().unwrap();
        let fresh = dir.path().join("fresh.csv");
        fs::write(&fresh, b"stub").unwrap();

        let removed = sweep_stale_files(&[dir.path()], Duration::from_secs(3600));
        assert_eq!(removed, 0);
        assert!(fresh.exists());
    }

    #[test]
    fn skips_subdirectories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let removed = sweep_stale_files(&[dir.path()], Duration::ZERO);
        assert_eq!(removed, 0);
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn missing_directory_is_skipped() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(sweep_stale_files(&[missing.as_path()], Duration::ZERO), 0);
    }

    #[test]
    fn sweeps_multiple_directories() {
        let uploads = TempDir::new().unwrap();
        let results = TempDir::new().unwrap();
        fs::write(uploads.path().join("a.pdf"), b"stub").unwrap();
        fs::write(results.path().join("b.csv"), b"stub").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let removed = sweep_stale_files(&[uploads.path(), results.path()], Duration::ZERO);
        assert_eq!(removed, 2);
    }
}
