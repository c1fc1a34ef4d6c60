//! Directory walking for a scan.
//!
//! Enumerates every file under the scan root in a stable order, assigns each
//! one the next file index, and submits one [`TokenizeJob`] per line to the
//! task pool. The first enumeration or read failure ends the walk; jobs that
//! were already submitted still run.

use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::index::{FileRecord, TokenizeJob, WordHit};
use crate::pool::{TaskPool, WaitGroup};
use crate::utils::relative_path;

/// What a walk produced, besides the words sent to the aggregator.
#[derive(Debug, Default)]
pub struct WalkSummary {
    /// Files in discovery order; position is the file index.
    pub files: Vec<FileRecord>,
    /// Lines submitted to the pool.
    pub lines: usize,
    /// Bytes read.
    pub bytes: u64,
}

/// Walks one root and feeds its lines to a pool.
pub struct DirectoryWalker<'a> {
    root: PathBuf,
    pool: &'a TaskPool,
    results: Sender<WordHit>,
    errors: Sender<ScanError>,
    jobs: WaitGroup,
}

impl<'a> DirectoryWalker<'a> {
    /// `jobs` receives one slot per submitted line; each slot is released when
    /// its job is dropped.
    pub fn new(
        root: impl Into<PathBuf>,
        pool: &'a TaskPool,
        results: Sender<WordHit>,
        errors: Sender<ScanError>,
        jobs: WaitGroup,
    ) -> Self {
        Self {
            root: root.into(),
            pool,
            results,
            errors,
            jobs,
        }
    }

    /// Walk the root. Any failure is forwarded on the error channel and stops
    /// the walk.
    pub fn walk(self) -> WalkSummary {
        let mut summary = WalkSummary::default();
        if let Err(err) = self.walk_into(&mut summary) {
            warn!(error = %err, "Directory walk aborted");
            if self.errors.send(err).is_err() {
                debug!("Error channel closed before walk error could be reported");
            }
        }
        summary
    }

    fn walk_into(&self, summary: &mut WalkSummary) -> Result<(), ScanError> {
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(self.root.as_path());
                ScanError::walk(relative_path(&self.root, path), &e)
            })?;

            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let display_path = relative_path(&self.root, path);

            // Follows symlinks. Only regular files are read; directories,
            // FIFOs, sockets and device nodes are skipped.
            let metadata = std::fs::metadata(path)
                .map_err(|e| ScanError::stat(display_path.as_str(), &e))?;
            if !metadata.is_file() {
                trace!(path = %display_path, "Skipping non-regular file");
                continue;
            }

            let file_index = u32::try_from(summary.files.len()).map_err(|_| ScanError::Walk {
                path: PathBuf::from(&display_path),
                message: "too many files under scan root".to_string(),
            })?;
            summary.files.push(FileRecord {
                path: display_path.clone(),
                modified_at: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });

            let content =
                std::fs::read(path).map_err(|e| ScanError::read(display_path.as_str(), &e))?;
            summary.bytes += content.len() as u64;

            if !self.submit_lines(&content, file_index, &mut summary.lines) {
                debug!(path = %display_path, "Task pool stopped, ending walk early");
                return Ok(());
            }
        }
        Ok(())
    }

    /// Submit one job per line. Returns `false` if the pool refused work.
    fn submit_lines(&self, content: &[u8], file_index: u32, lines: &mut usize) -> bool {
        let text = String::from_utf8_lossy(content);
        for line in text.lines() {
            let job = TokenizeJob::new(
                line.to_owned(),
                file_index,
                self.results.clone(),
                self.jobs.add(),
            );
            if !self.pool.add_work(job) {
                return false;
            }
            *lines += 1;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::fs;
    use tempfile::TempDir;

    struct Harness {
        pool: TaskPool,
        jobs: WaitGroup,
    }

    impl Harness {
        fn new() -> Self {
            let pool = TaskPool::new(4, 8).unwrap();
            pool.start().unwrap();
            Self {
                pool,
                jobs: WaitGroup::new(),
            }
        }

        fn walk(&self, root: &std::path::Path) -> (WalkSummary, Vec<WordHit>, Vec<ScanError>) {
            let (results_tx, results_rx) = unbounded();
            let (errors_tx, errors_rx) = unbounded();
            let walker =
                DirectoryWalker::new(root, &self.pool, results_tx, errors_tx, self.jobs.clone());
            let summary = walker.walk();
            self.jobs.wait();
            (
                summary,
                results_rx.try_iter().collect(),
                errors_rx.try_iter().collect(),
            )
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = self.pool.stop();
            self.pool.join();
        }
    }

    #[test]
    fn test_walk_assigns_indices_in_sorted_order() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("b.txt"), "beta").unwrap();
        fs::write(temp_dir.path().join("a.txt"), "alpha\nalpha again").unwrap();
        fs::write(temp_dir.path().join("sub/c.txt"), "gamma").unwrap();

        let harness = Harness::new();
        let (summary, hits, errors) = harness.walk(temp_dir.path());

        let paths: Vec<&str> = summary.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt", "sub/c.txt"]);
        assert_eq!(summary.lines, 4);
        assert!(errors.is_empty());

        let mut alpha_files: Vec<u32> = hits
            .iter()
            .filter(|h| h.word == "alpha")
            .map(|h| h.file_index)
            .collect();
        alpha_files.dedup();
        assert_eq!(alpha_files, vec![0]);
        assert!(hits.iter().any(|h| h.word == "gamma" && h.file_index == 2));
    }

    #[test]
    fn test_walk_handles_crlf_and_invalid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("dos.txt"), "one\r\ntwo\r\n").unwrap();
        fs::write(temp_dir.path().join("raw.bin"), b"ok\xffword").unwrap();

        let harness = Harness::new();
        let (summary, hits, errors) = harness.walk(temp_dir.path());

        assert!(errors.is_empty());
        assert_eq!(summary.files.len(), 2);
        let mut words: Vec<&str> = hits.iter().map(|h| h.word.as_str()).collect();
        words.sort();
        assert_eq!(words, vec!["okword", "one", "two"]);
    }

    #[test]
    fn test_walk_missing_root_reports_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        let harness = Harness::new();
        let (summary, hits, errors) = harness.walk(&missing);

        assert!(summary.files.is_empty());
        assert!(hits.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ScanError::Walk { .. }));
    }

    #[test]
    fn test_walk_stops_when_pool_refuses_work() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(temp_dir.path().join("b.txt"), "beta").unwrap();

        let harness = Harness::new();
        harness.pool.stop().unwrap();
        let (summary, hits, errors) = harness.walk(temp_dir.path());

        assert_eq!(summary.files.len(), 1);
        assert_eq!(summary.lines, 0);
        assert!(hits.is_empty());
        assert!(errors.is_empty());
        assert_eq!(harness.jobs.pending(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_skips_fifo() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "alpha").unwrap();
        let status = std::process::Command::new("mkfifo")
            .arg(temp_dir.path().join("pipe"))
            .status()
            .unwrap();
        assert!(status.success());
        fs::write(temp_dir.path().join("z.txt"), "omega").unwrap();

        let harness = Harness::new();
        let (summary, hits, errors) = harness.walk(temp_dir.path());

        let paths: Vec<&str> = summary.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "z.txt"]);
        assert!(errors.is_empty());
        assert!(hits.iter().any(|h| h.word == "omega" && h.file_index == 1));
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_aborts_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "alpha").unwrap();
        std::os::unix::fs::symlink(
            temp_dir.path().join("nowhere"),
            temp_dir.path().join("b_dangling"),
        )
        .unwrap();
        fs::write(temp_dir.path().join("c.txt"), "gamma").unwrap();

        let harness = Harness::new();
        let (summary, hits, errors) = harness.walk(temp_dir.path());

        let paths: Vec<&str> = summary.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt"]);
        assert_eq!(errors.len(), 1);
        assert!(
            matches!(&errors[0], ScanError::Walk { path, .. } if path == std::path::Path::new("b_dangling"))
        );
        // Work submitted before the failure still runs.
        assert!(hits.iter().any(|h| h.word == "alpha" && h.file_index == 0));
        assert!(!hits.iter().any(|h| h.word == "gamma"));
    }
}
