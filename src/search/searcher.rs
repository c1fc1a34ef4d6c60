//! The searcher owns one scan generation and serves lookups against it.
//!
//! A generation is the file list, the word index and the scan errors produced
//! by one [`Searcher::scan`]. All three sit behind a single mutex: a scan holds
//! it from reset to commit, and searches take the same lock, so a search
//! always sees either the previous complete generation or the new one.

use crossbeam_channel::bounded;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, error, info};

use crate::error::{ScanError, SearchError, SearchResult};
use crate::index::{FileRecord, WordIndex};
use crate::pool::{PoolConfig, TaskPool, WaitGroup};
use crate::search::aggregator::{Aggregate, Aggregator, DoneSignal};
use crate::search::file_discovery::{DirectoryWalker, WalkSummary};
use crate::utils::{format_bytes, format_number};

/// Files, words and errors from one completed scan.
#[derive(Debug, Default)]
pub struct Generation {
    pub files: Vec<FileRecord>,
    pub words: WordIndex,
    pub errors: Vec<ScanError>,
}

/// Size of the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ScanStats {
    pub files: usize,
    pub words: usize,
    pub errors: usize,
}

pub struct Searcher {
    root: PathBuf,
    pool_config: PoolConfig,
    generation: Mutex<Generation>,
}

impl Searcher {
    /// Create a searcher for `root`. An empty root means the current directory.
    pub fn new(root: impl Into<PathBuf>, pool_config: PoolConfig) -> Self {
        let mut root = root.into();
        if root.as_os_str().is_empty() {
            root = PathBuf::from(".");
        }
        Self {
            root,
            pool_config,
            generation: Mutex::new(Generation::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> MutexGuard<'_, Generation> {
        // A panicked scan leaves a reset generation behind, which is still
        // consistent.
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild the generation from the filesystem.
    ///
    /// Blocks concurrent scans and searches until done. Failures are recorded
    /// in the generation's errors rather than returned.
    pub fn scan(&self) {
        let mut generation = self.lock();
        *generation = Generation::default();

        let start = Instant::now();
        info!(root = %self.root.display(), "Scan started");

        let (walk, aggregate) = self.run_scan();
        let lines = walk.lines;
        let bytes = walk.bytes;

        *generation = Generation {
            files: walk.files,
            words: aggregate.words,
            errors: aggregate.errors,
        };
        debug_assert!(generation
            .words
            .max_file_index()
            .map_or(true, |max| (max as usize) < generation.files.len()));

        let elapsed = start.elapsed();
        if generation.errors.is_empty() {
            info!(
                elapsed_secs = format!("{:.2}", elapsed.as_secs_f64()),
                files = %format_number(generation.files.len()),
                lines = %format_number(lines),
                words = %format_number(generation.words.len()),
                occurrences = %format_number(aggregate.hits),
                size = %format_bytes(bytes),
                "Scan completed"
            );
        } else {
            error!(
                elapsed_secs = format!("{:.2}", elapsed.as_secs_f64()),
                files = %format_number(generation.files.len()),
                errors = generation.errors.len(),
                "Scan completed with errors, searches will fail until the next clean scan"
            );
        }
    }

    /// Run the walker, pool and aggregator for one scan.
    fn run_scan(&self) -> (WalkSummary, Aggregate) {
        let pool = match TaskPool::from_config(self.pool_config) {
            Ok(pool) => pool,
            Err(e) => return Self::failed_before_walk(e.into()),
        };
        if let Err(e) = pool.start() {
            return Self::failed_before_walk(e.into());
        }

        let (results_tx, results_rx) = bounded(0);
        let (errors_tx, errors_rx) = bounded(0);
        let (done_tx, done_rx) = bounded(2);
        let jobs = WaitGroup::new();
        let aggregator = Aggregator::new(results_rx, errors_rx, done_rx);

        let (walk, aggregate) = std::thread::scope(|s| {
            let walker_slot = jobs.add();
            let walker = DirectoryWalker::new(
                self.root.clone(),
                &pool,
                results_tx.clone(),
                errors_tx.clone(),
                jobs.clone(),
            );
            let walk_handle = s.spawn(move || {
                let _walker_slot = walker_slot;
                walker.walk()
            });

            let pool = &pool;
            let jobs = &jobs;
            s.spawn(move || {
                jobs.wait();
                let _ = done_tx.send(DoneSignal::WorkFinished);

                drop(results_tx);
                drop(errors_tx);
                if let Err(e) = pool.stop() {
                    debug!(error = %e, "Task pool already stopped");
                }
                let _ = done_tx.send(DoneSignal::ChannelsClosed);
            });

            let mut aggregate = aggregator.run();
            let walk = walk_handle.join().unwrap_or_else(|_| {
                aggregate.errors.push(ScanError::Walk {
                    path: self.root.clone(),
                    message: "directory walker panicked".to_string(),
                });
                WalkSummary::default()
            });
            (walk, aggregate)
        });

        pool.join();
        (walk, aggregate)
    }

    fn failed_before_walk(err: ScanError) -> (WalkSummary, Aggregate) {
        error!(error = %err, "Scan could not start");
        let aggregate = Aggregate {
            errors: vec![err],
            ..Default::default()
        };
        (WalkSummary::default(), aggregate)
    }

    /// Paths of every file containing `word`, sorted.
    ///
    /// `word` is matched exactly as given: it is not normalized the way
    /// indexed tokens are, so a query containing punctuation never matches.
    pub fn search(&self, word: &str) -> SearchResult<Vec<String>> {
        let generation = self.lock();

        if !generation.errors.is_empty() {
            return Err(SearchError::IndexUnreliable(generation.errors.clone()));
        }

        let not_found = || SearchError::NotFound {
            word: word.to_string(),
        };
        let indices = generation.words.get(word).ok_or_else(not_found)?;

        let mut paths: Vec<String> = indices
            .iter()
            .filter_map(|i| generation.files.get(i as usize))
            .map(|file| file.path.clone())
            .collect();
        if paths.is_empty() {
            return Err(not_found());
        }
        paths.sort();
        Ok(paths)
    }

    /// Snapshot of the current file list.
    pub fn files(&self) -> Vec<FileRecord> {
        self.lock().files.clone()
    }

    /// Errors recorded by the last scan.
    pub fn errors(&self) -> Vec<ScanError> {
        self.lock().errors.clone()
    }

    pub fn stats(&self) -> ScanStats {
        let generation = self.lock();
        ScanStats {
            files: generation.files.len(),
            words: generation.words.len(),
            errors: generation.errors.len(),
        }
    }
}
