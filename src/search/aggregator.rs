//! Fan-in of tokenize results and walk errors into one generation.
//!
//! The aggregator runs on the scanning thread while the walker and the pool
//! workers produce. It stops after receiving two done signals:
//!
//! 1. [`DoneSignal::WorkFinished`] once the walker and every job it submitted
//!    have released their completion slots.
//! 2. [`DoneSignal::ChannelsClosed`] after the shutdown step has dropped its
//!    result and error senders and stopped the pool.
//!
//! It never closes a channel itself, it only reacts to closure.

use crossbeam_channel::{never, select, Receiver};
use tracing::{trace, warn};

use crate::error::ScanError;
use crate::index::{WordHit, WordIndex};

/// Number of done signals that end aggregation.
const DONE_SIGNALS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneSignal {
    WorkFinished,
    ChannelsClosed,
}

/// Output of one aggregation run.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub words: WordIndex,
    pub errors: Vec<ScanError>,
    /// Word occurrences received, before per-file deduplication.
    pub hits: usize,
}

pub struct Aggregator {
    results: Receiver<WordHit>,
    errors: Receiver<ScanError>,
    done: Receiver<DoneSignal>,
}

impl Aggregator {
    pub fn new(
        results: Receiver<WordHit>,
        errors: Receiver<ScanError>,
        done: Receiver<DoneSignal>,
    ) -> Self {
        Self {
            results,
            errors,
            done,
        }
    }

    /// Merge until both done signals have arrived.
    pub fn run(self) -> Aggregate {
        let mut aggregate = Aggregate::default();
        let closed_results: Receiver<WordHit> = never();
        let closed_errors: Receiver<ScanError> = never();
        let mut results_open = true;
        let mut errors_open = true;
        let mut remaining = DONE_SIGNALS;

        while remaining > 0 {
            let results = if results_open {
                &self.results
            } else {
                &closed_results
            };
            let errors = if errors_open {
                &self.errors
            } else {
                &closed_errors
            };

            select! {
                recv(results) -> msg => match msg {
                    Ok(hit) => aggregate.merge_hit(hit),
                    Err(_) => results_open = false,
                },
                recv(errors) -> msg => match msg {
                    Ok(err) => aggregate.merge_error(err),
                    Err(_) => errors_open = false,
                },
                recv(self.done) -> msg => match msg {
                    Ok(signal) => {
                        trace!(?signal, "Aggregator received done signal");
                        remaining -= 1;
                    }
                    Err(_) => {
                        warn!(remaining, "Done channel closed before all signals arrived");
                        break;
                    }
                },
            }
        }

        // Anything still buffered was sent before its producer finished.
        for hit in self.results.try_iter() {
            aggregate.merge_hit(hit);
        }
        for err in self.errors.try_iter() {
            aggregate.merge_error(err);
        }

        aggregate
    }
}

impl Aggregate {
    fn merge_hit(&mut self, hit: WordHit) {
        self.hits += 1;
        self.words.insert(hit.word, hit.file_index);
    }

    fn merge_error(&mut self, err: ScanError) {
        warn!(error = %err, "Scan error recorded");
        self.errors.push(err);
    }
}
