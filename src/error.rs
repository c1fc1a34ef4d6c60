//! Error types shared by the pool, the scanner and the searcher.

use std::path::PathBuf;
use thiserror::Error;

use crate::pool::PoolState;

/// Errors raised by the task pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was constructed with an unusable worker count or queue size.
    #[error("invalid pool configuration: {0}")]
    Config(String),

    /// A lifecycle call that the pool's current state does not allow.
    #[error("invalid pool transition from {from:?} to {to:?}")]
    InvalidTransition { from: PoolState, to: PoolState },
}

/// Errors recorded while walking and reading the scan root.
///
/// These never abort a scan; they are collected into the generation and make
/// every search against it fail with [`SearchError::IndexUnreliable`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("walk {}: {message}", path.display())]
    Walk { path: PathBuf, message: String },

    #[error("read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("worker pool: {0}")]
    Pool(#[from] PoolError),
}

impl ScanError {
    pub(crate) fn walk(path: impl Into<PathBuf>, err: &walkdir::Error) -> Self {
        let message = match err.io_error() {
            Some(io) => io.to_string(),
            None => err.to_string(),
        };
        ScanError::Walk {
            path: path.into(),
            message,
        }
    }

    pub(crate) fn stat(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        ScanError::Walk {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        ScanError::Read {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Errors returned by [`crate::search::Searcher::search`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("no such word in file(s): {word}")]
    NotFound { word: String },

    #[error("index is unreliable, last scan recorded {} error(s)", .0.len())]
    IndexUnreliable(Vec<ScanError>),
}

pub type SearchResult<T> = Result<T, SearchError>;
