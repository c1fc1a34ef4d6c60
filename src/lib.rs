//! Concurrent in-memory word search over a directory tree.
//!
//! A [`search::Searcher`] walks its root, tokenizes every line on a bounded
//! [`pool::TaskPool`], and merges the words into a word → files index. The
//! [`search::ScanDriver`] rescans periodically and [`web`] serves lookups over
//! HTTP.

pub mod config;
pub mod error;
pub mod index;
pub mod pool;
pub mod search;
pub mod telemetry;
pub mod utils;
pub mod web;

pub use error::{PoolError, ScanError, SearchError};
