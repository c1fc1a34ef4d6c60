pub mod aggregator;
pub mod file_discovery;
pub mod scan_driver;
pub mod searcher;

pub use aggregator::{Aggregate, Aggregator, DoneSignal};
pub use file_discovery::{DirectoryWalker, WalkSummary};
pub use scan_driver::{ScanDriver, DEFAULT_RESCAN_INTERVAL};
pub use searcher::{Generation, ScanStats, Searcher};
