//! Pagination over `Scan` and `Query`
//!
//! [`PageFetcher`] follows `LastEvaluatedKey` for a single request,
//! [`ParallelScanPaginator`] runs every segment of a parallel scan
//! concurrently, and [`ItemIterator`] flattens either of them into items.

mod capacity;
mod fetcher;
mod items;
mod parallel;

pub use capacity::merge_consumed_capacities;
pub use fetcher::{PageFetcher, PageRequest, Paginator, QueryPaginator, ScanPaginator};
pub use items::ItemIterator;
pub use parallel::{ParallelScanPaginator, ScanState};
