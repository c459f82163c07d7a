//! Batch get and batch write engines
//!
//! Both engines accept an asynchronous stream of `(table, element)` pairs and
//! yield results as soon as DynamoDB acknowledges them. Elements are grouped
//! into single-table requests no larger than DynamoDB allows, every table has
//! at most one request in flight, and tables whose requests come back with
//! unprocessed elements back off on their own without holding up the others.

mod get;
mod identifier;
mod operation;
mod partition;
mod throttle;
mod types;
mod write;

pub use get::BatchGet;
pub use identifier::item_identifier;
pub use types::{BatchGetOptions, RetryConfig, TableOptions, WriteRequest, WriteType};
pub use write::BatchWrite;

pub(crate) use identifier::key_identifier;

/// Largest number of keys a single `BatchGetItem` call may carry
pub const MAX_READ_BATCH_SIZE: usize = 100;

/// Largest number of writes a single `BatchWriteItem` call may carry
pub const MAX_WRITE_BATCH_SIZE: usize = 25;

/// Number of full requests worth of input buffered before partial requests are flushed
pub(crate) const DEFAULT_CONCURRENCY: usize = 10;
