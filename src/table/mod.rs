mod batch;
mod helpers;
mod iterators;
mod mapper;
mod operations;
mod state;
mod types;

pub use iterators::{TableIterator, TablePaginator};
pub use mapper::DataMapper;
pub use operations::{BatchItem, DynamoTable, Unmarshaller, unmarshall_item};
pub use types::{
    CompositeKey, ParallelScanOptions, PartitionKey, QueryOptions, ReadConsistency, ScanOptions,
    SortKey, SortKeyCondition,
};
