use aws_sdk_dynamodb::types::ReturnConsumedCapacity;
use serde::Serialize;
use serde_dynamo::to_item;
use std::collections::HashMap;

use crate::Error;
use crate::backend::{AttributeMap, Key};
use crate::paginate::ScanState;
use crate::table::DynamoTable;

/// Partition key type alias - now fully generic
pub type PartitionKey<PK> = PK;

/// Sort key type alias - now fully generic
pub type SortKey<SK> = Option<SK>;

/// Composite key type alias - now fully generic
pub type CompositeKey<PK, SK> = (PK, SortKey<SK>);

/// Read consistency for gets, scans and queries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadConsistency {
    /// Eventually consistent reads (the DynamoDB default)
    #[default]
    Eventual,
    /// Strongly consistent reads
    Strong,
}

impl ReadConsistency {
    pub(crate) fn consistent_read(self) -> Option<bool> {
        match self {
            ReadConsistency::Eventual => None,
            ReadConsistency::Strong => Some(true),
        }
    }
}

/// Condition on the sort key of a query
#[derive(Clone, Debug, PartialEq)]
pub enum SortKeyCondition<SK> {
    /// Sort key equals the value
    Equals(SK),
    /// Sort key starts with the prefix
    BeginsWith(String),
    /// Sort key lies between the two values, inclusive
    Between(SK, SK),
}

/// Options for [`DataMapper::scan`](crate::DataMapper::scan)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanOptions {
    /// Scan a secondary index instead of the table
    pub index_name: Option<String>,
    /// Items evaluated per request; defaults to the table's `DEFAULT_PAGE_SIZE`
    pub page_size: Option<u16>,
    /// Stop after this many items
    pub limit: Option<usize>,
    /// Key to start after
    pub start_key: Option<Key>,
    /// Filter applied after items are read
    pub filter_expression: Option<String>,
    /// Attributes to return
    pub projection_expression: Option<String>,
    /// Substitution tokens for attribute names
    pub expression_attribute_names: HashMap<String, String>,
    /// Substitution tokens for attribute values
    pub expression_attribute_values: AttributeMap,
    /// Read consistency, overriding the mapper default
    pub read_consistency: Option<ReadConsistency>,
    /// Level of consumed capacity reporting
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

/// Options for [`DataMapper::query`](crate::DataMapper::query)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOptions {
    /// Query a secondary index instead of the table
    pub index_name: Option<String>,
    /// Items evaluated per request; defaults to the table's `DEFAULT_PAGE_SIZE`
    pub page_size: Option<u16>,
    /// Stop after this many items
    pub limit: Option<usize>,
    /// Key to start after
    pub start_key: Option<Key>,
    /// Return items in descending sort key order
    pub reverse: bool,
    /// Filter applied after items are read
    pub filter_expression: Option<String>,
    /// Attributes to return
    pub projection_expression: Option<String>,
    /// Substitution tokens for attribute names
    pub expression_attribute_names: HashMap<String, String>,
    /// Substitution tokens for attribute values
    pub expression_attribute_values: AttributeMap,
    /// Read consistency, overriding the mapper default
    pub read_consistency: Option<ReadConsistency>,
    /// Level of consumed capacity reporting
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

/// Options for [`DataMapper::parallel_scan`](crate::DataMapper::parallel_scan)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParallelScanOptions {
    /// Scan a secondary index instead of the table
    pub index_name: Option<String>,
    /// Items evaluated per request and segment
    pub page_size: Option<u16>,
    /// Snapshot of a previous scan to resume from
    pub scan_state: Option<Vec<ScanState>>,
    /// Filter applied after items are read
    pub filter_expression: Option<String>,
    /// Attributes to return
    pub projection_expression: Option<String>,
    /// Substitution tokens for attribute names
    pub expression_attribute_names: HashMap<String, String>,
    /// Substitution tokens for attribute values
    pub expression_attribute_values: AttributeMap,
    /// Read consistency, overriding the mapper default
    pub read_consistency: Option<ReadConsistency>,
    /// Level of consumed capacity reporting
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

macro_rules! impl_read_options {
    ($name:ident) => {
        impl $name {
            /// Filter items with `expression`, binding the fields of `values`
            /// as expression attribute values (e.g. a struct with a `:min` field)
            pub fn with_filter<U: Serialize>(
                mut self,
                expression: impl Into<String>,
                values: U,
            ) -> Result<Self, Error> {
                let values: AttributeMap = to_item(values)?;
                self.filter_expression = Some(expression.into());
                self.expression_attribute_values.extend(values);
                Ok(self)
            }

            /// Return only the attributes named by `expression`
            pub fn with_projection(mut self, expression: impl Into<String>) -> Self {
                self.projection_expression = Some(expression.into());
                self
            }

            /// Substitute `placeholder` (e.g. `#name`) with the attribute `name`
            pub fn with_attribute_name(
                mut self,
                placeholder: impl Into<String>,
                name: impl Into<String>,
            ) -> Self {
                let _ = self
                    .expression_attribute_names
                    .insert(placeholder.into(), name.into());
                self
            }

            /// Read from a secondary index
            pub fn with_index(mut self, index_name: impl Into<String>) -> Self {
                self.index_name = Some(index_name.into());
                self
            }

            /// Items evaluated per request
            pub fn with_page_size(mut self, page_size: u16) -> Self {
                self.page_size = Some(page_size);
                self
            }

            /// Override the mapper's read consistency
            pub fn with_read_consistency(mut self, read_consistency: ReadConsistency) -> Self {
                self.read_consistency = Some(read_consistency);
                self
            }

            /// Ask the service to report consumed capacity
            pub fn with_consumed_capacity(mut self, level: ReturnConsumedCapacity) -> Self {
                self.return_consumed_capacity = Some(level);
                self
            }
        }
    };
}

impl_read_options!(ScanOptions);
impl_read_options!(QueryOptions);
impl_read_options!(ParallelScanOptions);

impl ScanOptions {
    /// Stop after `limit` items
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Start after `key`, typically a previous page's last evaluated key
    pub fn with_start_key(mut self, key: Key) -> Self {
        self.start_key = Some(key);
        self
    }

    /// Start after a typed key of `T`, as returned by a paginator's `last_evaluated_key`
    pub fn with_start_composite_key<T: DynamoTable>(
        mut self,
        key: &CompositeKey<T::PK, T::SK>,
    ) -> Result<Self, Error> {
        self.start_key = Some(T::key_attributes(&key.0, key.1.as_ref())?);
        Ok(self)
    }
}

impl QueryOptions {
    /// Stop after `limit` items
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Start after `key`, typically a previous page's last evaluated key
    pub fn with_start_key(mut self, key: Key) -> Self {
        self.start_key = Some(key);
        self
    }

    /// Start after a typed key of `T`, as returned by a paginator's `last_evaluated_key`
    pub fn with_start_composite_key<T: DynamoTable>(
        mut self,
        key: &CompositeKey<T::PK, T::SK>,
    ) -> Result<Self, Error> {
        self.start_key = Some(T::key_attributes(&key.0, key.1.as_ref())?);
        Ok(self)
    }

    /// Return items in descending sort key order
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }
}

impl ParallelScanOptions {
    /// Resume from a snapshot taken with `scan_state()`
    pub fn with_scan_state(mut self, scan_state: Vec<ScanState>) -> Self {
        self.scan_state = Some(scan_state);
        self
    }
}
