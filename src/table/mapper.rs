use aws_sdk_dynamodb::Client;
use std::{collections::HashMap, fmt, sync::Arc};

use crate::Error;
use crate::backend::{DynamoDbBackend, QueryRequest, ScanRequest};
use crate::batch::RetryConfig;
use crate::paginate::{ParallelScanPaginator, QueryPaginator, ScanPaginator};
use crate::table::helpers::expressions::KeyConditionBuilder;
use crate::table::{
    DynamoTable, ParallelScanOptions, QueryOptions, ReadConsistency, ScanOptions,
    SortKeyCondition, TableIterator,
};

/// Typed entry point for batch, scan and query operations
///
/// Table names of every request are prefixed with `table_name_prefix`, which
/// lets one set of types address per-environment tables.
///
/// # Example
///
/// ```rust,no_run
/// use dynamo_mapper::{DataMapper, DynamoTable, ScanOptions};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Debug, Clone, Serialize, Deserialize)]
/// # struct User { user_id: String }
/// # impl DynamoTable for User {
/// #     type PK = String;
/// #     type SK = String;
/// #     const TABLE: &'static str = "users";
/// #     const PARTITION_KEY: &'static str = "user_id";
/// #     fn partition_key(&self) -> String { self.user_id.clone() }
/// # }
///
/// # async fn example() -> Result<(), dynamo_mapper::Error> {
/// let mapper = DataMapper::from_global().await.with_table_name_prefix("staging_");
/// let mut users = mapper.scan::<User>(ScanOptions::default().with_limit(100))?;
/// while let Some(user) = users.next_item().await {
///     println!("{:?}", user?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct DataMapper<B> {
    pub(crate) backend: Arc<B>,
    pub(crate) table_name_prefix: String,
    pub(crate) read_consistency: ReadConsistency,
    pub(crate) retry_config: RetryConfig,
}

impl<B> Clone for DataMapper<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            table_name_prefix: self.table_name_prefix.clone(),
            read_consistency: self.read_consistency,
            retry_config: self.retry_config,
        }
    }
}

impl<B> fmt::Debug for DataMapper<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataMapper")
            .field("table_name_prefix", &self.table_name_prefix)
            .field("read_consistency", &self.read_consistency)
            .field("retry_config", &self.retry_config)
            .finish()
    }
}

impl DataMapper<Client> {
    /// Mapper over the global DynamoDB client
    ///
    /// The client is initialized with defaults on first use; see
    /// [`dynamodb_client`](crate::dynamodb_client).
    pub async fn from_global() -> Self {
        Self::new(crate::dynamodb_client().await.clone())
    }
}

impl<B: DynamoDbBackend> DataMapper<B> {
    /// Mapper over `backend`
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Mapper over a shared backend
    pub fn from_arc(backend: Arc<B>) -> Self {
        Self {
            backend,
            table_name_prefix: String::new(),
            read_consistency: ReadConsistency::default(),
            retry_config: RetryConfig::default(),
        }
    }

    /// Prefix prepended to every table name
    pub fn with_table_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_name_prefix = prefix.into();
        self
    }

    /// Default read consistency for reads that do not specify one
    pub fn with_read_consistency(mut self, read_consistency: ReadConsistency) -> Self {
        self.read_consistency = read_consistency;
        self
    }

    /// Backoff for batch elements the service leaves unprocessed
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// The backend requests are sent to
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// `table_name` with the mapper's prefix applied
    pub fn table_name(&self, table_name: &str) -> String {
        format!("{}{}", self.table_name_prefix, table_name)
    }

    fn consistent_read(&self, read_consistency: Option<ReadConsistency>) -> Option<bool> {
        read_consistency
            .unwrap_or(self.read_consistency)
            .consistent_read()
    }

    /// Scan the table of `T`
    pub fn scan<T: DynamoTable>(
        &self,
        options: ScanOptions,
    ) -> Result<TableIterator<ScanPaginator<B>, T>, Error> {
        let request = ScanRequest {
            table_name: self.table_name(T::TABLE),
            index_name: options.index_name,
            limit: Some(i32::from(options.page_size.unwrap_or(T::DEFAULT_PAGE_SIZE))),
            exclusive_start_key: options.start_key,
            consistent_read: self.consistent_read(options.read_consistency),
            filter_expression: options.filter_expression,
            projection_expression: options.projection_expression,
            expression_attribute_names: non_empty(options.expression_attribute_names),
            expression_attribute_values: non_empty(options.expression_attribute_values),
            return_consumed_capacity: options.return_consumed_capacity,
            ..Default::default()
        };

        let mut paginator = ScanPaginator::new(Arc::clone(&self.backend), request);
        if let Some(limit) = options.limit {
            paginator = paginator.with_limit(limit);
        }
        Ok(TableIterator::new(paginator))
    }

    /// Query the partition `partition_key` of the table of `T`
    ///
    /// `sort_key` narrows the query to a range of the partition.
    pub fn query<T: DynamoTable>(
        &self,
        partition_key: &T::PK,
        sort_key: Option<SortKeyCondition<T::SK>>,
        options: QueryOptions,
    ) -> Result<TableIterator<QueryPaginator<B>, T>, Error> {
        let mut condition =
            KeyConditionBuilder::new().with_partition_key(T::PARTITION_KEY, partition_key)?;
        if let Some(sort_key) = &sort_key {
            let field = T::SORT_KEY.ok_or(Error::InvalidQuery(
                "a sort key condition was given for a table without a sort key",
            ))?;
            condition = condition.with_sort_key(field, sort_key)?;
        }
        let (key_condition_expression, key_names, key_values) = condition.build();

        let mut names = options.expression_attribute_names;
        names.extend(key_names);
        let mut values = options.expression_attribute_values;
        values.extend(key_values);

        let request = QueryRequest {
            table_name: self.table_name(T::TABLE),
            index_name: options.index_name,
            key_condition_expression,
            limit: Some(i32::from(options.page_size.unwrap_or(T::DEFAULT_PAGE_SIZE))),
            exclusive_start_key: options.start_key,
            consistent_read: self.consistent_read(options.read_consistency),
            scan_index_forward: options.reverse.then_some(false),
            filter_expression: options.filter_expression,
            projection_expression: options.projection_expression,
            expression_attribute_names: non_empty(names),
            expression_attribute_values: non_empty(values),
            return_consumed_capacity: options.return_consumed_capacity,
        };

        let mut paginator = QueryPaginator::new(Arc::clone(&self.backend), request);
        if let Some(limit) = options.limit {
            paginator = paginator.with_limit(limit);
        }
        Ok(TableIterator::new(paginator))
    }

    /// Scan the table of `T` with `total_segments` concurrent segments
    ///
    /// Fails with [`Error::InvalidScanState`] when `options.scan_state` does
    /// not hold exactly one entry per segment.
    pub fn parallel_scan<T: DynamoTable>(
        &self,
        total_segments: usize,
        options: ParallelScanOptions,
    ) -> Result<TableIterator<ParallelScanPaginator<B>, T>, Error> {
        let request = ScanRequest {
            table_name: self.table_name(T::TABLE),
            index_name: options.index_name,
            limit: Some(i32::from(options.page_size.unwrap_or(T::DEFAULT_PAGE_SIZE))),
            consistent_read: self.consistent_read(options.read_consistency),
            filter_expression: options.filter_expression,
            projection_expression: options.projection_expression,
            expression_attribute_names: non_empty(options.expression_attribute_names),
            expression_attribute_values: non_empty(options.expression_attribute_values),
            return_consumed_capacity: options.return_consumed_capacity,
            ..Default::default()
        };

        let backend = Arc::clone(&self.backend);
        let paginator = match options.scan_state {
            Some(scan_state) => {
                ParallelScanPaginator::resume(backend, request, total_segments, scan_state)?
            }
            None => ParallelScanPaginator::new(backend, request, total_segments),
        };
        Ok(TableIterator::new(paginator))
    }
}

fn non_empty<K, V>(map: HashMap<K, V>) -> Option<HashMap<K, V>> {
    (!map.is_empty()).then_some(map)
}
