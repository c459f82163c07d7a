use aws_sdk_dynamodb::types::KeysAndAttributes;
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, Stream, StreamExt};
use std::{collections::HashMap, sync::Arc};

use crate::Error;
use crate::backend::{AttributeMap, DynamoDbBackend, Key};
use crate::batch::operation::{BatchKind, BatchOperation, Outcome};
use crate::batch::{BatchGetOptions, MAX_READ_BATCH_SIZE, RetryConfig};

#[derive(Debug)]
pub(crate) struct GetKind {
    options: BatchGetOptions,
}

impl BatchKind for GetKind {
    type Element = Key;
    type Output = AttributeMap;

    const BATCH_SIZE: usize = MAX_READ_BATCH_SIZE;
    const OPERATION: &'static str = "BatchGetItem";

    fn execute<B: DynamoDbBackend>(
        &self,
        backend: Arc<B>,
        table_name: String,
        keys: Vec<Key>,
    ) -> BoxFuture<'static, Result<Outcome<Key, AttributeMap>, Error>> {
        let options = self.options.for_table(&table_name);
        async move {
            let keys_and_attributes = KeysAndAttributes::builder()
                .set_keys(Some(keys))
                .set_consistent_read(options.consistent_read)
                .set_projection_expression(options.projection_expression)
                .set_expression_attribute_names(options.expression_attribute_names)
                .build()?;

            let mut request_items = HashMap::with_capacity(1);
            let _ = request_items.insert(table_name.clone(), keys_and_attributes);

            let output = backend.batch_get_item(request_items).await?;

            let processed = output
                .responses
                .and_then(|mut responses| responses.remove(&table_name))
                .unwrap_or_default();
            let unprocessed = output
                .unprocessed_keys
                .and_then(|mut unprocessed| unprocessed.remove(&table_name))
                .map(|keys_attrs| keys_attrs.keys)
                .unwrap_or_default();

            Ok(Outcome {
                processed,
                unprocessed,
            })
        }
        .boxed()
    }
}

/// Retrieve items by key from any number of tables
///
/// Keys are grouped into `BatchGetItem` calls of at most
/// [`MAX_READ_BATCH_SIZE`] keys for a single table. Items are yielded as
/// `(table, item)` pairs in the order responses arrive, and each table backs
/// off independently when the service returns unprocessed keys.
///
/// # Example
///
/// ```rust,no_run
/// use dynamo_mapper::batch::BatchGet;
/// use futures_util::stream;
/// # async fn example(client: aws_sdk_dynamodb::Client, keys: Vec<dynamo_mapper::Key>) {
/// let mut batch = BatchGet::new(
///     std::sync::Arc::new(client),
///     stream::iter(keys.into_iter().map(|key| ("users".to_string(), key))),
/// );
/// while let Some(result) = batch.next().await {
///     let (table, item) = result.expect("batch get failed");
///     println!("{table}: {item:?}");
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct BatchGet<B: DynamoDbBackend> {
    operation: BatchOperation<B, GetKind>,
}

impl<B: DynamoDbBackend> BatchGet<B> {
    /// Create a batch get over `(table, key)` pairs
    pub fn new<S>(backend: Arc<B>, keys: S) -> Self
    where
        S: Stream<Item = (String, Key)> + Send + 'static,
    {
        Self::from_results(backend, keys.map(Ok))
    }

    pub(crate) fn from_results<S>(backend: Arc<B>, keys: S) -> Self
    where
        S: Stream<Item = Result<(String, Key), Error>> + Send + 'static,
    {
        let kind = GetKind {
            options: BatchGetOptions::default(),
        };
        Self {
            operation: BatchOperation::new(backend, kind, keys.boxed()),
        }
    }

    /// Set read consistency and per-table projections
    pub fn with_options(mut self, options: BatchGetOptions) -> Self {
        self.operation.kind_mut().options = options;
        self
    }

    /// Set the backoff applied to tables with unprocessed keys
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.operation.set_retry_config(config);
        self
    }

    /// Next retrieved `(table, item)` pair, or `None` once every key was resolved
    pub async fn next(&mut self) -> Option<Result<(String, AttributeMap), Error>> {
        self.operation.next().await
    }

    /// Consume the batch get as a stream
    pub fn into_stream(self) -> impl Stream<Item = Result<(String, AttributeMap), Error>> + Send {
        self.operation.into_stream()
    }
}
