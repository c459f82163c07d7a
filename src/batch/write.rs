use futures_util::future::BoxFuture;
use futures_util::{FutureExt, Stream, StreamExt};
use std::{collections::HashMap, sync::Arc};

use aws_sdk_dynamodb::types::WriteRequest as SdkWriteRequest;

use crate::Error;
use crate::backend::DynamoDbBackend;
use crate::batch::operation::{BatchKind, BatchOperation, Outcome};
use crate::batch::{MAX_WRITE_BATCH_SIZE, RetryConfig, WriteRequest, item_identifier};

#[derive(Debug)]
pub(crate) struct WriteKind;

impl BatchKind for WriteKind {
    type Element = WriteRequest;
    type Output = WriteRequest;

    const BATCH_SIZE: usize = MAX_WRITE_BATCH_SIZE;
    const OPERATION: &'static str = "BatchWriteItem";

    fn execute<B: DynamoDbBackend>(
        &self,
        backend: Arc<B>,
        table_name: String,
        requests: Vec<WriteRequest>,
    ) -> BoxFuture<'static, Result<Outcome<WriteRequest, WriteRequest>, Error>> {
        async move {
            let sdk_requests = requests
                .iter()
                .cloned()
                .map(WriteRequest::into_sdk)
                .collect::<Result<Vec<_>, _>>()?;

            let mut request_items = HashMap::with_capacity(1);
            let _ = request_items.insert(table_name.clone(), sdk_requests);

            let output = backend.batch_write_item(request_items).await?;

            let unprocessed = output
                .unprocessed_items
                .and_then(|mut unprocessed| unprocessed.remove(&table_name))
                .unwrap_or_default()
                .into_iter()
                .map(WriteRequest::try_from)
                .collect::<Result<Vec<_>, _>>()?;

            let mut outstanding: HashMap<String, usize> = HashMap::new();
            for request in &unprocessed {
                *outstanding
                    .entry(item_identifier(&table_name, request))
                    .or_default() += 1;
            }

            let processed = requests
                .into_iter()
                .filter(|request| {
                    match outstanding.get_mut(&item_identifier(&table_name, request)) {
                        Some(count) if *count > 0 => {
                            *count -= 1;
                            false
                        }
                        _ => true,
                    }
                })
                .collect();

            Ok(Outcome {
                processed,
                unprocessed,
            })
        }
        .boxed()
    }
}

/// Put and delete items in any number of tables
///
/// Requests are grouped into `BatchWriteItem` calls of at most
/// [`MAX_WRITE_BATCH_SIZE`] writes for a single table. Every write is
/// yielded exactly once, as a `(table, request)` pair, after the service
/// acknowledged it. Writes left unprocessed are retried after a per-table
/// backoff until they succeed or a call fails.
#[derive(Debug)]
pub struct BatchWrite<B: DynamoDbBackend> {
    operation: BatchOperation<B, WriteKind>,
}

impl<B: DynamoDbBackend> BatchWrite<B> {
    /// Create a batch write over `(table, request)` pairs
    pub fn new<S>(backend: Arc<B>, requests: S) -> Self
    where
        S: Stream<Item = (String, WriteRequest)> + Send + 'static,
    {
        Self::from_results(backend, requests.map(Ok))
    }

    /// Create a batch write over SDK-shaped requests
    ///
    /// A request with neither (or both) of a put and a delete ends the
    /// operation with [`Error::InvalidWriteRequest`] before it is sent.
    pub fn from_sdk<S>(backend: Arc<B>, requests: S) -> Self
    where
        S: Stream<Item = (String, SdkWriteRequest)> + Send + 'static,
    {
        Self::from_results(
            backend,
            requests
                .map(|(table_name, request)| Ok((table_name, WriteRequest::try_from(request)?))),
        )
    }

    pub(crate) fn from_results<S>(backend: Arc<B>, requests: S) -> Self
    where
        S: Stream<Item = Result<(String, WriteRequest), Error>> + Send + 'static,
    {
        Self {
            operation: BatchOperation::new(backend, WriteKind, requests.boxed()),
        }
    }

    /// Set the backoff applied to tables with unprocessed writes
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.operation.set_retry_config(config);
        self
    }

    /// Next acknowledged `(table, request)` pair, or `None` once every write succeeded
    pub async fn next(&mut self) -> Option<Result<(String, WriteRequest), Error>> {
        self.operation.next().await
    }

    /// Consume the batch write as a stream
    pub fn into_stream(self) -> impl Stream<Item = Result<(String, WriteRequest), Error>> + Send {
        self.operation.into_stream()
    }
}
