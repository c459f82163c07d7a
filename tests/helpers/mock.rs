//! In-memory DynamoDB backend for driving the batch and pagination engines
//!
//! Each operation is answered by a handler closure that sees the request and
//! returns a [`Reply`]. Every call is recorded together with the (tokio) time
//! it started and finished, so tests running with a paused clock can check
//! ordering and concurrency.

use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemOutput;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemOutput;
use aws_sdk_dynamodb::types::{
    DeleteRequest, KeysAndAttributes, PutRequest, WriteRequest as SdkWriteRequest,
};
use dynamo_mapper::backend::{QueryRequest, ResultPage, ScanRequest};
use dynamo_mapper::{AttributeMap, DynamoDbBackend, Error, Key};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Answer to one call
pub struct Reply<O> {
    pub delay: Duration,
    pub result: Result<O, Error>,
}

impl<O> Reply<O> {
    pub fn ok(output: O) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(output),
        }
    }

    pub fn err(err: Error) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(err),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler<I, O> = Mutex<Box<dyn FnMut(&I) -> Reply<O> + Send>>;

pub type BatchGetRequest = HashMap<String, KeysAndAttributes>;
pub type BatchWriteRequest = HashMap<String, Vec<SdkWriteRequest>>;

/// A request the backend received
#[derive(Clone, Debug)]
pub enum Request {
    BatchGet(BatchGetRequest),
    BatchWrite(BatchWriteRequest),
    Scan(ScanRequest),
    Query(QueryRequest),
}

impl Request {
    /// Table of a single-table batch request
    pub fn table(&self) -> String {
        match self {
            Request::BatchGet(items) => items.keys().next().cloned().unwrap_or_default(),
            Request::BatchWrite(items) => items.keys().next().cloned().unwrap_or_default(),
            Request::Scan(request) => request.table_name.clone(),
            Request::Query(request) => request.table_name.clone(),
        }
    }

    /// Number of keys or writes in a batch request
    pub fn len(&self) -> usize {
        match self {
            Request::BatchGet(items) => items.values().map(|k| k.keys.len()).sum(),
            Request::BatchWrite(items) => items.values().map(Vec::len).sum(),
            Request::Scan(_) | Request::Query(_) => 1,
        }
    }
}

/// A recorded call
#[derive(Clone, Debug)]
pub struct Call {
    pub request: Request,
    pub started: Instant,
    pub finished: Instant,
}

pub struct MockBackend {
    batch_get: Handler<BatchGetRequest, BatchGetItemOutput>,
    batch_write: Handler<BatchWriteRequest, BatchWriteItemOutput>,
    scan: Handler<ScanRequest, ResultPage>,
    query: Handler<QueryRequest, ResultPage>,
    calls: Mutex<Vec<Call>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Every write succeeds, every key is missing and every page is empty
    pub fn new() -> Self {
        Self {
            batch_get: Mutex::new(Box::new(|_| {
                Reply::ok(BatchGetItemOutput::builder().build())
            })),
            batch_write: Mutex::new(Box::new(|_| {
                Reply::ok(BatchWriteItemOutput::builder().build())
            })),
            scan: Mutex::new(Box::new(|_| Reply::ok(ResultPage::default()))),
            query: Mutex::new(Box::new(|_| Reply::ok(ResultPage::default()))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_batch_get(
        self,
        handler: impl FnMut(&BatchGetRequest) -> Reply<BatchGetItemOutput> + Send + 'static,
    ) -> Self {
        *self.batch_get.lock().unwrap() = Box::new(handler);
        self
    }

    pub fn on_batch_write(
        self,
        handler: impl FnMut(&BatchWriteRequest) -> Reply<BatchWriteItemOutput> + Send + 'static,
    ) -> Self {
        *self.batch_write.lock().unwrap() = Box::new(handler);
        self
    }

    pub fn on_scan(
        self,
        handler: impl FnMut(&ScanRequest) -> Reply<ResultPage> + Send + 'static,
    ) -> Self {
        *self.scan.lock().unwrap() = Box::new(handler);
        self
    }

    pub fn on_query(
        self,
        handler: impl FnMut(&QueryRequest) -> Reply<ResultPage> + Send + 'static,
    ) -> Self {
        *self.query.lock().unwrap() = Box::new(handler);
        self
    }

    /// Every call so far, in completion order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls made for `table`, in completion order
    pub fn calls_for(&self, table: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.request.table() == table)
            .collect()
    }

    async fn answer<O>(&self, request: Request, reply: Reply<O>) -> Result<O, Error> {
        let started = Instant::now();
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        self.calls.lock().unwrap().push(Call {
            request,
            started,
            finished: Instant::now(),
        });
        reply.result
    }
}

impl DynamoDbBackend for MockBackend {
    async fn batch_get_item(
        &self,
        request_items: BatchGetRequest,
    ) -> Result<BatchGetItemOutput, Error> {
        let reply = {
            let mut handler = self.batch_get.lock().unwrap();
            (*handler)(&request_items)
        };
        self.answer(Request::BatchGet(request_items), reply).await
    }

    async fn batch_write_item(
        &self,
        request_items: BatchWriteRequest,
    ) -> Result<BatchWriteItemOutput, Error> {
        let reply = {
            let mut handler = self.batch_write.lock().unwrap();
            (*handler)(&request_items)
        };
        self.answer(Request::BatchWrite(request_items), reply).await
    }

    async fn scan(&self, request: ScanRequest) -> Result<ResultPage, Error> {
        let reply = {
            let mut handler = self.scan.lock().unwrap();
            (*handler)(&request)
        };
        self.answer(Request::Scan(request), reply).await
    }

    async fn query(&self, request: QueryRequest) -> Result<ResultPage, Error> {
        let reply = {
            let mut handler = self.query.lock().unwrap();
            (*handler)(&request)
        };
        self.answer(Request::Query(request), reply).await
    }
}

/// The only table and its keys of a batch get request
pub fn requested_keys(request: &BatchGetRequest) -> (String, Vec<Key>) {
    let (table, keys_and_attributes) = request.iter().next().expect("one table per request");
    (table.clone(), keys_and_attributes.keys.clone())
}

/// The only table and its writes of a batch write request
pub fn requested_writes(request: &BatchWriteRequest) -> (String, Vec<SdkWriteRequest>) {
    let (table, writes) = request.iter().next().expect("one table per request");
    (table.clone(), writes.clone())
}

/// Batch get response returning `items` and leaving `unprocessed` for `table`
pub fn get_output(
    table: &str,
    items: Vec<AttributeMap>,
    unprocessed: Vec<Key>,
) -> BatchGetItemOutput {
    let mut builder = BatchGetItemOutput::builder().responses(table, items);
    if !unprocessed.is_empty() {
        builder = builder.unprocessed_keys(
            table,
            KeysAndAttributes::builder()
                .set_keys(Some(unprocessed))
                .build()
                .unwrap(),
        );
    }
    builder.build()
}

/// Batch write response leaving `unprocessed` for `table`
pub fn write_output(table: &str, unprocessed: Vec<SdkWriteRequest>) -> BatchWriteItemOutput {
    if unprocessed.is_empty() {
        return BatchWriteItemOutput::builder().build();
    }
    BatchWriteItemOutput::builder()
        .unprocessed_items(table, unprocessed)
        .build()
}

/// SDK put request for `item`
pub fn sdk_put(item: AttributeMap) -> SdkWriteRequest {
    SdkWriteRequest::builder()
        .put_request(PutRequest::builder().set_item(Some(item)).build().unwrap())
        .build()
}

/// SDK delete request for `key`
pub fn sdk_delete(key: Key) -> SdkWriteRequest {
    SdkWriteRequest::builder()
        .delete_request(DeleteRequest::builder().set_key(Some(key)).build().unwrap())
        .build()
}
