use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream, FuturesUnordered};
use futures_util::{FutureExt, Stream, StreamExt};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::Error;
use crate::backend::DynamoDbBackend;
use crate::batch::partition::RequestPartitioner;
use crate::batch::throttle::ThrottleTracker;
use crate::batch::{DEFAULT_CONCURRENCY, RetryConfig};

/// What one batch call did with the elements it was given
#[derive(Debug)]
pub(crate) struct Outcome<E, O> {
    pub(crate) processed: Vec<O>,
    pub(crate) unprocessed: Vec<E>,
}

/// A batch operation flavor: how many elements fit in one call and how a call is made
pub(crate) trait BatchKind: Send + 'static {
    /// One input element (a key for reads, a write request for writes)
    type Element: Send + 'static;
    /// One yielded result
    type Output: Send + 'static;

    /// Largest number of elements DynamoDB accepts in one call
    const BATCH_SIZE: usize;
    /// Operation name used in log records
    const OPERATION: &'static str;

    /// Send one single-table request
    fn execute<B: DynamoDbBackend>(
        &self,
        backend: Arc<B>,
        table_name: String,
        elements: Vec<Self::Element>,
    ) -> BoxFuture<'static, Result<Outcome<Self::Element, Self::Output>, Error>>;
}

type Completion<K> = (
    String,
    Result<Outcome<<K as BatchKind>::Element, <K as BatchKind>::Output>, Error>,
);

enum Event<K: BatchKind> {
    Input(Option<Result<(String, K::Element), Error>>),
    Completed(Completion<K>),
    Released(String),
}

/// Drives a stream of `(table, element)` pairs through batched, throttled calls
///
/// Elements are partitioned by table, and each table has at most one request
/// in flight. Elements the service leaves unprocessed are retried ahead of
/// fresh input once the table's backoff elapses. Outputs are yielded in
/// completion order.
pub(crate) struct BatchOperation<B, K: BatchKind> {
    backend: Arc<B>,
    kind: K,
    source: BoxStream<'static, Result<(String, K::Element), Error>>,
    source_done: bool,
    partitioner: RequestPartitioner<K::Element>,
    throttle: ThrottleTracker<K::Element>,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion<K>>>,
    busy: HashSet<String>,
    ready: VecDeque<(String, K::Output)>,
    max_buffered: usize,
    finished: bool,
}

impl<B, K: BatchKind> fmt::Debug for BatchOperation<B, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOperation")
            .field("operation", &K::OPERATION)
            .field("source_done", &self.source_done)
            .field("buffered", &self.partitioner.buffered())
            .field("throttle", &self.throttle)
            .field("in_flight", &self.busy)
            .field("ready", &self.ready.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl<B: DynamoDbBackend, K: BatchKind> BatchOperation<B, K> {
    pub(crate) fn new(
        backend: Arc<B>,
        kind: K,
        source: BoxStream<'static, Result<(String, K::Element), Error>>,
    ) -> Self {
        Self {
            backend,
            kind,
            source,
            source_done: false,
            partitioner: RequestPartitioner::new(K::BATCH_SIZE),
            throttle: ThrottleTracker::new(RetryConfig::default()),
            in_flight: FuturesUnordered::new(),
            busy: HashSet::new(),
            ready: VecDeque::new(),
            max_buffered: K::BATCH_SIZE * DEFAULT_CONCURRENCY,
            finished: false,
        }
    }

    pub(crate) fn kind_mut(&mut self) -> &mut K {
        &mut self.kind
    }

    pub(crate) fn set_retry_config(&mut self, config: RetryConfig) {
        self.throttle.set_config(config);
    }

    /// Yield the next processed element, or `None` once every input element
    /// has been yielded
    ///
    /// The first error ends the operation: requests still in flight are
    /// dropped and later calls return `None`.
    pub(crate) async fn next(&mut self) -> Option<Result<(String, K::Output), Error>> {
        loop {
            if self.finished {
                return None;
            }
            if let Some(output) = self.ready.pop_front() {
                return Some(Ok(output));
            }
            if self.is_drained() {
                self.finished = true;
                return None;
            }

            self.dispatch();

            let reading = !self.source_done && self.partitioner.buffered() < self.max_buffered;
            let waiting = !self.in_flight.is_empty();
            let backing_off = self.throttle.has_timers();

            let event: Event<K> = tokio::select! {
                input = self.source.next(), if reading => Event::Input(input),
                Some(completion) = self.in_flight.next(), if waiting => Event::Completed(completion),
                Some(table_name) = self.throttle.next_release(), if backing_off => Event::Released(table_name),
                else => {
                    self.finished = true;
                    return None;
                }
            };

            match event {
                Event::Input(Some(Ok((table_name, element)))) => {
                    self.partitioner.push(table_name, element);
                }
                Event::Input(Some(Err(err))) => return Some(Err(self.fail(err))),
                Event::Input(None) => self.source_done = true,
                Event::Completed((table_name, result)) => {
                    let _ = self.busy.remove(&table_name);
                    match result {
                        Ok(outcome) => self.complete(table_name, outcome),
                        Err(err) => return Some(Err(self.fail(err))),
                    }
                }
                Event::Released(table_name) => self.throttle.release(&table_name),
            }
        }
    }

    /// Turn the operation into a stream of `(table, output)` pairs
    pub(crate) fn into_stream(
        self,
    ) -> impl Stream<Item = Result<(String, K::Output), Error>> + Send {
        stream::unfold(self, |mut operation| async move {
            let next = operation.next().await?;
            Some((next, operation))
        })
    }

    fn is_drained(&self) -> bool {
        self.source_done
            && self.partitioner.buffered() == 0
            && self.throttle.pending() == 0
            && self.in_flight.is_empty()
    }

    /// Send a request for every table that has enough work and nothing in flight
    fn dispatch(&mut self) {
        let flush = self.source_done || self.partitioner.buffered() >= self.max_buffered;
        let candidates: BTreeSet<String> = self
            .partitioner
            .tables()
            .chain(self.throttle.tables())
            .cloned()
            .collect();

        for table_name in candidates {
            if self.busy.contains(&table_name) || self.throttle.is_gated(&table_name) {
                continue;
            }

            let retrying = self.throttle.has_unprocessed(&table_name);
            let queued = self.partitioner.queued(&table_name);
            if !(retrying || self.partitioner.is_full(&table_name) || (flush && queued > 0)) {
                continue;
            }

            let mut elements = self.throttle.take_unprocessed(&table_name, K::BATCH_SIZE);
            let room = K::BATCH_SIZE - elements.len();
            elements.extend(self.partitioner.take(&table_name, room));

            debug!(
                operation = K::OPERATION,
                table = %table_name,
                elements = elements.len(),
                backoff_factor = self.throttle.backoff_factor(&table_name),
                "dispatching batch request"
            );

            let request = self
                .kind
                .execute(Arc::clone(&self.backend), table_name.clone(), elements);
            let _ = self.busy.insert(table_name.clone());
            self.in_flight
                .push(request.map(move |result| (table_name, result)).boxed());
        }
    }

    fn complete(&mut self, table_name: String, outcome: Outcome<K::Element, K::Output>) {
        if outcome.unprocessed.is_empty() {
            self.throttle.reset(&table_name);
        } else {
            let unprocessed = outcome.unprocessed.len();
            let delay = self.throttle.throttle(&table_name, outcome.unprocessed);
            warn!(
                operation = K::OPERATION,
                table = %table_name,
                unprocessed,
                backoff_factor = self.throttle.backoff_factor(&table_name),
                delay = ?delay,
                "batch request throttled"
            );
        }

        self.ready.extend(
            outcome
                .processed
                .into_iter()
                .map(|output| (table_name.clone(), output)),
        );
    }

    fn fail(&mut self, err: Error) -> Error {
        warn!(operation = K::OPERATION, error = %err, "batch operation failed");
        self.finished = true;
        self.in_flight = FuturesUnordered::new();
        self.ready.clear();
        err
    }
}
