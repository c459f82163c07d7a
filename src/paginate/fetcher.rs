use aws_sdk_dynamodb::types::ConsumedCapacity;
use futures_util::{Stream, stream};
use std::{future::Future, sync::Arc};
use tracing::trace;

use crate::Error;
use crate::backend::{DynamoDbBackend, Key, QueryRequest, ResultPage, ScanRequest};
use crate::paginate::merge_consumed_capacities;

/// A source of result pages
///
/// Implemented by the single-request [`PageFetcher`] and by the
/// [`ParallelScanPaginator`](crate::paginate::ParallelScanPaginator).
pub trait Paginator: Send {
    /// Fetch the next page, or `None` once the result set is exhausted
    ///
    /// After [`close`](Paginator::close) every call fails with
    /// [`Error::IterationInterrupted`].
    fn next_page(&mut self) -> impl Future<Output = Option<Result<ResultPage, Error>>> + Send;

    /// Stop paginating; pending work is abandoned
    fn close(&mut self);

    /// Items received so far
    fn count(&self) -> usize;

    /// Items evaluated by the service so far, before filtering
    fn scanned_count(&self) -> usize;

    /// Capacity consumed so far, when the requests asked for it
    fn consumed_capacity(&self) -> Option<&ConsumedCapacity>;

    /// Consume the paginator as a stream of pages
    ///
    /// The stream ends after the first error.
    fn into_stream(self) -> impl Stream<Item = Result<ResultPage, Error>> + Send
    where
        Self: Sized,
    {
        stream::unfold((self, false), |(mut paginator, failed)| async move {
            if failed {
                return None;
            }
            let page = paginator.next_page().await?;
            let failed = page.is_err();
            Some((page, (paginator, failed)))
        })
    }
}

/// A paginated request: a `Scan` or a `Query`
pub trait PageRequest: Clone + Send + Sync + 'static {
    /// The page size requested by the caller
    fn page_size(&self) -> Option<i32>;

    /// Replace the page size of the next call
    fn set_page_size(&mut self, limit: Option<i32>);

    /// Replace the key the next call starts from
    fn set_exclusive_start_key(&mut self, key: Option<Key>);

    /// Issue the request
    fn send<B: DynamoDbBackend>(
        self,
        backend: &B,
    ) -> impl Future<Output = Result<ResultPage, Error>> + Send;
}

impl PageRequest for ScanRequest {
    fn page_size(&self) -> Option<i32> {
        self.limit
    }

    fn set_page_size(&mut self, limit: Option<i32>) {
        self.limit = limit;
    }

    fn set_exclusive_start_key(&mut self, key: Option<Key>) {
        self.exclusive_start_key = key;
    }

    async fn send<B: DynamoDbBackend>(self, backend: &B) -> Result<ResultPage, Error> {
        backend.scan(self).await
    }
}

impl PageRequest for QueryRequest {
    fn page_size(&self) -> Option<i32> {
        self.limit
    }

    fn set_page_size(&mut self, limit: Option<i32>) {
        self.limit = limit;
    }

    fn set_exclusive_start_key(&mut self, key: Option<Key>) {
        self.exclusive_start_key = key;
    }

    async fn send<B: DynamoDbBackend>(self, backend: &B) -> Result<ResultPage, Error> {
        backend.query(self).await
    }
}

/// Follows `LastEvaluatedKey` across calls of one `Scan` or `Query`
///
/// An optional item limit caps each request's page size at the number of
/// items still wanted; once it is reached no further calls are made. A
/// failed call ends the pagination.
#[derive(Debug)]
pub struct PageFetcher<B, R> {
    backend: Arc<B>,
    next_request: Option<R>,
    limit: Option<usize>,
    count: usize,
    scanned_count: usize,
    consumed_capacity: Option<ConsumedCapacity>,
    last_evaluated_key: Option<Key>,
    closed: bool,
}

/// Paginator over a sequential `Scan`
pub type ScanPaginator<B> = PageFetcher<B, ScanRequest>;

/// Paginator over a `Query`
pub type QueryPaginator<B> = PageFetcher<B, QueryRequest>;

impl<B: DynamoDbBackend, R: PageRequest> PageFetcher<B, R> {
    /// Paginate `request`, starting from its `exclusive_start_key` if set
    pub fn new(backend: Arc<B>, request: R) -> Self {
        Self {
            backend,
            next_request: Some(request),
            limit: None,
            count: 0,
            scanned_count: 0,
            consumed_capacity: None,
            last_evaluated_key: None,
            closed: false,
        }
    }

    /// Stop after `limit` items have been received
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Key of the last item of the most recent page, if there are more pages
    pub fn last_evaluated_key(&self) -> Option<&Key> {
        self.last_evaluated_key.as_ref()
    }

    fn next_page_size(&self, requested: Option<i32>) -> Option<i32> {
        match self.limit {
            None => requested,
            Some(limit) => {
                let remaining = limit.saturating_sub(self.count);
                let remaining = i32::try_from(remaining).unwrap_or(i32::MAX);
                Some(requested.map_or(remaining, |requested| requested.min(remaining)))
            }
        }
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.count >= limit)
    }
}

impl<B: DynamoDbBackend, R: PageRequest> Paginator for PageFetcher<B, R> {
    async fn next_page(&mut self) -> Option<Result<ResultPage, Error>> {
        if self.closed {
            return Some(Err(Error::IterationInterrupted));
        }
        if self.limit_reached() {
            self.next_request = None;
            return None;
        }

        let mut request = self.next_request.take()?;
        let mut outgoing = request.clone();
        outgoing.set_page_size(self.next_page_size(request.page_size()));

        let page = match outgoing.send(self.backend.as_ref()).await {
            Ok(page) => page,
            Err(err) => return Some(Err(err)),
        };

        match merge_consumed_capacities(
            self.consumed_capacity.as_ref(),
            page.consumed_capacity.as_ref(),
        ) {
            Ok(merged) => self.consumed_capacity = merged,
            Err(err) => return Some(Err(err)),
        }

        self.count += page.items.len();
        self.scanned_count += usize::try_from(page.scanned_count).unwrap_or_default();
        self.last_evaluated_key = page.last_evaluated_key.clone();

        trace!(
            items = page.items.len(),
            count = self.count,
            more = page.last_evaluated_key.is_some(),
            "fetched page"
        );

        if let Some(key) = &page.last_evaluated_key {
            request.set_exclusive_start_key(Some(key.clone()));
            self.next_request = Some(request);
        }

        Some(Ok(page))
    }

    fn close(&mut self) {
        self.closed = true;
        self.next_request = None;
    }

    fn count(&self) -> usize {
        self.count
    }

    fn scanned_count(&self) -> usize {
        self.scanned_count
    }

    fn consumed_capacity(&self) -> Option<&ConsumedCapacity> {
        self.consumed_capacity.as_ref()
    }
}
