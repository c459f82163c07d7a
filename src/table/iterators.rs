use aws_sdk_dynamodb::types::ConsumedCapacity;
use futures_util::{Stream, StreamExt};
use std::{fmt, marker::PhantomData};

use crate::Error;
use crate::backend::DynamoDbBackend;
use crate::paginate::{ItemIterator, ParallelScanPaginator, Paginator, ScanState};
use crate::table::{CompositeKey, DynamoTable, unmarshall_item};

/// Typed items of a scan, query or parallel scan
pub struct TableIterator<P, T> {
    items: ItemIterator<P>,
    _table: PhantomData<fn() -> T>,
}

impl<P: fmt::Debug, T> fmt::Debug for TableIterator<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableIterator")
            .field("items", &self.items)
            .finish()
    }
}

impl<P: Paginator, T: DynamoTable> TableIterator<P, T> {
    pub(crate) fn new(paginator: P) -> Self {
        Self {
            items: ItemIterator::new(paginator),
            _table: PhantomData,
        }
    }

    /// Next item
    pub async fn next_item(&mut self) -> Option<Result<T, Error>> {
        Some(self.items.next_item().await?.and_then(unmarshall_item))
    }

    /// Switch to page-wise iteration, continuing with the next page
    pub fn pages(self) -> TablePaginator<P, T> {
        TablePaginator::new(self.items.pages())
    }

    /// Stop iterating
    pub fn close(&mut self) {
        self.items.close();
    }

    /// Items yielded so far
    pub fn count(&self) -> usize {
        self.items.count()
    }

    /// Items evaluated by the service so far
    pub fn scanned_count(&self) -> usize {
        self.items.scanned_count()
    }

    /// Capacity consumed so far
    pub fn consumed_capacity(&self) -> Option<&ConsumedCapacity> {
        self.items.consumed_capacity()
    }

    /// Consume the iterator as a stream of typed items
    pub fn into_stream(self) -> impl Stream<Item = Result<T, Error>> + Send {
        self.items
            .into_stream()
            .map(|item| item.and_then(unmarshall_item))
    }
}

impl<B: DynamoDbBackend, T: DynamoTable> TableIterator<ParallelScanPaginator<B>, T> {
    /// Snapshot of every segment's progress, for resuming later
    pub fn scan_state(&self) -> Vec<ScanState> {
        self.items.paginator().scan_state()
    }
}

/// Typed pages of a scan, query or parallel scan
pub struct TablePaginator<P, T: DynamoTable> {
    paginator: P,
    last_evaluated_key: Option<CompositeKey<T::PK, T::SK>>,
    _table: PhantomData<fn() -> T>,
}

impl<P: fmt::Debug, T: DynamoTable> fmt::Debug for TablePaginator<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TablePaginator")
            .field("paginator", &self.paginator)
            .field("last_evaluated_key", &self.last_evaluated_key)
            .finish()
    }
}

impl<P: Paginator, T: DynamoTable> TablePaginator<P, T> {
    pub(crate) fn new(paginator: P) -> Self {
        Self {
            paginator,
            last_evaluated_key: None,
            _table: PhantomData,
        }
    }

    /// Next page of typed items
    pub async fn next_page(&mut self) -> Option<Result<Vec<T>, Error>> {
        let page = match self.paginator.next_page().await? {
            Ok(page) => page,
            Err(err) => return Some(Err(err)),
        };

        self.last_evaluated_key = match page
            .last_evaluated_key
            .as_ref()
            .map(T::composite_key_from)
            .transpose()
        {
            Ok(key) => key.flatten(),
            Err(err) => return Some(Err(err)),
        };

        Some(
            page.items
                .into_iter()
                .map(unmarshall_item)
                .collect::<Result<Vec<T>, Error>>(),
        )
    }

    /// Typed key of the last item of the most recent page, if more pages follow
    pub fn last_evaluated_key(&self) -> Option<&CompositeKey<T::PK, T::SK>> {
        self.last_evaluated_key.as_ref()
    }

    /// Stop paginating
    pub fn close(&mut self) {
        self.paginator.close();
    }

    /// Items received so far
    pub fn count(&self) -> usize {
        self.paginator.count()
    }

    /// Items evaluated by the service so far
    pub fn scanned_count(&self) -> usize {
        self.paginator.scanned_count()
    }

    /// Capacity consumed so far
    pub fn consumed_capacity(&self) -> Option<&ConsumedCapacity> {
        self.paginator.consumed_capacity()
    }

    /// The untyped paginator
    pub fn into_inner(self) -> P {
        self.paginator
    }
}

impl<B: DynamoDbBackend, T: DynamoTable> TablePaginator<ParallelScanPaginator<B>, T> {
    /// Snapshot of every segment's progress, for resuming later
    pub fn scan_state(&self) -> Vec<ScanState> {
        self.paginator.scan_state()
    }
}
