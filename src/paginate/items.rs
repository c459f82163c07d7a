use aws_sdk_dynamodb::types::ConsumedCapacity;
use futures_util::{Stream, stream};
use std::collections::VecDeque;

use crate::Error;
use crate::backend::AttributeMap;
use crate::paginate::Paginator;

/// Flattens the pages of a [`Paginator`] into individual items
///
/// Items are yielded in page order, and in order within each page.
/// [`pages`](ItemIterator::pages) hands the underlying paginator back; since
/// it consumes the iterator, items can no longer be pulled from it afterwards:
///
/// ```compile_fail
/// # use dynamo_mapper::paginate::{ItemIterator, ScanPaginator};
/// # async fn example(mut items: ItemIterator<ScanPaginator<aws_sdk_dynamodb::Client>>) {
/// let pages = items.pages();
/// let _ = items.next_item().await;
/// # }
/// ```
#[derive(Debug)]
pub struct ItemIterator<P> {
    paginator: P,
    buffer: VecDeque<AttributeMap>,
    yielded: usize,
    closed: bool,
}

impl<P: Paginator> ItemIterator<P> {
    /// Iterate over the items of `paginator`
    pub fn new(paginator: P) -> Self {
        Self {
            paginator,
            buffer: VecDeque::new(),
            yielded: 0,
            closed: false,
        }
    }

    /// Next item, fetching another page when the current one is used up
    ///
    /// Empty pages are skipped. After [`close`](Self::close) every call
    /// fails with [`Error::IterationInterrupted`].
    pub async fn next_item(&mut self) -> Option<Result<AttributeMap, Error>> {
        if self.closed {
            return Some(Err(Error::IterationInterrupted));
        }

        loop {
            if let Some(item) = self.buffer.pop_front() {
                self.yielded += 1;
                return Some(Ok(item));
            }

            match self.paginator.next_page().await? {
                Ok(page) => self.buffer.extend(page.items),
                Err(err) => return Some(Err(err)),
            }
        }
    }

    /// The underlying paginator
    pub fn paginator(&self) -> &P {
        &self.paginator
    }

    /// Detach and return the underlying paginator
    ///
    /// Items buffered from the current page are discarded; the paginator
    /// continues with the next page.
    pub fn pages(self) -> P {
        self.paginator
    }

    /// Stop iterating and close the underlying paginator
    pub fn close(&mut self) {
        self.closed = true;
        self.buffer.clear();
        self.paginator.close();
    }

    /// Items yielded so far
    pub fn count(&self) -> usize {
        self.yielded
    }

    /// Items evaluated by the service so far, before filtering
    pub fn scanned_count(&self) -> usize {
        self.paginator.scanned_count()
    }

    /// Capacity consumed so far
    pub fn consumed_capacity(&self) -> Option<&ConsumedCapacity> {
        self.paginator.consumed_capacity()
    }

    /// Consume the iterator as a stream of items
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<AttributeMap, Error>> + Send {
        stream::unfold((self, false), |(mut items, failed)| async move {
            if failed {
                return None;
            }
            let item = items.next_item().await?;
            let failed = item.is_err();
            Some((item, (items, failed)))
        })
    }
}
