use aws_sdk_dynamodb::types::ConsumedCapacity;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::future::poll_fn;
use std::task::Poll;
use std::{fmt, sync::Arc};
use tracing::debug;

use crate::Error;
use crate::backend::{DynamoDbBackend, Key, ResultPage, ScanRequest};
use crate::paginate::{Paginator, ScanPaginator, merge_consumed_capacities};

/// Progress of one parallel scan segment
///
/// A snapshot of all segments, taken with
/// [`ParallelScanPaginator::scan_state`], can be handed to
/// [`ParallelScanPaginator::resume`] to continue the scan later. Keys hold SDK
/// attribute values, so persisting a snapshot means converting it with
/// `serde_dynamo` or a similar codec first.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ScanState {
    /// No page has been received for this segment yet
    #[default]
    Uninitialized,
    /// At least one page was received
    Initialized {
        /// Key to continue from; `None` means the segment is exhausted
        last_evaluated_key: Option<Key>,
    },
}

impl ScanState {
    /// The segment was scanned to its end
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            ScanState::Initialized {
                last_evaluated_key: None
            }
        )
    }

    /// Key to continue this segment from
    pub fn last_evaluated_key(&self) -> Option<&Key> {
        match self {
            ScanState::Uninitialized => None,
            ScanState::Initialized { last_evaluated_key } => last_evaluated_key.as_ref(),
        }
    }
}

struct SegmentPage<B> {
    segment: usize,
    paginator: ScanPaginator<B>,
    page: Option<Result<ResultPage, Error>>,
}

/// Scans all segments of a table concurrently
///
/// Each segment has at most one request in flight. Pages are yielded in the
/// order they arrive; a segment that has just produced a page goes to the
/// back of the line, so a quick segment cannot starve a slow one.
pub struct ParallelScanPaginator<B> {
    scan_state: Vec<ScanState>,
    pending: Vec<BoxFuture<'static, SegmentPage<B>>>,
    idle: Vec<Option<ScanPaginator<B>>>,
    count: usize,
    scanned_count: usize,
    consumed_capacity: Option<ConsumedCapacity>,
    closed: bool,
}

impl<B> fmt::Debug for ParallelScanPaginator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelScanPaginator")
            .field("scan_state", &self.scan_state)
            .field("pending", &self.pending.len())
            .field("count", &self.count)
            .field("scanned_count", &self.scanned_count)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<B: DynamoDbBackend> ParallelScanPaginator<B> {
    /// Start a parallel scan with `total_segments` segments
    ///
    /// `segment`, `total_segments` and `exclusive_start_key` of `request` are
    /// set per segment.
    pub fn new(backend: Arc<B>, request: ScanRequest, total_segments: usize) -> Self {
        Self::start(backend, request, vec![ScanState::Uninitialized; total_segments])
    }

    /// Continue a parallel scan from a [`scan_state`](Self::scan_state) snapshot
    ///
    /// Exhausted segments are not requested again.
    pub fn resume(
        backend: Arc<B>,
        request: ScanRequest,
        total_segments: usize,
        scan_state: Vec<ScanState>,
    ) -> Result<Self, Error> {
        if scan_state.len() != total_segments {
            return Err(Error::InvalidScanState {
                expected: total_segments,
                actual: scan_state.len(),
            });
        }
        Ok(Self::start(backend, request, scan_state))
    }

    fn start(backend: Arc<B>, request: ScanRequest, scan_state: Vec<ScanState>) -> Self {
        let total_segments = i32::try_from(scan_state.len()).unwrap_or(i32::MAX);
        let mut pending = Vec::with_capacity(scan_state.len());
        let mut idle = Vec::with_capacity(scan_state.len());

        for (segment, state) in scan_state.iter().enumerate() {
            let mut segment_request = request.clone();
            segment_request.segment = Some(i32::try_from(segment).unwrap_or(i32::MAX));
            segment_request.total_segments = Some(total_segments);
            segment_request.exclusive_start_key = state.last_evaluated_key().cloned();

            let paginator = ScanPaginator::new(Arc::clone(&backend), segment_request);
            if state.is_exhausted() {
                idle.push(Some(paginator));
            } else {
                idle.push(None);
                pending.push(Self::arm(segment, paginator));
            }
        }

        Self {
            scan_state,
            pending,
            idle,
            count: 0,
            scanned_count: 0,
            consumed_capacity: None,
            closed: false,
        }
    }

    /// Snapshot of every segment's progress
    ///
    /// Pages still in flight are not reflected; resuming from the snapshot
    /// requests them again.
    pub fn scan_state(&self) -> Vec<ScanState> {
        self.scan_state.clone()
    }

    fn arm(segment: usize, mut paginator: ScanPaginator<B>) -> BoxFuture<'static, SegmentPage<B>> {
        async move {
            let page = paginator.next_page().await;
            SegmentPage {
                segment,
                paginator,
                page,
            }
        }
        .boxed()
    }

    /// Wait for the first pending segment to settle
    ///
    /// Segments are polled in queue order, so when several are ready at once
    /// the one that has waited longest wins.
    async fn race(&mut self) -> SegmentPage<B> {
        let pending = &mut self.pending;
        let (index, settled) = poll_fn(|cx| {
            for (index, future) in pending.iter_mut().enumerate() {
                if let Poll::Ready(settled) = future.as_mut().poll(cx) {
                    return Poll::Ready((index, settled));
                }
            }
            Poll::Pending
        })
        .await;
        drop(pending.remove(index));
        settled
    }

    fn record(&mut self, page: &ResultPage) -> Result<(), Error> {
        self.consumed_capacity = merge_consumed_capacities(
            self.consumed_capacity.as_ref(),
            page.consumed_capacity.as_ref(),
        )?;
        self.count += page.items.len();
        self.scanned_count += usize::try_from(page.scanned_count).unwrap_or_default();
        Ok(())
    }
}

impl<B: DynamoDbBackend> Paginator for ParallelScanPaginator<B> {
    async fn next_page(&mut self) -> Option<Result<ResultPage, Error>> {
        if self.closed {
            return Some(Err(Error::IterationInterrupted));
        }

        while !self.pending.is_empty() {
            let SegmentPage {
                segment,
                paginator,
                page,
            } = self.race().await;

            match page {
                Some(Ok(page)) => {
                    self.scan_state[segment] = ScanState::Initialized {
                        last_evaluated_key: page.last_evaluated_key.clone(),
                    };
                    if page.last_evaluated_key.is_some() {
                        self.pending.push(Self::arm(segment, paginator));
                    } else {
                        debug!(segment, "parallel scan segment finished");
                        self.idle[segment] = Some(paginator);
                    }
                    if let Err(err) = self.record(&page) {
                        self.pending.clear();
                        return Some(Err(err));
                    }
                    return Some(Ok(page));
                }
                Some(Err(err)) => {
                    self.idle[segment] = Some(paginator);
                    self.pending.clear();
                    return Some(Err(err));
                }
                None => {
                    debug!(segment, "parallel scan segment finished");
                    self.scan_state[segment] = ScanState::Initialized {
                        last_evaluated_key: None,
                    };
                    self.idle[segment] = Some(paginator);
                }
            }
        }

        None
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
        for paginator in self.idle.iter_mut().flatten() {
            paginator.close();
        }
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
