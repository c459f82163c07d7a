use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;

use crate::batch::RetryConfig;

/// Upper bound of the delay after `attempt` consecutive throttled responses
///
/// # Arguments
/// * `attempt` - The backoff factor (1 for the first throttled response)
/// * `initial` - Delay ceiling for the first throttled response
/// * `max` - Maximum delay duration
pub(crate) fn backoff_ceiling(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
    initial.saturating_mul(multiplier).min(max)
}

/// Full jitter: a uniformly random delay below the ceiling
pub(crate) fn retry_delay(attempt: u32, config: &RetryConfig) -> Duration {
    backoff_ceiling(attempt, config.initial_delay, config.max_delay).mul_f64(fastrand::f64())
}

struct TableThrottle<E> {
    backoff_factor: u32,
    gated: bool,
    unprocessed: VecDeque<E>,
}

impl<E> Default for TableThrottle<E> {
    fn default() -> Self {
        Self {
            backoff_factor: 0,
            gated: false,
            unprocessed: VecDeque::new(),
        }
    }
}

/// Per-table backoff state and the queue of elements awaiting retry
pub(crate) struct ThrottleTracker<E> {
    config: RetryConfig,
    tables: BTreeMap<String, TableThrottle<E>>,
    timers: FuturesUnordered<BoxFuture<'static, String>>,
}

impl<E> fmt::Debug for ThrottleTracker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottleTracker")
            .field("config", &self.config)
            .field("pending", &self.pending())
            .field("timers", &self.timers.len())
            .finish()
    }
}

impl<E> ThrottleTracker<E> {
    pub(crate) fn new(config: RetryConfig) -> Self {
        Self {
            config,
            tables: BTreeMap::new(),
            timers: FuturesUnordered::new(),
        }
    }

    pub(crate) fn set_config(&mut self, config: RetryConfig) {
        self.config = config;
    }

    /// Queue elements the service left unprocessed and gate the table
    ///
    /// Returns the delay after which the table is released.
    pub(crate) fn throttle(&mut self, table_name: &str, unprocessed: Vec<E>) -> Duration {
        let max_factor = self.config.max_backoff_factor.max(1);
        let state = self.tables.entry(table_name.to_string()).or_default();
        state.backoff_factor = (state.backoff_factor + 1).min(max_factor);
        state.unprocessed.extend(unprocessed);
        state.gated = true;

        let delay = retry_delay(state.backoff_factor, &self.config);
        let table_name = table_name.to_string();
        self.timers.push(
            async move {
                sleep(delay).await;
                table_name
            }
            .boxed(),
        );
        delay
    }

    /// A request for the table came back with nothing left unprocessed
    pub(crate) fn reset(&mut self, table_name: &str) {
        if let Some(state) = self.tables.get_mut(table_name) {
            state.backoff_factor = 0;
        }
    }

    pub(crate) fn release(&mut self, table_name: &str) {
        if let Some(state) = self.tables.get_mut(table_name) {
            state.gated = false;
        }
    }

    pub(crate) fn is_gated(&self, table_name: &str) -> bool {
        self.tables.get(table_name).is_some_and(|state| state.gated)
    }

    pub(crate) fn backoff_factor(&self, table_name: &str) -> u32 {
        self.tables
            .get(table_name)
            .map_or(0, |state| state.backoff_factor)
    }

    pub(crate) fn has_unprocessed(&self, table_name: &str) -> bool {
        self.tables
            .get(table_name)
            .is_some_and(|state| !state.unprocessed.is_empty())
    }

    /// Tables holding elements that wait for a retry
    pub(crate) fn tables(&self) -> impl Iterator<Item = &String> {
        self.tables
            .iter()
            .filter(|(_, state)| !state.unprocessed.is_empty())
            .map(|(table_name, _)| table_name)
    }

    /// Total number of elements awaiting retry
    pub(crate) fn pending(&self) -> usize {
        self.tables.values().map(|state| state.unprocessed.len()).sum()
    }

    /// Remove up to `max` elements awaiting retry, oldest first
    pub(crate) fn take_unprocessed(&mut self, table_name: &str, max: usize) -> Vec<E> {
        match self.tables.get_mut(table_name) {
            Some(state) => {
                let count = max.min(state.unprocessed.len());
                state.unprocessed.drain(..count).collect()
            }
            None => Vec::new(),
        }
    }

    pub(crate) fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    /// Resolves with the name of the next table whose backoff elapsed
    pub(crate) async fn next_release(&mut self) -> Option<String> {
        self.timers.next().await
    }
}
