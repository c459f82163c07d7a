//! Test helpers and fixtures for the engine and mapper tests
//!
//! This module provides common fixtures, an in-memory backend, and helper
//! functions used across all integration tests.
#![allow(dead_code)]

pub mod fixtures;
pub mod mock;

pub use dynamo_mapper::DynamoTable;
pub use serde::{Deserialize, Serialize};

// Re-export common fixtures
pub use fixtures::{Record, TestCounters, TestObject};
pub use mock::{MockBackend, Reply, Request};

use aws_sdk_dynamodb::types::AttributeValue;
use dynamo_mapper::backend::ResultPage;
use dynamo_mapper::{AttributeMap, Key, RetryConfig};
use std::time::Duration;

/// Item with a string `id` and a numeric `n` attribute
pub fn item(id: &str, n: usize) -> AttributeMap {
    let mut item = AttributeMap::new();
    let _ = item.insert("id".to_string(), AttributeValue::S(id.to_string()));
    let _ = item.insert("n".to_string(), AttributeValue::N(n.to_string()));
    item
}

/// Key `{id: <id>}`
pub fn key(id: &str) -> Key {
    let mut key = Key::new();
    let _ = key.insert("id".to_string(), AttributeValue::S(id.to_string()));
    key
}

/// `id` attribute of an item or key
pub fn id_of(attributes: &AttributeMap) -> String {
    match attributes.get("id") {
        Some(AttributeValue::S(id)) => id.clone(),
        other => panic!("unexpected id attribute: {other:?}"),
    }
}

/// Short backoff so paused-clock tests stay quick to reason about
pub fn fast_retries() -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        max_backoff_factor: 4,
    }
}

/// One page of `items`, as a table holding them in order would return it
///
/// Honors the exclusive start key (matched on `id`) and the page size.
pub fn paged(items: &[AttributeMap], start_key: Option<&Key>, limit: Option<i32>) -> ResultPage {
    let start = match start_key {
        Some(start_key) => {
            let id = id_of(start_key);
            items
                .iter()
                .position(|item| id_of(item) == id)
                .map_or(items.len(), |position| position + 1)
        }
        None => 0,
    };
    let limit = limit.map_or(items.len(), |limit| limit as usize);
    let end = (start + limit).min(items.len());

    let page: Vec<AttributeMap> = items[start..end].to_vec();
    let last_evaluated_key =
        (end < items.len() && end > start).then(|| key(&id_of(&items[end - 1])));
    ResultPage {
        count: page.len() as i32,
        scanned_count: page.len() as i32,
        items: page,
        last_evaluated_key,
        consumed_capacity: None,
    }
}

/// Items `0..n`, with string ids
pub fn numbered(n: usize) -> Vec<AttributeMap> {
    (0..n).map(|i| item(&i.to_string(), i)).collect()
}

/// Ids of a page's items
pub fn ids(page: &ResultPage) -> Vec<String> {
    page.items.iter().map(id_of).collect()
}
