use aws_sdk_dynamodb::types::{DeleteRequest, PutRequest, WriteRequest as SdkWriteRequest};
use std::{collections::HashMap, fmt, time::Duration};

use crate::Error;
use crate::backend::{AttributeMap, Key};

/// The kind of a single write in a `BatchWriteItem` request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WriteType {
    /// Create or replace an item
    Put,
    /// Delete an item by key
    Delete,
}

impl fmt::Display for WriteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteType::Put => f.write_str("put"),
            WriteType::Delete => f.write_str("delete"),
        }
    }
}

/// A single put or delete
///
/// Unlike the SDK shape, exactly one of the two variants is always present.
/// Convert SDK requests with [`TryFrom`].
#[derive(Clone, Debug, PartialEq)]
pub enum WriteRequest {
    /// Put the full item
    Put(AttributeMap),
    /// Delete the item with this key
    Delete(Key),
}

impl WriteRequest {
    /// Whether this is a put or a delete
    pub fn write_type(&self) -> WriteType {
        match self {
            WriteRequest::Put(_) => WriteType::Put,
            WriteRequest::Delete(_) => WriteType::Delete,
        }
    }

    /// The item of a put, or the key of a delete
    pub fn attributes(&self) -> &AttributeMap {
        match self {
            WriteRequest::Put(item) => item,
            WriteRequest::Delete(key) => key,
        }
    }

    /// Consume the request, returning its item or key
    pub fn into_attributes(self) -> AttributeMap {
        match self {
            WriteRequest::Put(item) => item,
            WriteRequest::Delete(key) => key,
        }
    }

    pub(crate) fn into_sdk(self) -> Result<SdkWriteRequest, Error> {
        let request = match self {
            WriteRequest::Put(item) => SdkWriteRequest::builder()
                .set_put_request(Some(PutRequest::builder().set_item(Some(item)).build()?))
                .build(),
            WriteRequest::Delete(key) => SdkWriteRequest::builder()
                .set_delete_request(Some(DeleteRequest::builder().set_key(Some(key)).build()?))
                .build(),
        };
        Ok(request)
    }
}

impl TryFrom<SdkWriteRequest> for WriteRequest {
    type Error = Error;

    fn try_from(request: SdkWriteRequest) -> Result<Self, Self::Error> {
        match (request.put_request, request.delete_request) {
            (Some(put), None) => Ok(WriteRequest::Put(put.item)),
            (None, Some(delete)) => Ok(WriteRequest::Delete(delete.key)),
            (Some(_), Some(_)) => Err(Error::InvalidWriteRequest(
                "both a put and a delete were provided",
            )),
            (None, None) => Err(Error::InvalidWriteRequest(
                "neither a put nor a delete was provided",
            )),
        }
    }
}

/// Backoff configuration for throttled batch elements
///
/// After each response that leaves elements unprocessed, a table waits a
/// random delay in `[0, min(max_delay, initial_delay * 2^(factor - 1)))` before it
/// is sent again. The factor grows by one per throttled response, up to
/// `max_backoff_factor`, and resets once a response comes back clean.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay ceiling for the first throttled response
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Upper bound on the backoff factor
    pub max_backoff_factor: u32,
}

impl RetryConfig {
    /// The configuration used unless one is provided
    pub const DEFAULT: RetryConfig = RetryConfig {
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_secs(20),
        max_backoff_factor: 10,
    };
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Read options that apply to the keys of one table in a batch get
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableOptions {
    /// Strongly consistent reads for this table, overriding the batch default
    pub consistent_read: Option<bool>,
    /// Attributes to return
    pub projection_expression: Option<String>,
    /// Substitution tokens for attribute names used in the projection
    pub expression_attribute_names: Option<HashMap<String, String>>,
}

/// Options for a batch get
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchGetOptions {
    /// Default read consistency for every table
    pub consistent_read: Option<bool>,
    /// Per-table overrides, keyed by table name
    pub per_table_options: HashMap<String, TableOptions>,
}

impl BatchGetOptions {
    /// Use strongly consistent reads unless a table says otherwise
    pub fn consistent(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }

    /// Set the options for one table
    pub fn table(mut self, table_name: impl Into<String>, options: TableOptions) -> Self {
        let _ = self.per_table_options.insert(table_name.into(), options);
        self
    }

    /// Resolve the options sent with the keys of `table_name`
    pub(crate) fn for_table(&self, table_name: &str) -> TableOptions {
        let mut options = self
            .per_table_options
            .get(table_name)
            .cloned()
            .unwrap_or_default();
        if options.consistent_read.is_none() {
            options.consistent_read = self.consistent_read;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::AttributeValue;

    fn key(id: &str) -> Key {
        let mut key = Key::new();
        let _ = key.insert("id".to_string(), AttributeValue::S(id.to_string()));
        key
    }

    #[test]
    fn test_write_request_from_sdk_put() {
        let sdk = WriteRequest::Put(key("a")).into_sdk().expect("valid put");
        assert!(sdk.put_request.is_some());
        assert!(sdk.delete_request.is_none());

        let request = WriteRequest::try_from(sdk).expect("round trip");
        assert_eq!(request.write_type(), WriteType::Put);
        assert_eq!(request.attributes(), &key("a"));
    }

    #[test]
    fn test_write_request_with_neither_variant_is_rejected() {
        let err = WriteRequest::try_from(SdkWriteRequest::builder().build())
            .expect_err("empty request");
        assert!(matches!(err, Error::InvalidWriteRequest(_)));
    }

    #[test]
    fn test_write_request_with_both_variants_is_rejected() {
        let sdk = SdkWriteRequest::builder()
            .put_request(PutRequest::builder().set_item(Some(key("a"))).build().unwrap())
            .delete_request(DeleteRequest::builder().set_key(Some(key("a"))).build().unwrap())
            .build();
        let err = WriteRequest::try_from(sdk).expect_err("ambiguous request");
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_table_options_fall_back_to_batch_consistency() {
        let options = BatchGetOptions::default().consistent(true).table(
            "snap",
            TableOptions {
                consistent_read: Some(false),
                ..Default::default()
            },
        );

        assert_eq!(options.for_table("snap").consistent_read, Some(false));
        assert_eq!(options.for_table("crackle").consistent_read, Some(true));
    }

    #[test]
    fn test_write_type_display() {
        assert_eq!(WriteType::Put.to_string(), "put");
        assert_eq!(WriteType::Delete.to_string(), "delete");
    }
}
