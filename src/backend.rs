//! The four DynamoDB operations the batch and pagination engines drive.
//!
//! [`DynamoDbBackend`] is implemented for [`aws_sdk_dynamodb::Client`]; tests and
//! alternative transports can implement it for their own types.

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemOutput;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemOutput;
use aws_sdk_dynamodb::operation::query::QueryOutput;
use aws_sdk_dynamodb::operation::scan::ScanOutput;
use aws_sdk_dynamodb::types::{
    AttributeValue, ConsumedCapacity, KeysAndAttributes, ReturnConsumedCapacity,
    WriteRequest as SdkWriteRequest,
};
use std::{collections::HashMap, future::Future};

use crate::Error;

/// A DynamoDB item: attribute name to attribute value
pub type AttributeMap = HashMap<String, AttributeValue>;

/// A primary key (or a `LastEvaluatedKey` / `ExclusiveStartKey`) as an attribute map
pub type Key = AttributeMap;

/// Input of a single `Scan` call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanRequest {
    /// Table to scan
    pub table_name: String,
    /// Secondary index to scan instead of the base table
    pub index_name: Option<String>,
    /// Maximum number of items to evaluate in this call
    pub limit: Option<i32>,
    /// Key to resume from
    pub exclusive_start_key: Option<Key>,
    /// Segment number for a parallel scan
    pub segment: Option<i32>,
    /// Total number of segments for a parallel scan
    pub total_segments: Option<i32>,
    /// Strongly consistent read
    pub consistent_read: Option<bool>,
    /// Filter applied after items are read
    pub filter_expression: Option<String>,
    /// Attributes to return
    pub projection_expression: Option<String>,
    /// Substitution tokens for attribute names
    pub expression_attribute_names: Option<HashMap<String, String>>,
    /// Substitution tokens for attribute values
    pub expression_attribute_values: Option<AttributeMap>,
    /// Level of consumed capacity reporting
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

/// Input of a single `Query` call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryRequest {
    /// Table to query
    pub table_name: String,
    /// Secondary index to query instead of the base table
    pub index_name: Option<String>,
    /// Key condition selecting the partition (and optionally a sort key range)
    pub key_condition_expression: String,
    /// Maximum number of items to evaluate in this call
    pub limit: Option<i32>,
    /// Key to resume from
    pub exclusive_start_key: Option<Key>,
    /// Strongly consistent read
    pub consistent_read: Option<bool>,
    /// Traverse the index in ascending (`true`) or descending order
    pub scan_index_forward: Option<bool>,
    /// Filter applied after items are read
    pub filter_expression: Option<String>,
    /// Attributes to return
    pub projection_expression: Option<String>,
    /// Substitution tokens for attribute names
    pub expression_attribute_names: Option<HashMap<String, String>>,
    /// Substitution tokens for attribute values
    pub expression_attribute_values: Option<AttributeMap>,
    /// Level of consumed capacity reporting
    pub return_consumed_capacity: Option<ReturnConsumedCapacity>,
}

/// One page of a `Scan` or `Query` response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultPage {
    /// Items returned in this page
    pub items: Vec<AttributeMap>,
    /// Key to continue from; `None` once the result set is exhausted
    pub last_evaluated_key: Option<Key>,
    /// Number of items returned after filtering
    pub count: i32,
    /// Number of items evaluated before filtering
    pub scanned_count: i32,
    /// Capacity consumed by this call, when requested
    pub consumed_capacity: Option<ConsumedCapacity>,
}

impl From<ScanOutput> for ResultPage {
    fn from(output: ScanOutput) -> Self {
        Self {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key,
            count: output.count,
            scanned_count: output.scanned_count,
            consumed_capacity: output.consumed_capacity,
        }
    }
}

impl From<QueryOutput> for ResultPage {
    fn from(output: QueryOutput) -> Self {
        Self {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key,
            count: output.count,
            scanned_count: output.scanned_count,
            consumed_capacity: output.consumed_capacity,
        }
    }
}

/// Transport for the batch and pagination engines
///
/// Every method performs exactly one network call. Retrying unprocessed
/// elements and following `LastEvaluatedKey` is left to the callers.
pub trait DynamoDbBackend: Send + Sync + 'static {
    /// Issue one `BatchGetItem` call
    fn batch_get_item(
        &self,
        request_items: HashMap<String, KeysAndAttributes>,
    ) -> impl Future<Output = Result<BatchGetItemOutput, Error>> + Send;

    /// Issue one `BatchWriteItem` call
    fn batch_write_item(
        &self,
        request_items: HashMap<String, Vec<SdkWriteRequest>>,
    ) -> impl Future<Output = Result<BatchWriteItemOutput, Error>> + Send;

    /// Issue one `Scan` call
    fn scan(&self, request: ScanRequest) -> impl Future<Output = Result<ResultPage, Error>> + Send;

    /// Issue one `Query` call
    fn query(
        &self,
        request: QueryRequest,
    ) -> impl Future<Output = Result<ResultPage, Error>> + Send;
}

impl DynamoDbBackend for Client {
    async fn batch_get_item(
        &self,
        request_items: HashMap<String, KeysAndAttributes>,
    ) -> Result<BatchGetItemOutput, Error> {
        Ok(Client::batch_get_item(self)
            .set_request_items(Some(request_items))
            .send()
            .await?)
    }

    async fn batch_write_item(
        &self,
        request_items: HashMap<String, Vec<SdkWriteRequest>>,
    ) -> Result<BatchWriteItemOutput, Error> {
        Ok(Client::batch_write_item(self)
            .set_request_items(Some(request_items))
            .send()
            .await?)
    }

    async fn scan(&self, request: ScanRequest) -> Result<ResultPage, Error> {
        let output = Client::scan(self)
            .table_name(request.table_name)
            .set_index_name(request.index_name)
            .set_limit(request.limit)
            .set_exclusive_start_key(request.exclusive_start_key)
            .set_segment(request.segment)
            .set_total_segments(request.total_segments)
            .set_consistent_read(request.consistent_read)
            .set_filter_expression(request.filter_expression)
            .set_projection_expression(request.projection_expression)
            .set_expression_attribute_names(request.expression_attribute_names)
            .set_expression_attribute_values(request.expression_attribute_values)
            .set_return_consumed_capacity(request.return_consumed_capacity)
            .send()
            .await?;

        Ok(output.into())
    }

    async fn query(&self, request: QueryRequest) -> Result<ResultPage, Error> {
        let output = Client::query(self)
            .table_name(request.table_name)
            .set_index_name(request.index_name)
            .key_condition_expression(request.key_condition_expression)
            .set_limit(request.limit)
            .set_exclusive_start_key(request.exclusive_start_key)
            .set_consistent_read(request.consistent_read)
            .set_scan_index_forward(request.scan_index_forward)
            .set_filter_expression(request.filter_expression)
            .set_projection_expression(request.projection_expression)
            .set_expression_attribute_names(request.expression_attribute_names)
            .set_expression_attribute_values(request.expression_attribute_values)
            .set_return_consumed_capacity(request.return_consumed_capacity)
            .send()
            .await?;

        Ok(output.into())
    }
}
