//! # DynamoDB Object Mapper
//!
//! Batch, pagination and typed mapping layers over `aws-sdk-dynamodb`:
//! - Batch get and batch write over streams of any length, spanning any number of tables
//! - Per-table backoff and retry of unprocessed keys and writes
//! - Scan and query paginators, including resumable parallel scans
//! - Typed items, pages and keys through [`DynamoTable`]
//!
//! ## Features
//!
//! - **Type-safe**: Leverage Rust's type system with `serde` for automatic serialization
//! - **Async-first**: Built on `tokio` and `aws-sdk-dynamodb`
//! - **Streaming**: Inputs and results are `futures` streams, never buffered whole
//! - **Testable**: Every request goes through the [`DynamoDbBackend`] trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynamo_mapper::{DataMapper, DynamoTable, Error, QueryOptions, SortKeyCondition};
//! use futures_util::{StreamExt, stream};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Order {
//!     user_id: String,
//!     order_id: u64,
//!     total: f64,
//! }
//!
//! impl DynamoTable for Order {
//!     type PK = String;
//!     type SK = u64;
//!
//!     const TABLE: &'static str = "orders";
//!     const PARTITION_KEY: &'static str = "user_id";
//!     const SORT_KEY: Option<&'static str> = Some("order_id");
//!
//!     fn partition_key(&self) -> Self::PK {
//!         self.user_id.clone()
//!     }
//!
//!     fn sort_key(&self) -> Option<Self::SK> {
//!         Some(self.order_id)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     // Initialize the global DynamoDB client
//!     let config = aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
//!     dynamo_mapper::init(&config).await;
//!     let mapper = DataMapper::from_global().await;
//!
//!     // Write a batch of any size
//!     let orders = (1..=60).map(|order_id| Order {
//!         user_id: "123".to_string(),
//!         order_id,
//!         total: 9.5,
//!     });
//!     let written = mapper.batch_put(stream::iter(orders));
//!     futures_util::pin_mut!(written);
//!     while let Some(order) = written.next().await {
//!         let _ = order?;
//!     }
//!
//!     // Query a range of the partition
//!     let mut orders = mapper.query::<Order>(
//!         &"123".to_string(),
//!         Some(SortKeyCondition::Between(10, 20)),
//!         QueryOptions::default(),
//!     )?;
//!     while let Some(order) = orders.next_item().await {
//!         println!("{:?}", order?);
//!     }
//!
//!     Ok(())
//! }
//! ```
#![deny(
    warnings,
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]

mod error;
pub use error::Error;

/// Request and response shapes, and the client seam every operation goes through
pub mod backend;

/// Batch get and batch write engines
pub mod batch;

/// Scan and query paginators
pub mod paginate;

/// Typed tables and the data mapper
pub mod table;

// Re-export main types for convenience
pub use backend::{AttributeMap, DynamoDbBackend, Key};
pub use batch::{BatchGetOptions, RetryConfig, TableOptions, WriteType};
pub use paginate::{Paginator, ScanState};
pub use table::{
    BatchItem, CompositeKey, DataMapper, DynamoTable, ParallelScanOptions, QueryOptions,
    ReadConsistency, ScanOptions, SortKeyCondition, TableIterator, TablePaginator, Unmarshaller,
    unmarshall_item,
};

// Re-export aws-config types for configuration
pub use aws_config::{
    BehaviorVersion, Region, SdkConfig, defaults,
    meta::region::{ProvideRegion, RegionProviderChain},
    retry::{RetryConfig as SdkRetryConfig, RetryMode},
    timeout::TimeoutConfig,
};

// Re-export aws-types for advanced configuration
pub use aws_types::sdk_config::Builder as SdkConfigBuilder;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use tokio::sync::OnceCell;

/// Global DynamoDB client instance
static GLOBAL_CLIENT: OnceCell<DynamoDbClient> = OnceCell::const_new();

/// Default SDK configuration of the global client
async fn aws_config_defaults() -> SdkConfig {
    use aws_types::sdk_config::{RetryConfig, TimeoutConfig};
    use std::time::Duration;

    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(3))
        .read_timeout(Duration::from_secs(20))
        .operation_timeout(Duration::from_secs(60))
        .build();

    let mut loader = defaults(BehaviorVersion::latest())
        .retry_config(
            RetryConfig::adaptive()
                .with_max_attempts(3)
                .with_initial_backoff(Duration::from_secs(1)),
        )
        .timeout_config(timeout_config);

    if std::env::var("AWS_PROFILE").unwrap_or_default() == "localstack" {
        loader = loader.endpoint_url("http://127.0.0.1:4566");
    }

    loader.load().await
}

/// Initialize the global DynamoDB client with a custom AWS config
///
/// Has no effect once the global client exists.
///
/// # Example
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() {
///     let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
///         .region(aws_config::Region::new("us-west-2"))
///         .load()
///         .await;
///     dynamo_mapper::init(&config).await;
/// }
/// ```
pub async fn init(config: &SdkConfig) {
    let _ = GLOBAL_CLIENT
        .get_or_init(|| async { DynamoDbClient::new(config) })
        .await;
}

/// Initialize the global DynamoDB client with a custom client instance
///
/// # Example
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
///
/// #[tokio::main]
/// async fn main() {
///     let config = aws_config::load_from_env().await;
///     dynamo_mapper::init_with_client(Client::new(&config)).await;
/// }
/// ```
pub async fn init_with_client(client: DynamoDbClient) {
    let _ = GLOBAL_CLIENT.get_or_init(|| async { client }).await;
}

/// Get a reference to the global DynamoDB client
///
/// When neither [`init`] nor [`init_with_client`] ran first, the client is
/// created with adaptive retry (3 attempts, 1 second initial backoff), connect,
/// read and operation timeouts of 3, 20 and 60 seconds, and LocalStack at
/// `http://127.0.0.1:4566` when `AWS_PROFILE=localstack`.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example() {
/// let config = dynamo_mapper::defaults(dynamo_mapper::BehaviorVersion::latest())
///     .region(dynamo_mapper::Region::new("us-west-2"))
///     .load()
///     .await;
/// dynamo_mapper::init(&config).await;
///
/// let client = dynamo_mapper::dynamodb_client().await;
/// # }
/// ```
pub async fn dynamodb_client() -> &'static DynamoDbClient {
    GLOBAL_CLIENT
        .get_or_init(|| async {
            let config = aws_config_defaults().await;
            DynamoDbClient::new(&config)
        })
        .await
}
