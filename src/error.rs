use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use serde_dynamo::Error as SerdeDynamoError;
use std::error::Error as StdError;
use std::fmt;

type DynamoQueryError = SdkError<QueryError, Response>;
type DynamoScanError = SdkError<ScanError, Response>;
type DynamoBatchWriteItemError = SdkError<BatchWriteItemError, Response>;
type DynamoBatchGetItemError = SdkError<BatchGetItemError, Response>;

/// Batch, pagination and mapping error
#[derive(Debug)]
pub enum Error {
    /// Serde DynamoDB serialization/deserialization error
    SerdeDynamo(SerdeDynamoError),
    /// DynamoDB request builder error
    BuildError(BuildError),
    /// DynamoDB Query operation error
    DynamoQueryError(DynamoQueryError),
    /// DynamoDB Scan operation error
    DynamoScanError(DynamoScanError),
    /// DynamoDB BatchWriteItem operation error
    DynamoBatchWriteItemError(DynamoBatchWriteItemError),
    /// DynamoDB BatchGetItem operation error
    DynamoBatchGetItemError(DynamoBatchGetItemError),
    /// A write request carried neither (or both) of a put and a delete
    InvalidWriteRequest(&'static str),
    /// A query could not be built from the given conditions
    InvalidQuery(&'static str),
    /// Parallel scan state does not have one entry per segment
    InvalidScanState {
        /// Number of segments the scan was configured with
        expected: usize,
        /// Number of entries in the provided state
        actual: usize,
    },
    /// The iterator or paginator was closed and may not be resumed
    IterationInterrupted,
    /// Consumed capacity reports for two different tables cannot be merged
    CapacityTableMismatch {
        /// Table named by the accumulated report
        left: String,
        /// Table named by the incoming report
        right: String,
    },
    /// A batch response contained an item that no submitted element accounts for
    UnmatchedItem {
        /// Table the item was returned for
        table: String,
        /// Key identifier of the returned item
        identifier: String,
    },
}

impl Error {
    /// Check if the error is a serialization/deserialization error
    ///
    /// Returns `true` for DynamoDB serialization errors.
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::SerdeDynamo(_))
    }

    /// Check if the error came from building or sending a DynamoDB request
    pub fn is_dynamodb_error(&self) -> bool {
        matches!(
            self,
            Error::BuildError(_)
                | Error::DynamoQueryError(_)
                | Error::DynamoScanError(_)
                | Error::DynamoBatchWriteItemError(_)
                | Error::DynamoBatchGetItemError(_)
        )
    }

    /// Check if the error was raised locally because the API was misused
    ///
    /// These are never retried and never reach the network.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidWriteRequest(_)
                | Error::InvalidQuery(_)
                | Error::InvalidScanState { .. }
                | Error::IterationInterrupted
                | Error::CapacityTableMismatch { .. }
        )
    }
}

macro_rules! impl_from_error {
    ($name:ident, $variant:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$variant(e)
            }
        }
    };
    ($name:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$name(e)
            }
        }
    };
}

impl_from_error!(SerdeDynamoError, SerdeDynamo);
impl_from_error!(BuildError);
impl_from_error!(DynamoQueryError);
impl_from_error!(DynamoScanError);
impl_from_error!(DynamoBatchWriteItemError);
impl_from_error!(DynamoBatchGetItemError);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerdeDynamo(e) => write!(f, "DynamoDB serialization error: {}", e),
            Error::BuildError(e) => write!(f, "DynamoDB request builder error: {}", e),
            Error::DynamoQueryError(e) => {
                write!(f, "DynamoDB Query operation failed: {}", e)
            }
            Error::DynamoScanError(e) => {
                write!(f, "DynamoDB Scan operation failed: {}", e)
            }
            Error::DynamoBatchWriteItemError(e) => {
                write!(f, "DynamoDB BatchWriteItem operation failed: {}", e)
            }
            Error::DynamoBatchGetItemError(e) => {
                write!(f, "DynamoDB BatchGetItem operation failed: {}", e)
            }
            Error::InvalidWriteRequest(reason) => {
                write!(f, "Invalid write request provided: {}", reason)
            }
            Error::InvalidQuery(reason) => write!(f, "Invalid query: {}", reason),
            Error::InvalidScanState { expected, actual } => write!(
                f,
                "Parallel scan state must have a length equal to the number of scan segments \
                 (expected {}, got {})",
                expected, actual
            ),
            Error::IterationInterrupted => write!(
                f,
                "Iteration has been manually interrupted and may not be resumed"
            ),
            Error::CapacityTableMismatch { left, right } => write!(
                f,
                "Consumed capacity reports may only be merged if they describe the same table \
                 ({} != {})",
                left, right
            ),
            Error::UnmatchedItem { table, identifier } => write!(
                f,
                "Batch response for table {} contained unexpected item {}",
                table, identifier
            ),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::SerdeDynamo(e) => Some(e),
            Error::BuildError(e) => Some(e),
            Error::DynamoQueryError(e) => Some(e),
            Error::DynamoScanError(e) => Some(e),
            Error::DynamoBatchWriteItemError(e) => Some(e),
            Error::DynamoBatchGetItemError(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_serialization_error() {
        // Test with a build error - should not be serialization error
        let err = Error::BuildError(BuildError::other("test"));
        assert!(!err.is_serialization_error());
    }

    #[test]
    fn test_is_dynamodb_error() {
        let err = Error::BuildError(BuildError::other("test"));
        assert!(err.is_dynamodb_error());
        assert!(!err.is_usage_error());
    }

    #[test]
    fn test_usage_errors_are_not_dynamodb_errors() {
        let errors = [
            Error::InvalidWriteRequest("neither put nor delete"),
            Error::InvalidScanState {
                expected: 3,
                actual: 2,
            },
            Error::IterationInterrupted,
            Error::CapacityTableMismatch {
                left: "a".to_string(),
                right: "b".to_string(),
            },
        ];
        for err in errors {
            assert!(err.is_usage_error(), "{err}");
            assert!(!err.is_dynamodb_error(), "{err}");
        }
    }

    #[test]
    fn test_error_conversion() {
        let build_err = BuildError::other("test");
        let err: Error = build_err.into();
        assert!(matches!(err, Error::BuildError(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidScanState {
            expected: 3,
            actual: 1,
        };
        assert!(err.to_string().starts_with(
            "Parallel scan state must have a length equal to the number of scan segments"
        ));
        assert_eq!(
            Error::IterationInterrupted.to_string(),
            "Iteration has been manually interrupted and may not be resumed"
        );
    }
}
