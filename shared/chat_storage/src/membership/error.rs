//! Error types for membership storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{get_item::GetItemError, query::QueryError};
use thiserror::Error;

use crate::write::WriteError;

/// Result type alias for membership storage operations
pub type MembershipStorageResult<T> = Result<T, MembershipStorageError>;

/// Storage error types for membership operations
#[derive(Debug, Error)]
pub enum MembershipStorageError {
    /// Failed to get membership from `DynamoDB`
    #[error("Failed to get membership from DynamoDB: {0:?}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to query memberships from `DynamoDB`
    #[error("Failed to query memberships from DynamoDB: {0:?}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// Failed to parse membership from `DynamoDB` item
    #[error("Failed to parse membership: {0}")]
    SerializationError(String),

    /// Write-layer failure
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl From<serde_dynamo::Error> for MembershipStorageError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
