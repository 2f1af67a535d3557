//! Error types for claimed email storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use thiserror::Error;

use crate::write::WriteError;

/// Result type alias for claimed email storage operations
pub type ClaimedEmailStorageResult<T> = Result<T, ClaimedEmailStorageError>;

/// Storage error types for claimed email operations
#[derive(Debug, Error)]
pub enum ClaimedEmailStorageError {
    /// The email address is already claimed
    #[error("Email is already claimed")]
    EmailTaken,

    /// Failed to get claimed email from `DynamoDB`
    #[error("Failed to get claimed email from DynamoDB: {0:?}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to parse claimed email from `DynamoDB` item
    #[error("Failed to parse claimed email: {0}")]
    SerializationError(String),

    /// Write-layer failure
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl From<serde_dynamo::Error> for ClaimedEmailStorageError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
