//! Error types for user storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{get_item::GetItemError, update_item::UpdateItemError};
use thiserror::Error;

use crate::write::WriteError;

/// Result type alias for user storage operations
pub type UserStorageResult<T> = Result<T, UserStorageError>;

/// Storage error types for user operations
#[derive(Debug, Error)]
pub enum UserStorageError {
    /// A user with this ID already exists
    #[error("User already exists")]
    UserExists,

    /// No user record exists to tombstone
    #[error("User not found")]
    UserNotFound,

    /// Failed to get user from `DynamoDB`
    #[error("Failed to get user from DynamoDB: {0:?}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to update user in `DynamoDB`
    #[error("Failed to update user in DynamoDB: {0:?}")]
    DynamoDbUpdateError(#[from] SdkError<UpdateItemError>),

    /// Failed to parse user from `DynamoDB` item
    #[error("Failed to parse user: {0}")]
    SerializationError(String),

    /// Write-layer failure
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl From<serde_dynamo::Error> for UserStorageError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
