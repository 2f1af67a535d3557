//! Error types for chat storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use thiserror::Error;

use crate::write::WriteError;

/// Result type alias for chat storage operations
pub type ChatStorageResult<T> = Result<T, ChatStorageError>;

/// Storage error types for chat operations
#[derive(Debug, Error)]
pub enum ChatStorageError {
    /// A chat with this ID already exists
    #[error("Chat already exists")]
    ChatExists,

    /// The chat does not exist
    #[error("Chat not found")]
    ChatNotFound,

    /// Failed to get chat from `DynamoDB`
    #[error("Failed to get chat from DynamoDB: {0:?}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to parse chat from `DynamoDB` item
    #[error("Failed to parse chat: {0}")]
    SerializationError(String),

    /// Write-layer failure
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl From<serde_dynamo::Error> for ChatStorageError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
