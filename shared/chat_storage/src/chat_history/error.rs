//! Error types for chat history storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::query::QueryError;
use thiserror::Error;

use crate::write::WriteError;

/// Result type alias for chat history storage operations
pub type ChatHistoryStorageResult<T> = Result<T, ChatHistoryStorageError>;

/// Storage error types for chat history operations
#[derive(Debug, Error)]
pub enum ChatHistoryStorageError {
    /// A message with the same ULID already exists in the chat
    #[error("Message already exists")]
    DuplicateMessage,

    /// Failed to query chat history from `DynamoDB`
    #[error("Failed to query chat history from DynamoDB: {0:?}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// Failed to parse chat message from `DynamoDB` item
    #[error("Failed to parse chat message: {0}")]
    SerializationError(String),

    /// Write-layer failure
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl From<serde_dynamo::Error> for ChatHistoryStorageError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
