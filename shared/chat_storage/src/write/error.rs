//! Error types for the write-coordination layer

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{
    batch_write_item::BatchWriteItemError, delete_item::DeleteItemError, get_item::GetItemError,
    put_item::PutItemError, transact_write_items::TransactWriteItemsError,
};
use thiserror::Error;

use super::MAX_TRANSACTION_OPERATIONS;

/// Result type alias for write operations
pub type WriteResult<T> = Result<T, WriteError>;

/// Error types shared by both writers
#[derive(Debug, Error)]
pub enum WriteError {
    /// A conditional write precondition did not hold
    #[error("Conditional write failed for table {table}")]
    ConditionFailed {
        /// Table the write was addressed to
        table: String,
    },

    /// The unit of work buffered more operations than one transaction allows
    ///
    /// This is a hard ceiling; the caller must redesign the operation to not
    /// need atomicity at that scale.
    #[error("Transaction holds {operations} operations, limit is {MAX_TRANSACTION_OPERATIONS}")]
    TransactionTooLarge {
        /// Number of buffered operations at commit time
        operations: usize,
    },

    /// `DynamoDB` rejected the transactional write; nothing was applied
    #[error("Transactional write rejected by DynamoDB: {0:?}")]
    TransactionFailed(#[from] SdkError<TransactWriteItemsError>),

    /// The unit of work was already committed or aborted
    #[error("Unit of work is no longer active")]
    TransactionClosed,

    /// A unit of work was begun while another was active on the same context
    #[error("A unit of work is already active on this context")]
    NestedTransaction,

    /// Batch write retries ran out with items still unprocessed
    #[error("Batch write gave up after {attempts} attempts with {remaining} items unprocessed")]
    BatchWriteExhausted {
        /// Attempts issued before giving up
        attempts: u32,
        /// Items the store still reported as unprocessed
        remaining: usize,
    },

    /// Failed to build a `DynamoDB` write request
    #[error("Failed to build write request: {0}")]
    RequestConstruction(String),

    /// Failed to put item into `DynamoDB`
    #[error("Failed to put item into DynamoDB: {0:?}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to delete item from `DynamoDB`
    #[error("Failed to delete item from DynamoDB: {0:?}")]
    DynamoDbDeleteError(#[from] SdkError<DeleteItemError>),

    /// Failed to read an item during a direct condition check
    #[error("Failed to get item from DynamoDB: {0:?}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed batch write call
    #[error("Failed to batch write to DynamoDB: {0:?}")]
    DynamoDbBatchWriteError(#[from] SdkError<BatchWriteItemError>),
}

impl WriteError {
    /// Indices of buffered operations whose condition failed when the store
    /// cancelled a transactional write
    ///
    /// Callers that know the order they buffered operations in can map an
    /// index back to a domain error. Empty for every other error kind.
    #[must_use]
    pub fn failed_condition_indices(&self) -> Vec<usize> {
        let Self::TransactionFailed(SdkError::ServiceError(service_err)) = self else {
            return Vec::new();
        };
        let TransactWriteItemsError::TransactionCanceledException(canceled) = service_err.err()
        else {
            return Vec::new();
        };

        canceled
            .cancellation_reasons()
            .iter()
            .enumerate()
            .filter(|(_, reason)| reason.code() == Some("ConditionalCheckFailed"))
            .map(|(index, _)| index)
            .collect()
    }

    /// Whether this error is a conditional failure, either from a direct
    /// conditional write or from a cancelled transaction
    #[must_use]
    pub fn is_condition_failure(&self) -> bool {
        matches!(self, Self::ConditionFailed { .. }) || !self.failed_condition_indices().is_empty()
    }
}
