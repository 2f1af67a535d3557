//! Buffered atomic writes on top of `TransactWriteItems`

use std::sync::{Arc, Mutex};

use aws_sdk_dynamodb::types::{ConditionCheck, Delete, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client as DynamoDbClient;

use super::{Item, Key, WriteCondition, WriteError, WriteResult};

/// Hard ceiling `DynamoDB` imposes on operations per transaction
pub const MAX_TRANSACTION_OPERATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    Active,
    Committed,
    Aborted,
}

struct Buffer {
    state: TransactionState,
    operations: Vec<TransactWriteItem>,
}

/// A buffer of pending write operations submitted as one atomic transaction
///
/// Operations accumulate without touching the store. `commit` submits the
/// whole buffer in a single `TransactWriteItems` call; an uncommitted unit
/// of work never applies anything, partially or otherwise.
pub struct UnitOfWork {
    dynamodb_client: Arc<DynamoDbClient>,
    buffer: Mutex<Buffer>,
}

impl UnitOfWork {
    /// Creates an empty, active unit of work
    #[must_use]
    pub fn new(dynamodb_client: Arc<DynamoDbClient>) -> Self {
        Self {
            dynamodb_client,
            buffer: Mutex::new(Buffer {
                state: TransactionState::Active,
                operations: Vec::new(),
            }),
        }
    }

    /// Number of operations currently buffered
    #[must_use]
    pub fn buffered_operations(&self) -> usize {
        self.lock().operations.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buffer> {
        self.buffer.lock().expect("unit of work mutex poisoned")
    }

    fn push(&self, operation: TransactWriteItem) -> WriteResult<()> {
        let mut buffer = self.lock();
        if buffer.state != TransactionState::Active {
            return Err(WriteError::TransactionClosed);
        }
        buffer.operations.push(operation);
        Ok(())
    }

    pub(crate) fn buffer_put(
        &self,
        table: &str,
        item: Item,
        condition: Option<WriteCondition>,
    ) -> WriteResult<()> {
        let mut put = Put::builder().table_name(table).set_item(Some(item));
        if let Some(condition) = &condition {
            put = put
                .condition_expression(condition.expression())
                .expression_attribute_names("#cond_attr", condition.attribute());
        }
        let put = put
            .build()
            .map_err(|e| WriteError::RequestConstruction(format!("transactional put: {e:?}")))?;

        self.push(TransactWriteItem::builder().put(put).build())
    }

    pub(crate) fn buffer_delete(
        &self,
        table: &str,
        key: Key,
        condition: Option<WriteCondition>,
    ) -> WriteResult<()> {
        let mut delete = Delete::builder().table_name(table).set_key(Some(key));
        if let Some(condition) = &condition {
            delete = delete
                .condition_expression(condition.expression())
                .expression_attribute_names("#cond_attr", condition.attribute());
        }
        let delete = delete
            .build()
            .map_err(|e| WriteError::RequestConstruction(format!("transactional delete: {e:?}")))?;

        self.push(TransactWriteItem::builder().delete(delete).build())
    }

    pub(crate) fn buffer_condition_check(
        &self,
        table: &str,
        key: Key,
        condition: WriteCondition,
    ) -> WriteResult<()> {
        let check = ConditionCheck::builder()
            .table_name(table)
            .set_key(Some(key))
            .condition_expression(condition.expression())
            .expression_attribute_names("#cond_attr", condition.attribute())
            .build()
            .map_err(|e| WriteError::RequestConstruction(format!("condition check: {e:?}")))?;

        self.push(TransactWriteItem::builder().condition_check(check).build())
    }

    /// Submits the buffered operations as one atomic transaction
    ///
    /// An empty buffer commits trivially without touching the store. A
    /// buffer over [`MAX_TRANSACTION_OPERATIONS`] fails before any I/O.
    /// On store rejection nothing is applied, the buffer is discarded, and
    /// the unit of work closes.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::TransactionClosed`] if the unit of work was
    /// already committed or aborted, [`WriteError::TransactionTooLarge`] if
    /// the buffer exceeds the transaction ceiling, or
    /// [`WriteError::TransactionFailed`] if `DynamoDB` rejects the write.
    pub async fn commit(&self) -> WriteResult<()> {
        let operations = {
            let mut buffer = self.lock();
            if buffer.state != TransactionState::Active {
                return Err(WriteError::TransactionClosed);
            }
            if buffer.operations.is_empty() {
                buffer.state = TransactionState::Committed;
                return Ok(());
            }
            if buffer.operations.len() > MAX_TRANSACTION_OPERATIONS {
                return Err(WriteError::TransactionTooLarge {
                    operations: buffer.operations.len(),
                });
            }
            buffer.state = TransactionState::Committed;
            std::mem::take(&mut buffer.operations)
        };

        let submitted = operations.len();
        let result = self
            .dynamodb_client
            .transact_write_items()
            .set_transact_items(Some(operations))
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::debug!(operations = submitted, "transactional write committed");
                Ok(())
            }
            Err(err) => {
                self.lock().state = TransactionState::Aborted;
                tracing::error!(operations = submitted, "transactional write rejected: {err:?}");
                Err(WriteError::TransactionFailed(err))
            }
        }
    }

    /// Discards all buffered operations and closes the unit of work
    pub fn abort(&self) {
        let mut buffer = self.lock();
        buffer.operations.clear();
        buffer.state = TransactionState::Aborted;
    }
}
