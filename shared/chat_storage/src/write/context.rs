//! Explicit write-context passing
//!
//! Repositories receive a [`WriteContext`] on every write-capable call and
//! route writes through whichever writer it carries. A context is plain
//! data scoped to one logical call chain; concurrent operations never share
//! a pending transaction because they never share a scope.

use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;

use super::{
    DirectWriter, ItemWriter, TransactionalWriter, UnitOfWork, WriteError, WriteResult,
};

/// Carrier for the currently active writer
pub struct WriteContext {
    dynamodb_client: Arc<DynamoDbClient>,
    direct: DirectWriter,
    transactional: Option<TransactionalWriter>,
}

impl WriteContext {
    /// Creates a direct-mode context; writes apply immediately
    #[must_use]
    pub fn new(dynamodb_client: Arc<DynamoDbClient>) -> Self {
        Self {
            direct: DirectWriter::new(dynamodb_client.clone()),
            transactional: None,
            dynamodb_client,
        }
    }

    /// The writer every write issued through this context uses
    #[must_use]
    pub fn writer(&self) -> &dyn ItemWriter {
        match &self.transactional {
            Some(writer) => writer,
            None => &self.direct,
        }
    }

    /// Whether a unit of work is active on this context
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.transactional.is_some()
    }

    /// Opens a unit of work scoped to the returned guard
    ///
    /// Writes issued through the scope's context buffer into one atomic
    /// transaction until `commit`. Nesting is not supported.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::NestedTransaction`] if this context already
    /// belongs to an open unit of work.
    pub fn begin_transaction(&self) -> WriteResult<TransactionScope> {
        if self.in_transaction() {
            return Err(WriteError::NestedTransaction);
        }

        let unit_of_work = Arc::new(UnitOfWork::new(self.dynamodb_client.clone()));
        let context = Self {
            dynamodb_client: self.dynamodb_client.clone(),
            direct: DirectWriter::new(self.dynamodb_client.clone()),
            transactional: Some(TransactionalWriter::new(unit_of_work.clone())),
        };

        Ok(TransactionScope {
            context,
            unit_of_work,
        })
    }
}

/// Guard owning an open unit of work
///
/// Dropping the scope without committing discards every buffered operation;
/// nothing reaches the store outside `commit`.
pub struct TransactionScope {
    context: WriteContext,
    unit_of_work: Arc<UnitOfWork>,
}

impl std::fmt::Debug for TransactionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionScope")
            .field("buffered_operations", &self.buffered_operations())
            .finish()
    }
}

impl TransactionScope {
    /// Context to hand to repository calls inside the scope
    #[must_use]
    pub const fn context(&self) -> &WriteContext {
        &self.context
    }

    /// Number of operations buffered so far
    #[must_use]
    pub fn buffered_operations(&self) -> usize {
        self.unit_of_work.buffered_operations()
    }

    /// Submits the buffered operations as one atomic transaction
    ///
    /// # Errors
    ///
    /// Propagates [`WriteError`] from the unit of work commit.
    pub async fn commit(self) -> WriteResult<()> {
        self.unit_of_work.commit().await
    }

    /// Explicitly discards the buffered operations
    pub fn abort(self) {
        self.unit_of_work.abort();
    }
}
