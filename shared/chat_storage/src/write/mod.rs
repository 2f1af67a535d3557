//! Write-coordination layer for `DynamoDB`
//!
//! Two writers implement the same [`ItemWriter`] contract: [`DirectWriter`]
//! applies every operation immediately (fanning multi-item calls out through
//! batched writes with bounded retry), while [`TransactionalWriter`] buffers
//! operations into a pending [`UnitOfWork`] that commits as one atomic
//! `TransactWriteItems` call. Repositories receive whichever writer the
//! caller's [`WriteContext`] carries and never inspect which one they hold.

mod batch;
mod context;
mod error;
mod unit_of_work;

use std::collections::HashMap;
use std::sync::Arc;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client as DynamoDbClient;

pub use batch::{BatchRetryConfig, MAX_BATCH_WRITE_ITEMS};
pub use context::{TransactionScope, WriteContext};
pub use error::{WriteError, WriteResult};
pub use unit_of_work::{UnitOfWork, MAX_TRANSACTION_OPERATIONS};

/// A flat `DynamoDB` record
pub type Item = HashMap<String, AttributeValue>;

/// Primary key of a `DynamoDB` record
pub type Key = HashMap<String, AttributeValue>;

/// Precondition attached to a single write operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// The named attribute must be absent; enforces uniqueness on puts
    AttributeNotExists(String),
    /// The named attribute must be present; guards deletes and checks
    AttributeExists(String),
}

impl WriteCondition {
    /// Condition expression with the attribute name behind a placeholder
    fn expression(&self) -> &'static str {
        match self {
            Self::AttributeNotExists(_) => "attribute_not_exists(#cond_attr)",
            Self::AttributeExists(_) => "attribute_exists(#cond_attr)",
        }
    }

    fn attribute(&self) -> &str {
        match self {
            Self::AttributeNotExists(attribute) | Self::AttributeExists(attribute) => attribute,
        }
    }

    /// Whether an item state satisfies the condition
    fn holds(&self, item: Option<&Item>) -> bool {
        let present = item.is_some_and(|item| item.contains_key(self.attribute()));
        match self {
            Self::AttributeNotExists(_) => !present,
            Self::AttributeExists(_) => present,
        }
    }
}

/// Minimal write contract implemented identically by both writers
///
/// No method has side effects beyond the underlying store; batch calls carry
/// no cross-item atomicity guarantee of their own.
#[async_trait::async_trait]
pub trait ItemWriter: Send + Sync {
    /// Writes one record, optionally guarded by a condition
    async fn put_item(
        &self,
        table: &str,
        item: Item,
        condition: Option<WriteCondition>,
    ) -> WriteResult<()>;

    /// Writes many records
    async fn put_batch(&self, table: &str, items: Vec<Item>) -> WriteResult<()>;

    /// Deletes one record, optionally guarded by a condition
    async fn delete_item(
        &self,
        table: &str,
        key: Key,
        condition: Option<WriteCondition>,
    ) -> WriteResult<()>;

    /// Deletes many records
    async fn delete_batch(&self, table: &str, keys: Vec<Key>) -> WriteResult<()>;

    /// Asserts a condition on a record without writing it
    async fn condition_check(
        &self,
        table: &str,
        key: Key,
        condition: WriteCondition,
    ) -> WriteResult<()>;
}

/// Writer that applies every operation immediately
///
/// Multi-item calls fan out through `BatchWriteItem` in store-imposed chunks
/// with bounded retry of unprocessed items.
pub struct DirectWriter {
    dynamodb_client: Arc<DynamoDbClient>,
    retry: BatchRetryConfig,
}

impl DirectWriter {
    /// Creates a direct writer with the default batch retry policy
    #[must_use]
    pub fn new(dynamodb_client: Arc<DynamoDbClient>) -> Self {
        Self {
            dynamodb_client,
            retry: BatchRetryConfig::default(),
        }
    }

    /// Creates a direct writer with a custom batch retry policy
    #[must_use]
    pub const fn with_retry(dynamodb_client: Arc<DynamoDbClient>, retry: BatchRetryConfig) -> Self {
        Self {
            dynamodb_client,
            retry,
        }
    }
}

#[async_trait::async_trait]
impl ItemWriter for DirectWriter {
    async fn put_item(
        &self,
        table: &str,
        item: Item,
        condition: Option<WriteCondition>,
    ) -> WriteResult<()> {
        let mut request = self
            .dynamodb_client
            .put_item()
            .table_name(table)
            .set_item(Some(item));

        if let Some(condition) = &condition {
            request = request
                .condition_expression(condition.expression())
                .expression_attribute_names("#cond_attr", condition.attribute());
        }

        request.send().await.map_err(|err| {
            if matches!(
                err,
                SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
            ) {
                WriteError::ConditionFailed {
                    table: table.to_string(),
                }
            } else {
                err.into()
            }
        })?;

        Ok(())
    }

    async fn put_batch(&self, table: &str, items: Vec<Item>) -> WriteResult<()> {
        let requests = items
            .into_iter()
            .map(build_put_request)
            .collect::<WriteResult<Vec<_>>>()?;

        batch::execute(&self.dynamodb_client, table, requests, &self.retry).await
    }

    async fn delete_item(
        &self,
        table: &str,
        key: Key,
        condition: Option<WriteCondition>,
    ) -> WriteResult<()> {
        let mut request = self
            .dynamodb_client
            .delete_item()
            .table_name(table)
            .set_key(Some(key));

        if let Some(condition) = &condition {
            request = request
                .condition_expression(condition.expression())
                .expression_attribute_names("#cond_attr", condition.attribute());
        }

        request.send().await.map_err(|err| {
            if matches!(
                err,
                SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
            ) {
                WriteError::ConditionFailed {
                    table: table.to_string(),
                }
            } else {
                err.into()
            }
        })?;

        Ok(())
    }

    async fn delete_batch(&self, table: &str, keys: Vec<Key>) -> WriteResult<()> {
        let requests = keys
            .into_iter()
            .map(build_delete_request)
            .collect::<WriteResult<Vec<_>>>()?;

        batch::execute(&self.dynamodb_client, table, requests, &self.retry).await
    }

    /// Outside a transaction the check degrades to a strongly consistent
    /// read; it is not atomic with any write that follows it.
    async fn condition_check(
        &self,
        table: &str,
        key: Key,
        condition: WriteCondition,
    ) -> WriteResult<()> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .consistent_read(true)
            .send()
            .await?;

        if condition.holds(response.item()) {
            Ok(())
        } else {
            Err(WriteError::ConditionFailed {
                table: table.to_string(),
            })
        }
    }
}

/// Writer that buffers operations into a pending unit of work
///
/// No I/O happens until the owning [`TransactionScope`] commits.
#[derive(Clone)]
pub struct TransactionalWriter {
    unit_of_work: Arc<UnitOfWork>,
}

impl TransactionalWriter {
    pub(crate) const fn new(unit_of_work: Arc<UnitOfWork>) -> Self {
        Self { unit_of_work }
    }
}

#[async_trait::async_trait]
impl ItemWriter for TransactionalWriter {
    async fn put_item(
        &self,
        table: &str,
        item: Item,
        condition: Option<WriteCondition>,
    ) -> WriteResult<()> {
        self.unit_of_work.buffer_put(table, item, condition)
    }

    async fn put_batch(&self, table: &str, items: Vec<Item>) -> WriteResult<()> {
        for item in items {
            self.unit_of_work.buffer_put(table, item, None)?;
        }
        Ok(())
    }

    async fn delete_item(
        &self,
        table: &str,
        key: Key,
        condition: Option<WriteCondition>,
    ) -> WriteResult<()> {
        self.unit_of_work.buffer_delete(table, key, condition)
    }

    async fn delete_batch(&self, table: &str, keys: Vec<Key>) -> WriteResult<()> {
        for key in keys {
            self.unit_of_work.buffer_delete(table, key, None)?;
        }
        Ok(())
    }

    async fn condition_check(
        &self,
        table: &str,
        key: Key,
        condition: WriteCondition,
    ) -> WriteResult<()> {
        self.unit_of_work.buffer_condition_check(table, key, condition)
    }
}

fn build_put_request(item: Item) -> WriteResult<WriteRequest> {
    let put_request = PutRequest::builder()
        .set_item(Some(item))
        .build()
        .map_err(|e| WriteError::RequestConstruction(format!("put request: {e:?}")))?;

    Ok(WriteRequest::builder().put_request(put_request).build())
}

fn build_delete_request(key: Key) -> WriteResult<WriteRequest> {
    let delete_request = DeleteRequest::builder()
        .set_key(Some(key))
        .build()
        .map_err(|e| WriteError::RequestConstruction(format!("delete request: {e:?}")))?;

    Ok(WriteRequest::builder().delete_request(delete_request).build())
}
