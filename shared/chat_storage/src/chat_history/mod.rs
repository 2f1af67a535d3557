//! Chat history storage integration using Dynamo DB
//!
//! Messages are immutable once created. The ULID sort key encodes the send
//! time, so a plain key-ordered query returns history oldest-first.

mod error;

use std::sync::Arc;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::{Deserialize, Serialize};
use strum::Display;

pub use error::{ChatHistoryStorageError, ChatHistoryStorageResult};

use crate::write::{Item, Key, WriteCondition, WriteContext, WriteError};

/// Attribute names for the chat history table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChatHistoryAttribute {
    /// Chat ID (Primary Key)
    ChatId,
    /// Message ULID (Sort Key), monotonically increasing
    Ulid,
    /// Send timestamp (Unix milliseconds, encoded in the ULID)
    Timestamp,
    /// Author of the message
    UserId,
    /// Message body
    Content,
}

/// A single immutable chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Chat ID (Primary Key)
    pub chat_id: String,
    /// Message ULID (Sort Key)
    pub ulid: String,
    /// Send timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Author of the message
    pub user_id: String,
    /// Message body
    pub content: String,
}

/// Chat history storage client for Dynamo DB operations
pub struct ChatHistoryStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl ChatHistoryStorage {
    /// Creates a new chat history storage client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name for chat history
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    fn key(chat_id: &str, ulid: &str) -> Key {
        Key::from([
            (
                ChatHistoryAttribute::ChatId.to_string(),
                AttributeValue::S(chat_id.to_string()),
            ),
            (
                ChatHistoryAttribute::Ulid.to_string(),
                AttributeValue::S(ulid.to_string()),
            ),
        ])
    }

    /// Appends a message to the chat history
    ///
    /// # Errors
    ///
    /// Returns `ChatHistoryStorageError::DuplicateMessage` if a message with
    /// the same ULID already exists in the chat, or another
    /// `ChatHistoryStorageError` if the write fails
    pub async fn append(
        &self,
        ctx: &WriteContext,
        message: &ChatMessage,
    ) -> ChatHistoryStorageResult<()> {
        let item: Item = serde_dynamo::to_item(message)?;

        ctx.writer()
            .put_item(
                &self.table_name,
                item,
                Some(WriteCondition::AttributeNotExists(
                    ChatHistoryAttribute::Ulid.to_string(),
                )),
            )
            .await
            .map_err(|err| match err {
                WriteError::ConditionFailed { .. } => ChatHistoryStorageError::DuplicateMessage,
                other => other.into(),
            })
    }

    /// Full message history of the chat, oldest first
    ///
    /// # Errors
    ///
    /// Returns `ChatHistoryStorageError` if the Dynamo DB query fails
    pub async fn history(&self, chat_id: &str) -> ChatHistoryStorageResult<Vec<ChatMessage>> {
        let mut messages = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let response = self
                .dynamodb_client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#chat_id = :chat_id")
                .expression_attribute_names("#chat_id", ChatHistoryAttribute::ChatId.to_string())
                .expression_attribute_values(":chat_id", AttributeValue::S(chat_id.to_string()))
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await?;

            for item in response.items() {
                messages.push(
                    serde_dynamo::from_item(item.clone())
                        .map_err(|e| ChatHistoryStorageError::SerializationError(e.to_string()))?,
                );
            }

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        Ok(messages)
    }

    /// Deletes every message of the chat
    ///
    /// Collects the sort keys page by page, then fans the deletes out in
    /// store-sized batches. Returns the number of messages removed.
    ///
    /// # Errors
    ///
    /// Returns `ChatHistoryStorageError` if a query or delete fails
    pub async fn purge(
        &self,
        ctx: &WriteContext,
        chat_id: &str,
    ) -> ChatHistoryStorageResult<usize> {
        let mut keys: Vec<Key> = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let response = self
                .dynamodb_client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#chat_id = :chat_id")
                .expression_attribute_names("#chat_id", ChatHistoryAttribute::ChatId.to_string())
                .expression_attribute_values(":chat_id", AttributeValue::S(chat_id.to_string()))
                .projection_expression("#ulid")
                .expression_attribute_names("#ulid", ChatHistoryAttribute::Ulid.to_string())
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await?;

            for item in response.items() {
                let ulid = item
                    .get(&ChatHistoryAttribute::Ulid.to_string())
                    .and_then(|value| value.as_s().ok())
                    .ok_or_else(|| {
                        ChatHistoryStorageError::SerializationError(
                            "chat history item missing ulid".to_string(),
                        )
                    })?;
                keys.push(Self::key(chat_id, ulid));
            }

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let removed = keys.len();
        ctx.writer().delete_batch(&self.table_name, keys).await?;
        Ok(removed)
    }
}
