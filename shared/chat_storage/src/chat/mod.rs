//! Chat storage integration using Dynamo DB
//!
//! Chats are hard-deleted, unlike users. The guarded delete carries its
//! existence condition on the `Delete` operation itself, because a
//! transaction may not target the same item twice.

mod error;

use std::sync::Arc;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::{Deserialize, Serialize};
use strum::Display;

pub use error::{ChatStorageError, ChatStorageResult};

use crate::write::{Item, Key, WriteCondition, WriteContext, WriteError};

/// Attribute names for the chats table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChatAttribute {
    /// Chat ID (Primary Key), a ULID
    ChatId,
    /// Creation timestamp (Unix seconds)
    CreatedAt,
}

/// Chat record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Chat ID (Primary Key), a ULID
    pub chat_id: String,
    /// Creation timestamp (Unix seconds)
    pub created_at: i64,
}

/// Chat storage client for Dynamo DB operations
pub struct ChatStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl ChatStorage {
    /// Creates a new chat storage client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name for chats
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    fn key(chat_id: &str) -> Key {
        Key::from([(
            ChatAttribute::ChatId.to_string(),
            AttributeValue::S(chat_id.to_string()),
        )])
    }

    /// Creates a chat, failing if the ID is already taken
    ///
    /// # Errors
    ///
    /// Returns `ChatStorageError::ChatExists` if a record with this
    /// `chat_id` already exists, or another `ChatStorageError` if the write
    /// fails
    pub async fn create(&self, ctx: &WriteContext, chat: &Chat) -> ChatStorageResult<()> {
        let item: Item = serde_dynamo::to_item(chat)?;

        ctx.writer()
            .put_item(
                &self.table_name,
                item,
                Some(WriteCondition::AttributeNotExists(
                    ChatAttribute::ChatId.to_string(),
                )),
            )
            .await
            .map_err(|err| match err {
                WriteError::ConditionFailed { .. } => ChatStorageError::ChatExists,
                other => other.into(),
            })
    }

    /// Gets a chat by ID
    ///
    /// # Errors
    ///
    /// Returns `ChatStorageError` if the Dynamo DB operation fails
    pub async fn get_by_id(&self, chat_id: &str) -> ChatStorageResult<Option<Chat>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(chat_id)))
            .send()
            .await?;

        response
            .item()
            .map(|item| {
                serde_dynamo::from_item(item.clone())
                    .map_err(|e| ChatStorageError::SerializationError(e.to_string()))
            })
            .transpose()
    }

    /// Whether the chat exists
    ///
    /// # Errors
    ///
    /// Returns `ChatStorageError` if the Dynamo DB operation fails
    pub async fn exists(&self, chat_id: &str) -> ChatStorageResult<bool> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(chat_id)))
            .projection_expression("#chat_id")
            .expression_attribute_names("#chat_id", ChatAttribute::ChatId.to_string())
            .send()
            .await?;

        Ok(response.item().is_some())
    }

    /// Asserts inside the current writer that the chat exists
    ///
    /// Buffered as a `ConditionCheck` in a unit of work; outside one it
    /// degrades to a strongly consistent read.
    ///
    /// # Errors
    ///
    /// Returns `ChatStorageError::ChatNotFound` if the chat is missing, or
    /// another `ChatStorageError` if the check fails
    pub async fn require_exists(&self, ctx: &WriteContext, chat_id: &str) -> ChatStorageResult<()> {
        ctx.writer()
            .condition_check(
                &self.table_name,
                Self::key(chat_id),
                WriteCondition::AttributeExists(ChatAttribute::ChatId.to_string()),
            )
            .await
            .map_err(|err| match err {
                WriteError::ConditionFailed { .. } => ChatStorageError::ChatNotFound,
                other => other.into(),
            })
    }

    /// Deletes the chat record, guarded on its existence
    ///
    /// Memberships and history are not touched here; bulk purging them is a
    /// separate fan-out path.
    ///
    /// # Errors
    ///
    /// Returns `ChatStorageError::ChatNotFound` if the chat is missing (in
    /// direct mode), or another `ChatStorageError` if the delete fails
    pub async fn delete(&self, ctx: &WriteContext, chat_id: &str) -> ChatStorageResult<()> {
        ctx.writer()
            .delete_item(
                &self.table_name,
                Self::key(chat_id),
                Some(WriteCondition::AttributeExists(
                    ChatAttribute::ChatId.to_string(),
                )),
            )
            .await
            .map_err(|err| match err {
                WriteError::ConditionFailed { .. } => ChatStorageError::ChatNotFound,
                other => other.into(),
            })
    }
}
