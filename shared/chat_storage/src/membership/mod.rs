//! Chat membership storage integration using Dynamo DB
//!
//! One record per (user, chat) pair; a record exists iff that user is
//! currently a participant of that chat. A global secondary index inverts
//! the key order so a chat can fan out to its members.

mod error;

use std::sync::Arc;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::{Deserialize, Serialize};
use strum::Display;

pub use error::{MembershipStorageError, MembershipStorageResult};

use crate::write::{Item, Key, WriteCondition, WriteContext};

/// Attribute names for the memberships table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MembershipAttribute {
    /// User ID (Primary Key)
    UserId,
    /// Chat ID (Sort Key; partition key of the inverted index)
    ChatId,
}

/// Membership record establishing that a user participates in a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// User ID (Primary Key)
    pub user_id: String,
    /// Chat ID (Sort Key)
    pub chat_id: String,
}

/// Membership storage client for Dynamo DB operations
pub struct MembershipStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
    chat_index_name: String,
}

impl MembershipStorage {
    /// Creates a new membership storage client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name for memberships
    /// * `chat_index_name` - Name of the GSI keyed by chat ID
    #[must_use]
    pub const fn new(
        dynamodb_client: Arc<DynamoDbClient>,
        table_name: String,
        chat_index_name: String,
    ) -> Self {
        Self {
            dynamodb_client,
            table_name,
            chat_index_name,
        }
    }

    fn key(user_id: &str, chat_id: &str) -> Key {
        Key::from([
            (
                MembershipAttribute::UserId.to_string(),
                AttributeValue::S(user_id.to_string()),
            ),
            (
                MembershipAttribute::ChatId.to_string(),
                AttributeValue::S(chat_id.to_string()),
            ),
        ])
    }

    /// Writes one membership record per user
    ///
    /// Membership puts are idempotent, so no per-item condition is needed;
    /// atomicity with the surrounding chat mutation comes from issuing this
    /// inside a unit of work.
    ///
    /// # Errors
    ///
    /// Returns `MembershipStorageError` if the write fails
    pub async fn create_many(
        &self,
        ctx: &WriteContext,
        chat_id: &str,
        user_ids: &[String],
    ) -> MembershipStorageResult<()> {
        let items = user_ids
            .iter()
            .map(|user_id| {
                serde_dynamo::to_item(Membership {
                    user_id: user_id.clone(),
                    chat_id: chat_id.to_string(),
                })
            })
            .collect::<Result<Vec<Item>, _>>()?;

        ctx.writer().put_batch(&self.table_name, items).await?;
        Ok(())
    }

    /// Whether the user is currently a participant of the chat
    ///
    /// # Errors
    ///
    /// Returns `MembershipStorageError` if the Dynamo DB operation fails
    pub async fn is_member(&self, user_id: &str, chat_id: &str) -> MembershipStorageResult<bool> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(user_id, chat_id)))
            .send()
            .await?;

        Ok(response.item().is_some())
    }

    /// Asserts inside the current writer that the user is a member
    ///
    /// Buffered as a `ConditionCheck` in a unit of work; outside one it
    /// degrades to a strongly consistent read.
    ///
    /// # Errors
    ///
    /// Returns `MembershipStorageError` if the check cannot be issued
    pub async fn require_member(
        &self,
        ctx: &WriteContext,
        user_id: &str,
        chat_id: &str,
    ) -> MembershipStorageResult<()> {
        ctx.writer()
            .condition_check(
                &self.table_name,
                Self::key(user_id, chat_id),
                WriteCondition::AttributeExists(MembershipAttribute::UserId.to_string()),
            )
            .await?;
        Ok(())
    }

    /// Chat IDs the user participates in
    ///
    /// Works for tombstoned users as well; their historical chats remain
    /// listed.
    ///
    /// # Errors
    ///
    /// Returns `MembershipStorageError` if the Dynamo DB query fails
    pub async fn chats_for_user(&self, user_id: &str) -> MembershipStorageResult<Vec<String>> {
        let mut chat_ids = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let response = self
                .dynamodb_client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#user_id = :user_id")
                .expression_attribute_names("#user_id", MembershipAttribute::UserId.to_string())
                .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
                .projection_expression("#chat_id")
                .expression_attribute_names("#chat_id", MembershipAttribute::ChatId.to_string())
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await?;

            for item in response.items() {
                chat_ids.push(string_attribute(item, &MembershipAttribute::ChatId.to_string())?);
            }

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        Ok(chat_ids)
    }

    /// User IDs currently participating in the chat, via the inverted index
    ///
    /// # Errors
    ///
    /// Returns `MembershipStorageError` if the Dynamo DB query fails
    pub async fn members_of_chat(&self, chat_id: &str) -> MembershipStorageResult<Vec<String>> {
        let mut user_ids = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let response = self
                .dynamodb_client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.chat_index_name)
                .key_condition_expression("#chat_id = :chat_id")
                .expression_attribute_names("#chat_id", MembershipAttribute::ChatId.to_string())
                .expression_attribute_values(":chat_id", AttributeValue::S(chat_id.to_string()))
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await?;

            for item in response.items() {
                user_ids.push(string_attribute(item, &MembershipAttribute::UserId.to_string())?);
            }

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        Ok(user_ids)
    }

    /// Removes one membership record
    ///
    /// # Errors
    ///
    /// Returns `MembershipStorageError` if the delete fails
    pub async fn remove(
        &self,
        ctx: &WriteContext,
        user_id: &str,
        chat_id: &str,
    ) -> MembershipStorageResult<()> {
        ctx.writer()
            .delete_item(&self.table_name, Self::key(user_id, chat_id), None)
            .await?;
        Ok(())
    }

    /// Removes one membership record per user
    ///
    /// # Errors
    ///
    /// Returns `MembershipStorageError` if the delete fails
    pub async fn remove_many(
        &self,
        ctx: &WriteContext,
        chat_id: &str,
        user_ids: &[String],
    ) -> MembershipStorageResult<()> {
        let keys = user_ids
            .iter()
            .map(|user_id| Self::key(user_id, chat_id))
            .collect();

        ctx.writer().delete_batch(&self.table_name, keys).await?;
        Ok(())
    }

    /// Deletes every membership record of the chat
    ///
    /// Fans out through batched deletes; intended for the out-of-band purge
    /// after a chat is deleted. Returns the number of records removed.
    ///
    /// # Errors
    ///
    /// Returns `MembershipStorageError` if a query or delete fails
    pub async fn purge_chat(
        &self,
        ctx: &WriteContext,
        chat_id: &str,
    ) -> MembershipStorageResult<usize> {
        let members = self.members_of_chat(chat_id).await?;
        if members.is_empty() {
            return Ok(0);
        }

        self.remove_many(ctx, chat_id, &members).await?;
        Ok(members.len())
    }
}

fn string_attribute(item: &Item, attribute: &str) -> MembershipStorageResult<String> {
    item.get(attribute)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| {
            MembershipStorageError::SerializationError(format!(
                "membership item missing {attribute}"
            ))
        })
}
