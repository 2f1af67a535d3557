//! User storage integration using Dynamo DB
//!
//! Users are never physically deleted. Deletion marks a tombstone so that
//! historical chat messages always resolve to an author that once existed.

mod error;

use std::sync::Arc;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::{Deserialize, Serialize};
use strum::Display;

pub use error::{UserStorageError, UserStorageResult};

use crate::write::{Item, Key, WriteCondition, WriteContext, WriteError};

/// Attribute names for the users table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UserAttribute {
    /// User ID (Primary Key), a ULID
    UserId,
    /// Creation timestamp (Unix seconds)
    CreatedAt,
    /// Soft-delete marker; a tombstoned user is inactive but persisted
    Tombstone,
    /// Password hash, opaque to this layer
    HashedPassword,
    /// Profile metadata
    Metadata,
}

/// Profile metadata carried on a user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Display name
    pub username: String,
    /// Email address claimed at sign-up
    pub email: String,
}

/// User record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID (Primary Key), a ULID
    pub user_id: String,
    /// Creation timestamp (Unix seconds)
    pub created_at: i64,
    /// Soft-delete marker
    pub tombstone: bool,
    /// Password hash, opaque to this layer
    pub hashed_password: String,
    /// Profile metadata
    pub metadata: UserMetadata,
}

/// User storage client for Dynamo DB operations
pub struct UserStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl UserStorage {
    /// Creates a new user storage client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name for users
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    fn key(user_id: &str) -> Key {
        Key::from([(
            UserAttribute::UserId.to_string(),
            AttributeValue::S(user_id.to_string()),
        )])
    }

    /// Creates a user, failing if the ID is already taken
    ///
    /// # Errors
    ///
    /// Returns `UserStorageError::UserExists` if a record with this
    /// `user_id` already exists, or another `UserStorageError` if the write
    /// fails
    pub async fn create(&self, ctx: &WriteContext, user: &User) -> UserStorageResult<()> {
        let item: Item = serde_dynamo::to_item(user)?;

        ctx.writer()
            .put_item(
                &self.table_name,
                item,
                Some(WriteCondition::AttributeNotExists(
                    UserAttribute::UserId.to_string(),
                )),
            )
            .await
            .map_err(|err| match err {
                WriteError::ConditionFailed { .. } => UserStorageError::UserExists,
                other => other.into(),
            })
    }

    /// Gets a user by ID, tombstoned or not
    ///
    /// # Errors
    ///
    /// Returns `UserStorageError` if the Dynamo DB operation fails
    pub async fn get_by_id(&self, user_id: &str) -> UserStorageResult<Option<User>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(user_id)))
            .send()
            .await?;

        response
            .item()
            .map(|item| {
                serde_dynamo::from_item(item.clone())
                    .map_err(|e| UserStorageError::SerializationError(e.to_string()))
            })
            .transpose()
    }

    /// Whether the user exists and has not been tombstoned
    ///
    /// Tombstoned users report `false`: they may no longer join chats or
    /// author messages.
    ///
    /// # Errors
    ///
    /// Returns `UserStorageError` if the Dynamo DB operation fails
    pub async fn exists(&self, user_id: &str) -> UserStorageResult<bool> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(user_id)))
            .projection_expression("#user_id, #tombstone")
            .expression_attribute_names("#user_id", UserAttribute::UserId.to_string())
            .expression_attribute_names("#tombstone", UserAttribute::Tombstone.to_string())
            .send()
            .await?;

        let Some(item) = response.item() else {
            return Ok(false);
        };
        let tombstoned = matches!(
            item.get(&UserAttribute::Tombstone.to_string()),
            Some(AttributeValue::Bool(true))
        );
        Ok(!tombstoned)
    }

    /// Marks the user as deleted without removing the record
    ///
    /// Memberships, message history, and the claimed email are deliberately
    /// left untouched. The transition is one-way; no revival path exists.
    ///
    /// # Errors
    ///
    /// Returns `UserStorageError::UserNotFound` if no record exists for
    /// `user_id`, or another `UserStorageError` if the update fails
    pub async fn set_tombstone(&self, user_id: &str) -> UserStorageResult<()> {
        self.dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(user_id)))
            .update_expression("SET #tombstone = :tombstone")
            .condition_expression("attribute_exists(#user_id)")
            .expression_attribute_names("#tombstone", UserAttribute::Tombstone.to_string())
            .expression_attribute_names("#user_id", UserAttribute::UserId.to_string())
            .expression_attribute_values(":tombstone", AttributeValue::Bool(true))
            .send()
            .await
            .map_err(|err| {
                if matches!(
                    err,
                    SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
                ) {
                    UserStorageError::UserNotFound
                } else {
                    err.into()
                }
            })?;

        Ok(())
    }
}
