//! Claimed-email storage enforcing global email uniqueness
//!
//! One record per claimed address. The conditional put is the only
//! serialization point for concurrent sign-ups racing on the same email;
//! no pre-check locking exists. Records are never deleted, so a tombstoned
//! user's address stays burned.

mod error;

use std::sync::Arc;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::{Deserialize, Serialize};
use strum::Display;

pub use error::{ClaimedEmailStorageError, ClaimedEmailStorageResult};

use crate::write::{Item, Key, WriteCondition, WriteContext, WriteError};

/// Attribute names for the claimed emails table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ClaimedEmailAttribute {
    /// Email address (Primary Key)
    Email,
    /// User that claimed the address
    UserId,
}

/// Claimed email record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedEmail {
    /// Email address (Primary Key)
    pub email: String,
    /// User that claimed the address
    pub user_id: String,
}

/// Claimed email storage client for Dynamo DB operations
pub struct ClaimedEmailStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl ClaimedEmailStorage {
    /// Creates a new claimed email storage client
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    fn key(email: &str) -> Key {
        Key::from([(
            ClaimedEmailAttribute::Email.to_string(),
            AttributeValue::S(email.to_string()),
        )])
    }

    /// Claims an email address, failing if it is already taken
    ///
    /// # Errors
    ///
    /// Returns `ClaimedEmailStorageError::EmailTaken` if the address is
    /// already claimed, or another `ClaimedEmailStorageError` if the write
    /// fails
    pub async fn claim(
        &self,
        ctx: &WriteContext,
        claim: &ClaimedEmail,
    ) -> ClaimedEmailStorageResult<()> {
        let item: Item = serde_dynamo::to_item(claim)?;

        ctx.writer()
            .put_item(
                &self.table_name,
                item,
                Some(WriteCondition::AttributeNotExists(
                    ClaimedEmailAttribute::Email.to_string(),
                )),
            )
            .await
            .map_err(|err| match err {
                WriteError::ConditionFailed { .. } => ClaimedEmailStorageError::EmailTaken,
                other => other.into(),
            })
    }

    /// Whether the address has been claimed
    ///
    /// # Errors
    ///
    /// Returns `ClaimedEmailStorageError` if the Dynamo DB operation fails
    pub async fn is_claimed(&self, email: &str) -> ClaimedEmailStorageResult<bool> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(email)))
            .projection_expression("#email")
            .expression_attribute_names("#email", ClaimedEmailAttribute::Email.to_string())
            .send()
            .await?;

        Ok(response.item().is_some())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn claimed_email_serialization_round_trips() {
        let claim = ClaimedEmail {
            email: "alice@example.com".to_string(),
            user_id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
        };

        let serialized = serde_json::to_string(&claim).unwrap();
        let deserialized: ClaimedEmail = serde_json::from_str(&serialized).unwrap();

        assert_eq!(claim, deserialized);
    }

    #[test]
    fn email_is_the_partition_key_attribute() {
        assert_eq!(ClaimedEmailAttribute::Email.to_string(), "email");
    }
}
