//! User lifecycle operations
//!
//! Sign-up writes the user record and its email claim in one atomic
//! transaction; the conditional put on the claim is the only serialization
//! point for concurrent registrations racing on the same address.

use std::sync::Arc;

use chat_storage::claimed_email::{ClaimedEmail, ClaimedEmailStorage};
use chat_storage::membership::MembershipStorage;
use chat_storage::user::{User, UserMetadata, UserStorage, UserStorageError};
use chat_storage::write::WriteContext;
use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::types::{ServiceError, ServiceResult};

/// Position of the email claim in the sign-up transaction
const SIGN_UP_EMAIL_CLAIM_INDEX: usize = 0;

/// User registration, lookup, and soft-delete operations
pub struct UserService {
    user_storage: Arc<UserStorage>,
    claimed_email_storage: Arc<ClaimedEmailStorage>,
    membership_storage: Arc<MembershipStorage>,
    write_context: WriteContext,
}

impl UserService {
    /// Creates a new user service
    #[must_use]
    pub const fn new(
        user_storage: Arc<UserStorage>,
        claimed_email_storage: Arc<ClaimedEmailStorage>,
        membership_storage: Arc<MembershipStorage>,
        write_context: WriteContext,
    ) -> Self {
        Self {
            user_storage,
            claimed_email_storage,
            membership_storage,
            write_context,
        }
    }

    /// Registers a new user
    ///
    /// The password arrives already hashed; this layer never sees
    /// plaintext. Two concurrent sign-ups with the same email leave exactly
    /// one winner.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::EmailTaken`] if the address is already
    /// claimed, or a storage error if the transaction fails
    pub async fn sign_up(
        &self,
        username: String,
        email: String,
        hashed_password: String,
    ) -> ServiceResult<User> {
        let id = Ulid::new();
        let user = User {
            user_id: id.to_string(),
            created_at: DateTime::<Utc>::from(id.datetime()).timestamp(),
            tombstone: false,
            hashed_password,
            metadata: UserMetadata {
                username,
                email: email.clone(),
            },
        };

        let scope = self.write_context.begin_transaction()?;
        self.claimed_email_storage
            .claim(
                scope.context(),
                &ClaimedEmail {
                    email,
                    user_id: user.user_id.clone(),
                },
            )
            .await?;
        self.user_storage.create(scope.context(), &user).await?;

        scope.commit().await.map_err(|err| {
            if err
                .failed_condition_indices()
                .contains(&SIGN_UP_EMAIL_CLAIM_INDEX)
            {
                ServiceError::EmailTaken
            } else {
                err.into()
            }
        })?;

        tracing::info!(user_id = %user.user_id, "user registered");
        Ok(user)
    }

    /// Fetches a user by ID, tombstoned or not
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::UserNotFound`] if no record exists, or a
    /// storage error if the lookup fails
    pub async fn get_user(&self, user_id: &str) -> ServiceResult<User> {
        self.user_storage
            .get_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    /// Whether the user exists and has not been tombstoned
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails
    pub async fn user_exists(&self, user_id: &str) -> ServiceResult<bool> {
        Ok(self.user_storage.exists(user_id).await?)
    }

    /// Marks a user as deleted
    ///
    /// Memberships, message history, and the claimed email stay in place so
    /// past conversations remain intact. The transition is one-way.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::UserNotFound`] if no record exists, or a
    /// storage error if the update fails
    pub async fn delete_user(&self, user_id: &str) -> ServiceResult<()> {
        self.user_storage
            .set_tombstone(user_id)
            .await
            .map_err(|err| match err {
                UserStorageError::UserNotFound => ServiceError::UserNotFound,
                other => other.into(),
            })?;

        tracing::info!(user_id, "user tombstoned");
        Ok(())
    }

    /// Chat IDs the user participates in
    ///
    /// Tombstoned users keep their chat list; membership is independent of
    /// the tombstone flag.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails
    pub async fn user_chats(&self, user_id: &str) -> ServiceResult<Vec<String>> {
        Ok(self.membership_storage.chats_for_user(user_id).await?)
    }
}
