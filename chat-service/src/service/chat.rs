//! Chat lifecycle and messaging operations
//!
//! Multi-record mutations are atomic: a chat either has all of its initial
//! members or does not exist at all. Access checks tolerate eventual
//! consistency and deliberately run outside any transaction, since they
//! gate on recently written data rather than cross-record atomicity.

use std::collections::BTreeSet;
use std::sync::Arc;

use chat_storage::chat::{Chat, ChatStorage};
use chat_storage::chat_history::{ChatHistoryStorage, ChatMessage};
use chat_storage::membership::MembershipStorage;
use chat_storage::user::UserStorage;
use chat_storage::write::WriteContext;
use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::types::{ServiceError, ServiceResult};

/// Most participants a chat may have, creator included
pub const MAX_CHAT_PARTICIPANTS: usize = 10;

/// Position of the membership condition check in the delete-chat transaction
const DELETE_CHAT_MEMBER_CHECK_INDEX: usize = 0;
/// Position of the guarded chat delete in the delete-chat transaction
const DELETE_CHAT_DELETE_INDEX: usize = 1;
/// Position of the chat existence check in the add-members transaction
const ADD_MEMBERS_CHAT_CHECK_INDEX: usize = 0;

/// Chat lifecycle, membership, and messaging operations
pub struct ChatService {
    chat_storage: Arc<ChatStorage>,
    membership_storage: Arc<MembershipStorage>,
    chat_history_storage: Arc<ChatHistoryStorage>,
    user_storage: Arc<UserStorage>,
    write_context: WriteContext,
}

impl ChatService {
    /// Creates a new chat service
    #[must_use]
    pub const fn new(
        chat_storage: Arc<ChatStorage>,
        membership_storage: Arc<MembershipStorage>,
        chat_history_storage: Arc<ChatHistoryStorage>,
        user_storage: Arc<UserStorage>,
        write_context: WriteContext,
    ) -> Self {
        Self {
            chat_storage,
            membership_storage,
            chat_history_storage,
            user_storage,
            write_context,
        }
    }

    /// Creates a chat with the given participants
    ///
    /// The creator always joins and duplicates collapse. Every participant
    /// is validated concurrently before anything is written; the chat record
    /// and all memberships then land in one atomic transaction, so no
    /// partial chat is ever observable.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TooManyParticipants`] over the participant
    /// ceiling, [`ServiceError::UnknownParticipant`] for a missing or
    /// tombstoned user, or a storage error if a check or the commit fails
    pub async fn create_chat(
        &self,
        creator_id: &str,
        participant_ids: &[String],
    ) -> ServiceResult<Chat> {
        let participants = collect_participants(creator_id, participant_ids)?;
        self.ensure_users_exist(&participants).await?;

        let id = Ulid::new();
        let chat = Chat {
            chat_id: id.to_string(),
            created_at: DateTime::<Utc>::from(id.datetime()).timestamp(),
        };

        let scope = self.write_context.begin_transaction()?;
        self.chat_storage.create(scope.context(), &chat).await?;
        self.membership_storage
            .create_many(scope.context(), &chat.chat_id, &participants)
            .await?;
        scope.commit().await?;

        tracing::info!(
            chat_id = %chat.chat_id,
            participants = participants.len(),
            "chat created"
        );
        Ok(chat)
    }

    /// Verifies the chat exists and the user is a member
    ///
    /// Both checks run concurrently and are joined before proceeding. A
    /// missing chat reports [`ServiceError::ChatNotFound`] even when the
    /// membership lookup also comes back empty.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ChatNotFound`], [`ServiceError::Forbidden`],
    /// or a storage error if a lookup fails
    pub async fn ensure_participant(&self, chat_id: &str, user_id: &str) -> ServiceResult<()> {
        let (chat_exists, is_member) = tokio::join!(
            self.chat_storage.exists(chat_id),
            self.membership_storage.is_member(user_id, chat_id),
        );

        if !chat_exists? {
            return Err(ServiceError::ChatNotFound);
        }
        if !is_member? {
            return Err(ServiceError::Forbidden(user_id.to_string()));
        }
        Ok(())
    }

    /// Appends a message to the chat history
    ///
    /// The message is immutable once written; its ULID sort key encodes the
    /// send time.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ChatNotFound`] or [`ServiceError::Forbidden`]
    /// from the access check, or a storage error if the write fails
    pub async fn send_message(
        &self,
        chat_id: &str,
        user_id: &str,
        content: String,
    ) -> ServiceResult<ChatMessage> {
        self.ensure_participant(chat_id, user_id).await?;

        let id = Ulid::new();
        let message = ChatMessage {
            chat_id: chat_id.to_string(),
            ulid: id.to_string(),
            timestamp: DateTime::<Utc>::from(id.datetime()).timestamp_millis(),
            user_id: user_id.to_string(),
            content,
        };
        self.chat_history_storage
            .append(&self.write_context, &message)
            .await?;

        Ok(message)
    }

    /// Full message history of the chat, oldest first
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ChatNotFound`] or [`ServiceError::Forbidden`]
    /// from the access check, or a storage error if the query fails
    pub async fn chat_history(
        &self,
        chat_id: &str,
        user_id: &str,
    ) -> ServiceResult<Vec<ChatMessage>> {
        self.ensure_participant(chat_id, user_id).await?;
        Ok(self.chat_history_storage.history(chat_id).await?)
    }

    /// Current member IDs of the chat
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ChatNotFound`] or [`ServiceError::Forbidden`]
    /// from the access check, or a storage error if the query fails
    pub async fn chat_members(&self, chat_id: &str, user_id: &str) -> ServiceResult<Vec<String>> {
        self.ensure_participant(chat_id, user_id).await?;
        Ok(self.membership_storage.members_of_chat(chat_id).await?)
    }

    /// Adds users to an existing chat
    ///
    /// Existence and cap checks run first; the membership puts are then
    /// guarded by a chat existence check in the same transaction, so members
    /// are never attached to a concurrently deleted chat.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ChatNotFound`], [`ServiceError::Forbidden`],
    /// [`ServiceError::UnknownParticipant`],
    /// [`ServiceError::TooManyParticipants`], or a storage error
    pub async fn add_members(
        &self,
        chat_id: &str,
        requester_id: &str,
        user_ids: &[String],
    ) -> ServiceResult<()> {
        if user_ids.is_empty() {
            return Ok(());
        }
        self.ensure_participant(chat_id, requester_id).await?;
        self.ensure_users_exist(user_ids).await?;

        let current = self.membership_storage.members_of_chat(chat_id).await?;
        let mut combined: BTreeSet<&str> = current.iter().map(String::as_str).collect();
        combined.extend(user_ids.iter().map(String::as_str));
        if combined.len() > MAX_CHAT_PARTICIPANTS {
            return Err(ServiceError::TooManyParticipants {
                requested: combined.len(),
            });
        }

        let new_members: Vec<String> = user_ids
            .iter()
            .filter(|user_id| !current.contains(*user_id))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if new_members.is_empty() {
            return Ok(());
        }

        let scope = self.write_context.begin_transaction()?;
        self.chat_storage
            .require_exists(scope.context(), chat_id)
            .await?;
        self.membership_storage
            .create_many(scope.context(), chat_id, &new_members)
            .await?;
        scope.commit().await.map_err(|err| {
            if err
                .failed_condition_indices()
                .contains(&ADD_MEMBERS_CHAT_CHECK_INDEX)
            {
                ServiceError::ChatNotFound
            } else {
                err.into()
            }
        })?;

        tracing::info!(chat_id, added = new_members.len(), "members added");
        Ok(())
    }

    /// Removes a member from the chat; the requester must be a member
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ChatNotFound`] or [`ServiceError::Forbidden`]
    /// from the access check, or a storage error if the delete fails
    pub async fn remove_member(
        &self,
        chat_id: &str,
        requester_id: &str,
        user_id: &str,
    ) -> ServiceResult<()> {
        self.ensure_participant(chat_id, requester_id).await?;
        self.membership_storage
            .remove(&self.write_context, user_id, chat_id)
            .await?;
        Ok(())
    }

    /// Removes the caller from the chat
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ChatNotFound`] or [`ServiceError::Forbidden`]
    /// if the caller is not a member, or a storage error if the delete fails
    pub async fn leave_chat(&self, chat_id: &str, user_id: &str) -> ServiceResult<()> {
        self.remove_member(chat_id, user_id, user_id).await
    }

    /// Deletes the chat record atomically
    ///
    /// The membership check and the guarded delete travel in one
    /// transaction; there is no window between check and delete. Bulk
    /// removal of history and memberships is deferred to
    /// [`Self::purge_chat_data`], which may span thousands of records and
    /// cannot fit the transaction ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ChatNotFound`] if the chat is missing,
    /// [`ServiceError::Forbidden`] if the requester is not a member, or a
    /// storage error if the commit fails for another reason
    pub async fn delete_chat(&self, chat_id: &str, user_id: &str) -> ServiceResult<()> {
        let scope = self.write_context.begin_transaction()?;
        self.membership_storage
            .require_member(scope.context(), user_id, chat_id)
            .await?;
        self.chat_storage.delete(scope.context(), chat_id).await?;

        scope.commit().await.map_err(|err| {
            let failed = err.failed_condition_indices();
            // A missing chat fails the membership check too; report the
            // chat first so callers see NotFound rather than Forbidden.
            if failed.contains(&DELETE_CHAT_DELETE_INDEX) {
                ServiceError::ChatNotFound
            } else if failed.contains(&DELETE_CHAT_MEMBER_CHECK_INDEX) {
                ServiceError::Forbidden(user_id.to_string())
            } else {
                err.into()
            }
        })?;

        tracing::info!(chat_id, "chat deleted");
        Ok(())
    }

    /// Out-of-band bulk purge of a deleted chat's records
    ///
    /// Fans out through batched deletes and is not atomic with
    /// [`Self::delete_chat`]. Returns the numbers of messages and
    /// memberships removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a query or batch delete fails
    pub async fn purge_chat_data(&self, chat_id: &str) -> ServiceResult<(usize, usize)> {
        let (messages, memberships) = tokio::join!(
            self.chat_history_storage.purge(&self.write_context, chat_id),
            self.membership_storage.purge_chat(&self.write_context, chat_id),
        );
        let (messages, memberships) = (messages?, memberships?);

        tracing::info!(chat_id, messages, memberships, "chat data purged");
        Ok((messages, memberships))
    }

    async fn ensure_users_exist(&self, user_ids: &[String]) -> ServiceResult<()> {
        let checks = user_ids.iter().map(|user_id| self.user_storage.exists(user_id));
        let results = futures::future::try_join_all(checks).await?;

        for (user_id, exists) in user_ids.iter().zip(results) {
            if !exists {
                return Err(ServiceError::UnknownParticipant(user_id.clone()));
            }
        }
        Ok(())
    }
}

/// Collapses the creator and participants into a deduplicated, capped set
fn collect_participants(
    creator_id: &str,
    participant_ids: &[String],
) -> ServiceResult<Vec<String>> {
    let mut participants: BTreeSet<String> = participant_ids.iter().cloned().collect();
    participants.insert(creator_id.to_string());

    if participants.len() > MAX_CHAT_PARTICIPANTS {
        return Err(ServiceError::TooManyParticipants {
            requested: participants.len(),
        });
    }
    Ok(participants.into_iter().collect())
}
