//! Domain error types for the chat and user services

use chat_storage::chat::ChatStorageError;
use chat_storage::chat_history::ChatHistoryStorageError;
use chat_storage::claimed_email::ClaimedEmailStorageError;
use chat_storage::membership::MembershipStorageError;
use chat_storage::user::UserStorageError;
use chat_storage::write::WriteError;
use thiserror::Error;

use crate::service::MAX_CHAT_PARTICIPANTS;

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Domain error types surfaced to callers of the services
///
/// `ChatNotFound` and `Forbidden` are ordinary operation outcomes, not
/// exceptional conditions; storage passthroughs are.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The chat does not exist
    #[error("Chat not found")]
    ChatNotFound,

    /// The user is not a member of the chat
    #[error("User {0} is not a member of this chat")]
    Forbidden(String),

    /// Chat creation or expansion would exceed the participant ceiling
    #[error("Chat would have {requested} participants, limit is {MAX_CHAT_PARTICIPANTS}")]
    TooManyParticipants {
        /// Distinct participants the operation would produce
        requested: usize,
    },

    /// A referenced participant does not exist or is tombstoned
    #[error("Participant {0} does not exist")]
    UnknownParticipant(String),

    /// The email address is already registered
    #[error("Email is already registered")]
    EmailTaken,

    /// The user does not exist
    #[error("User not found")]
    UserNotFound,

    /// User storage failure
    #[error(transparent)]
    User(#[from] UserStorageError),

    /// Claimed email storage failure
    #[error(transparent)]
    ClaimedEmail(#[from] ClaimedEmailStorageError),

    /// Chat storage failure
    #[error(transparent)]
    Chat(#[from] ChatStorageError),

    /// Membership storage failure
    #[error(transparent)]
    Membership(#[from] MembershipStorageError),

    /// Chat history storage failure
    #[error(transparent)]
    ChatHistory(#[from] ChatHistoryStorageError),

    /// Write-layer failure
    #[error(transparent)]
    Write(#[from] WriteError),
}
