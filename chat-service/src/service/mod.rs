//! Domain services layered over the storage crate

mod chat;
mod user;

pub use chat::{ChatService, MAX_CHAT_PARTICIPANTS};
pub use user::UserService;
