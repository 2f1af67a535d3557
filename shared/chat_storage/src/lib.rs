//! Storage and write-coordination layer for the chat backend
//!
//! One storage client per `DynamoDB` table, plus the write layer that lets
//! multi-record mutations either buffer into a single atomic transaction or
//! fan out through bounded batched writes, without callers knowing which
//! mode is in effect.

pub mod chat;
pub mod chat_history;
pub mod claimed_email;
pub mod membership;
pub mod user;
pub mod write;
