//! Chat backend domain core
//!
//! Domain services enforcing the consistency rules above the storage layer:
//! atomic multi-record mutations through units of work, eventually
//! consistent access checks, and soft-delete semantics for users.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Domain services
pub mod service;

/// Shared types
pub mod types;
