//! # Taskboard Shared Library
//!
//! Domain types, persistence and business rules shared by the Taskboard API
//! server.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, session tokens and access rules
//! - `db`: Connection pool and embedded migrations
//! - `models`: Database models and queries
//! - `fanout`: Notification recipients and messages for task and board events
//! - `storage`: External image storage for profile pictures

pub mod auth;
pub mod db;
pub mod fanout;
pub mod models;
pub mod storage;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
