//! # Tasqar Shared Library
//!
//! Types, persistence and business rules shared by the Tasqar API server and
//! the client data layer.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `db`: Connection pool and embedded migrations
//! - `auth`: Passwords, JWT sessions, invitation tokens and Axum auth middleware
//! - `services`: Business rules used by the API route handlers
//! - `email`: Outgoing email transport

pub mod auth;
pub mod db;
pub mod email;
pub mod models;
pub mod services;

/// Current version of the Tasqar shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
