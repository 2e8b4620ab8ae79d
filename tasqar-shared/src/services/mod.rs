//! Business rules on top of the models
//!
//! Route handlers validate request shape and then call into these services,
//! which enforce ownership, connection and uniqueness rules, write the
//! notifications that go with each event, and report failures as
//! [`ServiceError`].
//!
//! - `user_service`: registration, login, profile, user search
//! - `task_service`: task CRUD with owner/assignee rules and bulk reorder
//! - `project_service`: owner-only project CRUD
//! - `connection_service`: connection requests and their lifecycle
//! - `notification_service`: reading and writing in-app notifications
//! - `invitation_service`: email invitations for people without an account

use crate::auth::{jwt::JwtError, password::PasswordError};
use crate::email::EmailError;

pub mod connection_service;
pub mod invitation_service;
pub mod notification_service;
pub mod project_service;
pub mod task_service;
pub mod user_service;

/// PostgreSQL SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Error type for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Whether a database error is a unique constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

/// Maps a unique violation to `Conflict(message)`, anything else to `Database`
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::Conflict(message.to_string())
    } else {
        ServiceError::Database(err)
    }
}
