/// Database models for Tasqar
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts and authentication
/// - `task`: Tasks, kanban positions and bulk reorder
/// - `project`: Projects grouping tasks
/// - `connection`: Connections between users (pending/accepted)
/// - `notification`: In-app notifications
/// - `invitation`: Email invitations for people without an account
///
/// # Example
///
/// ```no_run
/// use tasqar_shared::models::user::{User, CreateUser};
/// use tasqar_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("John Doe".to_string()),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Deserializer};

pub mod connection;
pub mod invitation;
pub mod notification;
pub mod project;
pub mod task;
pub mod user;

/// Deserializes a present field into `Some(..)`, keeping `null` as `Some(None)`
///
/// Combined with `#[serde(default)]` a missing field stays `None`, so patch
/// bodies can tell "leave unchanged" apart from "clear".
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
