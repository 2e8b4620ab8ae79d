/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh
/// - `users`: Profile and user search
/// - `tasks`: Task CRUD and kanban reorder
/// - `projects`: Project CRUD
/// - `connections`: Connection requests between users
/// - `notifications`: Notification list, read state and SSE stream
/// - `invitations`: Email invitations

pub mod auth;
pub mod connections;
pub mod health;
pub mod invitations;
pub mod notifications;
pub mod projects;
pub mod tasks;
pub mod users;
