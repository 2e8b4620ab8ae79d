//! # Tasqar Client
//!
//! Data layer for Tasqar front ends: a typed HTTP client, a query cache with
//! optimistic mutations, the kanban board model and the notification stream.
//!
//! ## Modules
//!
//! - `api`: `TasqarApi` trait and the `reqwest` implementation
//! - `cache`: query cache and `QueryClient` reads
//! - `mutations`: optimistic create/update/delete/reorder with rollback
//! - `board`: kanban columns and drag-and-drop reordering
//! - `sse`: `text/event-stream` decoder and notification subscriber
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tasqar_client::{api::HttpClient, cache::QueryClient};
//! use tasqar_shared::models::task::TaskStatus;
//!
//! # async fn example() -> Result<(), tasqar_client::error::ClientError> {
//! let http = HttpClient::new("http://localhost:3000");
//! let session = http.login("ada@example.com", "correct-horse-1").await?;
//!
//! let queries = QueryClient::new(Arc::new(http)).with_user(session.user.id);
//! let tasks = queries.tasks().await?;
//!
//! if let Some(first) = tasks.first() {
//!     queries.move_task(first.id, TaskStatus::Done, 0).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod board;
pub mod cache;
pub mod error;
pub mod mutations;
pub mod sse;

pub use api::{HttpClient, NewTask, TasqarApi};
pub use board::Board;
pub use cache::{QueryCache, QueryClient, QueryKey};
pub use error::{ClientError, ClientResult};
pub use mutations::{Toast, ToastKind};
pub use sse::{NotificationStream, SseDecoder};
