//! HTTP transport for the Tasqar API
//!
//! [`TasqarApi`] is the seam the query cache and mutations talk through;
//! [`HttpClient`] implements it over `reqwest`. Everything the cache does not
//! track (auth, profile, connections, invitations) lives on `HttpClient`
//! directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tasqar_shared::{
    models::{
        connection::{ConnectionList, UserConnection},
        invitation::Invitation,
        notification::Notification,
        project::ProjectSummary,
        task::{ReorderItem, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask},
        user::User,
    },
    services::{
        invitation_service::{InvitationPreview, SentInvitation},
        project_service::ProjectDetail,
        user_service::AuthSession,
    },
};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

/// Body of `POST /api/tasks`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Uuid>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct Updated {
    updated: u64,
}

#[derive(Debug, Deserialize)]
struct Refreshed {
    access_token: String,
}

/// API operations the query cache and optimistic mutations depend on
#[async_trait]
pub trait TasqarApi: Send + Sync {
    async fn list_tasks(&self, filter: &TaskFilter) -> ClientResult<Vec<Task>>;

    async fn create_task(&self, task: &NewTask) -> ClientResult<Task>;

    async fn update_task(&self, id: Uuid, update: &UpdateTask) -> ClientResult<Task>;

    async fn delete_task(&self, id: Uuid) -> ClientResult<()>;

    /// Bulk position/status update; returns the number of rows updated
    async fn reorder_tasks(&self, updates: &[ReorderItem]) -> ClientResult<u64>;

    async fn list_projects(&self) -> ClientResult<Vec<ProjectSummary>>;

    async fn list_notifications(&self, unread_only: bool) -> ClientResult<Vec<Notification>>;

    async fn mark_notification_read(&self, id: Uuid) -> ClientResult<Notification>;

    async fn mark_all_notifications_read(&self) -> ClientResult<u64>;
}

/// Tokens held by a signed-in client
#[derive(Clone, Default)]
struct Credentials {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// `reqwest` client for the Tasqar API
///
/// Cheap to clone; clones share the connection pool and credentials.
///
/// # Example
///
/// ```no_run
/// use tasqar_client::api::{HttpClient, NewTask, TasqarApi};
///
/// # async fn example() -> Result<(), tasqar_client::error::ClientError> {
/// let client = HttpClient::new("http://localhost:3000");
/// client.login("ada@example.com", "correct-horse-1").await?;
///
/// let task = client.create_task(&NewTask::titled("Write launch post")).await?;
/// println!("created {}", task.id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    credentials: Arc<RwLock<Credentials>>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: Arc::new(RwLock::new(Credentials::default())),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn access_token(&self) -> Option<String> {
        self.credentials
            .read()
            .ok()
            .and_then(|c| c.access_token.clone())
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        if let Ok(mut credentials) = self.credentials.write() {
            credentials.access_token = Some(token.into());
        }
    }

    fn store_session(&self, session: &AuthSession) {
        if let Ok(mut credentials) = self.credentials.write() {
            credentials.access_token = Some(session.tokens.access_token.clone());
            credentials.refresh_token = Some(session.tokens.refresh_token.clone());
        }
    }

    /// Forgets both tokens
    pub fn logout(&self) {
        if let Ok(mut credentials) = self.credentials.write() {
            *credentials = Credentials::default();
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn public(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    fn authed(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let token = self.access_token().ok_or(ClientError::NotAuthenticated)?;
        Ok(self.public(method, path).bearer_auth(token))
    }

    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "API request failed");
        Err(ClientError::from_response(status.as_u16(), &body))
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> ClientResult<T> {
        let response = Self::check(request.send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_empty(request: RequestBuilder) -> ClientResult<()> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    /// Creates an account and signs in
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
        invitation_token: Option<&str>,
    ) -> ClientResult<AuthSession> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "name": name,
            "invitation_token": invitation_token,
        });

        let session: AuthSession =
            Self::send_json(self.public(Method::POST, "/api/auth/register").json(&body)).await?;
        self.store_session(&session);
        Ok(session)
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthSession> {
        let body = serde_json::json!({ "email": email, "password": password });

        let session: AuthSession =
            Self::send_json(self.public(Method::POST, "/api/auth/login").json(&body)).await?;
        self.store_session(&session);
        Ok(session)
    }

    /// Exchanges the stored refresh token for a new access token
    pub async fn refresh(&self) -> ClientResult<()> {
        let refresh_token = self
            .credentials
            .read()
            .ok()
            .and_then(|c| c.refresh_token.clone())
            .ok_or(ClientError::NotAuthenticated)?;

        let body = serde_json::json!({ "refresh_token": refresh_token });
        let refreshed: Refreshed =
            Self::send_json(self.public(Method::POST, "/api/auth/refresh").json(&body)).await?;

        self.set_access_token(refreshed.access_token);
        Ok(())
    }

    pub async fn me(&self) -> ClientResult<User> {
        Self::send_json(self.authed(Method::GET, "/api/users/me")?).await
    }

    pub async fn get_task(&self, id: Uuid) -> ClientResult<Task> {
        Self::send_json(self.authed(Method::GET, &format!("/api/tasks/{id}"))?).await
    }

    pub async fn get_project(&self, id: Uuid) -> ClientResult<ProjectDetail> {
        Self::send_json(self.authed(Method::GET, &format!("/api/projects/{id}"))?).await
    }

    pub async fn list_connections(&self) -> ClientResult<ConnectionList> {
        Self::send_json(self.authed(Method::GET, "/api/connections")?).await
    }

    /// Sends a connection request by email address
    pub async fn request_connection(&self, email: &str) -> ClientResult<UserConnection> {
        let body = serde_json::json!({ "email": email });
        Self::send_json(self.authed(Method::POST, "/api/connections")?.json(&body)).await
    }

    pub async fn accept_connection(&self, id: Uuid) -> ClientResult<UserConnection> {
        Self::send_json(self.authed(Method::POST, &format!("/api/connections/{id}/accept"))?).await
    }

    pub async fn remove_connection(&self, id: Uuid) -> ClientResult<()> {
        Self::send_empty(self.authed(Method::DELETE, &format!("/api/connections/{id}"))?).await
    }

    pub async fn invite(&self, email: &str) -> ClientResult<SentInvitation> {
        let body = serde_json::json!({ "email": email });
        Self::send_json(self.authed(Method::POST, "/api/invitations")?.json(&body)).await
    }

    pub async fn list_invitations(&self) -> ClientResult<Vec<Invitation>> {
        Self::send_json(self.authed(Method::GET, "/api/invitations")?).await
    }

    /// Looks up an invitation from a sign-up link; no token needed
    pub async fn preview_invitation(&self, token: &str) -> ClientResult<InvitationPreview> {
        Self::send_json(self.public(Method::GET, &format!("/api/invitations/{token}"))).await
    }

    /// Opens the notification event stream
    pub(crate) async fn open_notification_stream(&self) -> ClientResult<Response> {
        let request = self
            .authed(Method::GET, "/api/notifications/sse")?
            .header(reqwest::header::ACCEPT, "text/event-stream");
        Self::check(request.send().await?).await
    }
}

#[async_trait]
impl TasqarApi for HttpClient {
    async fn list_tasks(&self, filter: &TaskFilter) -> ClientResult<Vec<Task>> {
        Self::send_json(self.authed(Method::GET, "/api/tasks")?.query(filter)).await
    }

    async fn create_task(&self, task: &NewTask) -> ClientResult<Task> {
        Self::send_json(self.authed(Method::POST, "/api/tasks")?.json(task)).await
    }

    async fn update_task(&self, id: Uuid, update: &UpdateTask) -> ClientResult<Task> {
        Self::send_json(
            self.authed(Method::PATCH, &format!("/api/tasks/{id}"))?
                .json(update),
        )
        .await
    }

    async fn delete_task(&self, id: Uuid) -> ClientResult<()> {
        Self::send_empty(self.authed(Method::DELETE, &format!("/api/tasks/{id}"))?).await
    }

    async fn reorder_tasks(&self, updates: &[ReorderItem]) -> ClientResult<u64> {
        let body = serde_json::json!({ "updates": updates });
        let updated: Updated =
            Self::send_json(self.authed(Method::PUT, "/api/tasks/reorder")?.json(&body)).await?;
        Ok(updated.updated)
    }

    async fn list_projects(&self) -> ClientResult<Vec<ProjectSummary>> {
        Self::send_json(self.authed(Method::GET, "/api/projects")?).await
    }

    async fn list_notifications(&self, unread_only: bool) -> ClientResult<Vec<Notification>> {
        Self::send_json(
            self.authed(Method::GET, "/api/notifications")?
                .query(&[("unread_only", unread_only)]),
        )
        .await
    }

    async fn mark_notification_read(&self, id: Uuid) -> ClientResult<Notification> {
        Self::send_json(self.authed(Method::PATCH, &format!("/api/notifications/{id}/read"))?).await
    }

    async fn mark_all_notifications_read(&self) -> ClientResult<u64> {
        let updated: Updated =
            Self::send_json(self.authed(Method::POST, "/api/notifications/read-all")?).await?;
        Ok(updated.updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HttpClient::new("http://localhost:3000/");
        assert_eq!(client.url("/api/tasks"), "http://localhost:3000/api/tasks");
    }

    #[tokio::test]
    async fn test_protected_call_without_token_fails_locally() {
        let client = HttpClient::new("http://127.0.0.1:1");

        let err = client.list_projects().await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }

    #[test]
    fn test_logout_clears_tokens() {
        let client = HttpClient::new("http://localhost:3000");
        client.set_access_token("abc");
        assert_eq!(client.access_token().as_deref(), Some("abc"));

        let clone = client.clone();
        clone.logout();
        assert_eq!(client.access_token(), None);
    }

    #[test]
    fn test_new_task_omits_unset_fields() {
        let body = serde_json::to_value(NewTask::titled("Ship it")).unwrap();

        assert_eq!(
            body,
            serde_json::json!({ "title": "Ship it", "status": "TODO", "priority": "MEDIUM" })
        );
    }
}
