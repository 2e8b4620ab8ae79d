/// Task endpoints
///
/// - `GET /api/tasks` - Tasks owned by or assigned to the caller
/// - `POST /api/tasks` - Create a task
/// - `GET /api/tasks/:id` - Get a task
/// - `PATCH /api/tasks/:id` - Update a task (assignees may only move it)
/// - `DELETE /api/tasks/:id` - Delete a task (owner only)
/// - `PUT /api/tasks/reorder` - Bulk kanban reorder, all or nothing

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ValidJson,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasqar_shared::{
    auth::middleware::AuthContext,
    models::task::{CreateTask, ReorderItem, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask},
    services::task_service,
};
use uuid::Uuid;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

const MAX_TITLE_LENGTH: usize = 200;
pub(crate) const TITLE_LENGTH_MESSAGE: &str = "Title must be between 1 and 200 characters";

/// Length rule on the trimmed title of tasks and projects
pub(crate) fn validate_title(title: &str) -> Result<(), ValidationError> {
    let length = title.trim().chars().count();
    if length == 0 || length > MAX_TITLE_LENGTH {
        let mut error = ValidationError::new("length");
        error.message = Some(Cow::Borrowed(TITLE_LENGTH_MESSAGE));
        return Err(error);
    }
    Ok(())
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    /// Column to create the task in (default: TODO)
    #[serde(default)]
    pub status: TaskStatus,

    /// Default: MEDIUM
    #[serde(default)]
    pub priority: TaskPriority,

    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

impl CreateTaskRequest {
    fn into_create(self, owner_id: Uuid) -> CreateTask {
        CreateTask {
            owner_id,
            title: self.title.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            status: self.status,
            priority: self.priority,
            due_date: self.due_date,
            project_id: self.project_id,
            assignee_id: self.assignee_id,
        }
    }
}

/// Bulk reorder request
#[derive(Debug, Deserialize, Validate)]
pub struct ReorderRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 updates are allowed"))]
    pub updates: Vec<ReorderItem>,
}

/// Bulk reorder response
#[derive(Debug, Serialize)]
pub struct ReorderResponse {
    /// Rows written
    pub updated: u64,
}

/// Field rules for a task patch
fn check_update(patch: &UpdateTask) -> Result<(), ApiError> {
    let mut details = Vec::new();

    if patch.title.as_deref().is_some_and(|title| validate_title(title).is_err()) {
        details.push(ValidationErrorDetail::new("title", TITLE_LENGTH_MESSAGE));
    }
    if patch.position.is_some_and(|position| position < 0) {
        details.push(ValidationErrorDetail::new("position", "Position must not be negative"));
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(details))
    }
}

/// List the caller's tasks
///
/// Query parameters: `status`, `priority`, `project_id`, `search`, and
/// `sort` (one of `position`, `due_date`, `priority`, `created_at`).
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = task_service::list(&state.db, auth.user_id, &filter).await?;
    Ok(Json(tasks))
}

/// Create a task at the end of its column
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or the assignee is not the caller
///   or one of their accepted connections
/// - `404 Not Found`: `project_id` is not one of the caller's projects
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidJson(req): ValidJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = task_service::create(&state.db, req.into_create(auth.user_id)).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = task_service::get_visible(&state.db, auth.user_id, id).await?;
    Ok(Json(task))
}

/// Update a task
///
/// Omitted fields are left alone; `null` clears `description`, `due_date`,
/// `project_id` and `assignee_id`.
///
/// # Errors
///
/// - `403 Forbidden`: An assignee tried to change more than `status`/`position`
/// - `404 Not Found`: Task not visible to the caller
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateTask>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let Json(mut patch) = payload?;
    check_update(&patch)?;

    if let Some(title) = patch.title.as_mut() {
        *title = title.trim().to_string();
    }

    let task = task_service::update(&state.db, auth.user_id, id, patch).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    task_service::delete(&state.db, auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a kanban reorder in one transaction
///
/// # Request
///
/// ```json
/// { "updates": [ { "id": "uuid", "status": "IN_PROGRESS", "position": 0 } ] }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Empty, oversized, or negative positions
/// - `404 Not Found`: Any task the caller can't see; nothing is written
pub async fn reorder_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidJson(req): ValidJson<ReorderRequest>,
) -> ApiResult<Json<ReorderResponse>> {
    let updated = task_service::reorder(&state.db, auth.user_id, &req.updates).await?;
    Ok(Json(ReorderResponse { updated }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTaskRequest = serde_json::from_str(r#"{"title": "Write docs"}"#).unwrap();
        assert_eq!(req.status, TaskStatus::Todo);
        assert_eq!(req.priority, TaskPriority::Medium);

        let owner = Uuid::new_v4();
        let create = req.into_create(owner);
        assert_eq!(create.owner_id, owner);
        assert_eq!(create.title, "Write docs");
    }

    #[test]
    fn test_create_request_rejects_empty_title() {
        let req: CreateTaskRequest = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn test_create_request_rejects_blank_title() {
        let req: CreateTaskRequest = serde_json::from_str(r#"{"title": "   "}"#).unwrap();

        let err: ApiError = req.validate().unwrap_err().into();
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(
                    details,
                    vec![ValidationErrorDetail::new("title", TITLE_LENGTH_MESSAGE)]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_request_trims_title() {
        let req: CreateTaskRequest = serde_json::from_str(r#"{"title": "  Ship it  "}"#).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.into_create(Uuid::new_v4()).title, "Ship it");
    }

    #[test]
    fn test_create_request_rejects_unknown_status() {
        let result = serde_json::from_str::<CreateTaskRequest>(r#"{"title": "x", "status": "DOING"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_update() {
        let ok = UpdateTask {
            title: Some("Ship it".to_string()),
            position: Some(0),
            ..Default::default()
        };
        assert!(check_update(&ok).is_ok());

        let bad = UpdateTask {
            title: Some("  ".to_string()),
            position: Some(-1),
            ..Default::default()
        };
        match check_update(&bad).unwrap_err() {
            ApiError::ValidationError(details) => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "position"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_reorder_request_bounds() {
        let empty = ReorderRequest { updates: vec![] };
        assert!(empty.validate().is_err());

        let one = ReorderRequest {
            updates: vec![ReorderItem {
                id: Uuid::new_v4(),
                status: TaskStatus::Done,
                position: 3,
            }],
        };
        assert!(one.validate().is_ok());
    }
}
