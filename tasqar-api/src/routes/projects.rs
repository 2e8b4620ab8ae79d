/// Project endpoints (owner only)
///
/// - `GET /api/projects` - Projects with task counts
/// - `POST /api/projects` - Create a project
/// - `GET /api/projects/:id` - Project with its tasks
/// - `PATCH /api/projects/:id` - Update a project
/// - `DELETE /api/projects/:id` - Delete a project; its tasks are kept, detached

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
    routes::tasks::{validate_title, TITLE_LENGTH_MESSAGE},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tasqar_shared::{
    auth::middleware::AuthContext,
    models::project::{CreateProject, Project, ProjectStatus, ProjectSummary, UpdateProject},
    services::project_service::{self, ProjectDetail},
};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    /// Default: PLANNED
    #[serde(default)]
    pub status: ProjectStatus,
}

pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<ProjectSummary>>> {
    let projects = project_service::list(&state.db, auth.user_id).await?;
    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidJson(req): ValidJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = project_service::create(
        &state.db,
        CreateProject {
            owner_id: auth.user_id,
            title: req.title.trim().to_string(),
            description: req.description.filter(|d| !d.trim().is_empty()),
            status: req.status,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// Get a project together with its tasks in board order
pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectDetail>> {
    let detail = project_service::get_with_tasks(&state.db, auth.user_id, id).await?;
    Ok(Json(detail))
}

/// Update a project; `null` clears `description`
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateProject>, JsonRejection>,
) -> ApiResult<Json<Project>> {
    let Json(mut patch) = payload?;

    if let Some(title) = patch.title.as_mut() {
        validate_title(title).map_err(|_| ApiError::invalid_field("title", TITLE_LENGTH_MESSAGE))?;
        *title = title.trim().to_string();
    }

    let project = project_service::update(&state.db, auth.user_id, id, patch).await?;
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    project_service::delete(&state.db, auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
