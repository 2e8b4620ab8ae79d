//! Projects, visible only to their owner
//!
//! Another user's project behaves exactly like a missing one (404), so IDs
//! don't leak.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::models::{
    project::{CreateProject, Project, ProjectSummary, UpdateProject},
    task::Task,
};

/// A project with the tasks that belong to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub tasks: Vec<Task>,
}

pub async fn list(pool: &PgPool, owner_id: Uuid) -> ServiceResult<Vec<ProjectSummary>> {
    Ok(Project::list_for_owner(pool, owner_id).await?)
}

/// Loads a project owned by `owner_id`
pub async fn get_owned(pool: &PgPool, owner_id: Uuid, id: Uuid) -> ServiceResult<Project> {
    Project::find_by_id_and_owner(pool, id, owner_id)
        .await?
        .ok_or(ServiceError::NotFound("Project"))
}

pub async fn get_with_tasks(pool: &PgPool, owner_id: Uuid, id: Uuid) -> ServiceResult<ProjectDetail> {
    let project = get_owned(pool, owner_id, id).await?;
    let tasks = Task::list_by_project(pool, project.id).await?;

    Ok(ProjectDetail { project, tasks })
}

pub async fn create(pool: &PgPool, data: CreateProject) -> ServiceResult<Project> {
    let project = Project::create(pool, data).await?;

    info!(project_id = %project.id, owner_id = %project.owner_id, "Project created");
    Ok(project)
}

pub async fn update(
    pool: &PgPool,
    owner_id: Uuid,
    id: Uuid,
    data: UpdateProject,
) -> ServiceResult<Project> {
    let project = get_owned(pool, owner_id, id).await?;

    Project::update(pool, project.id, data)
        .await?
        .ok_or(ServiceError::NotFound("Project"))
}

/// Deletes a project; its tasks stay, detached from it
pub async fn delete(pool: &PgPool, owner_id: Uuid, id: Uuid) -> ServiceResult<()> {
    let project = get_owned(pool, owner_id, id).await?;
    Project::delete(pool, project.id).await?;

    info!(project_id = %id, owner_id = %owner_id, "Project deleted");
    Ok(())
}
