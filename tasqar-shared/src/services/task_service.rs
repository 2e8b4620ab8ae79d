//! Tasks and the kanban reorder
//!
//! Access rules:
//! - owner and assignee can read a task; anyone else gets 404
//! - only the owner can update or delete; the assignee may only move it
//!   (`status` and `position`)
//! - an assignee must be the caller or one of their accepted connections,
//!   and a project must be one the caller owns
//! - assigning a task to someone else notifies them

use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{connection_service, notification_service, ServiceError, ServiceResult};
use crate::models::{
    notification::NotificationType,
    project::Project,
    task::{CreateTask, ReorderItem, Task, TaskFilter, UpdateTask},
    user::User,
};

/// Maximum rows in one reorder request
pub const MAX_REORDER_ITEMS: usize = 500;

pub async fn list(pool: &PgPool, user_id: Uuid, filter: &TaskFilter) -> ServiceResult<Vec<Task>> {
    Ok(Task::list_for_user(pool, user_id, filter).await?)
}

/// Loads a task the user owns or is assigned to
pub async fn get_visible(pool: &PgPool, user_id: Uuid, id: Uuid) -> ServiceResult<Task> {
    Task::find_by_id(pool, id)
        .await?
        .filter(|task| task.is_visible_to(user_id))
        .ok_or(ServiceError::NotFound("Task"))
}

async fn check_project(pool: &PgPool, user_id: Uuid, project_id: Option<Uuid>) -> ServiceResult<()> {
    if let Some(project_id) = project_id {
        Project::find_by_id_and_owner(pool, project_id, user_id)
            .await?
            .ok_or(ServiceError::NotFound("Project"))?;
    }
    Ok(())
}

async fn check_assignee(pool: &PgPool, user_id: Uuid, assignee_id: Option<Uuid>) -> ServiceResult<()> {
    if let Some(assignee_id) = assignee_id {
        if !connection_service::can_assign(pool, user_id, assignee_id).await? {
            return Err(ServiceError::BadRequest(
                "Tasks can only be assigned to yourself or an accepted connection".to_string(),
            ));
        }
    }
    Ok(())
}

/// Notifies `assignee_id` unless they assigned the task to themselves
async fn notify_assignee(
    pool: &PgPool,
    assigner_id: Uuid,
    assignee_id: Option<Uuid>,
    task: &Task,
) -> ServiceResult<()> {
    let Some(assignee_id) = assignee_id.filter(|id| *id != assigner_id) else {
        return Ok(());
    };

    let assigner = User::find_by_id(pool, assigner_id)
        .await?
        .ok_or(ServiceError::NotFound("User"))?;

    notification_service::notify(
        pool,
        assignee_id,
        NotificationType::TaskAssigned,
        notification_service::messages::task_assigned(assigner.display_name(), &task.title),
        Some(task.id),
    )
    .await?;

    Ok(())
}

/// Creates a task for `data.owner_id` at the end of its column
pub async fn create(pool: &PgPool, data: CreateTask) -> ServiceResult<Task> {
    let owner_id = data.owner_id;
    check_project(pool, owner_id, data.project_id).await?;
    check_assignee(pool, owner_id, data.assignee_id).await?;

    let task = Task::create(pool, data).await?;
    info!(task_id = %task.id, owner_id = %owner_id, "Task created");

    notify_assignee(pool, owner_id, task.assignee_id, &task).await?;
    Ok(task)
}

/// Updates a task on behalf of `user_id`
///
/// A status change without a position appends the task to the new column.
pub async fn update(pool: &PgPool, user_id: Uuid, id: Uuid, mut data: UpdateTask) -> ServiceResult<Task> {
    let task = get_visible(pool, user_id, id).await?;

    if task.owner_id != user_id && !data.is_status_only() {
        return Err(ServiceError::Forbidden(
            "Assignees can only change a task's status".to_string(),
        ));
    }
    if data.is_empty() {
        return Ok(task);
    }

    if let Some(project_id) = data.project_id {
        check_project(pool, user_id, project_id).await?;
    }
    let new_assignee = data.assignee_id.flatten().filter(|id| Some(*id) != task.assignee_id);
    check_assignee(pool, user_id, new_assignee).await?;

    if let Some(status) = data.column_change(task.status) {
        data.position = Some(Task::next_position(pool, task.owner_id, status).await?);
    }

    let updated = Task::update(pool, id, data)
        .await?
        .ok_or(ServiceError::NotFound("Task"))?;
    debug!(task_id = %id, user_id = %user_id, "Task updated");

    notify_assignee(pool, user_id, new_assignee, &updated).await?;
    Ok(updated)
}

/// Deletes a task; only the owner may
pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> ServiceResult<()> {
    let task = get_visible(pool, user_id, id).await?;

    if task.owner_id != user_id {
        return Err(ServiceError::Forbidden(
            "Only the owner can delete a task".to_string(),
        ));
    }

    Task::delete(pool, id).await?;
    info!(task_id = %id, user_id = %user_id, "Task deleted");
    Ok(())
}

/// Applies a board reorder atomically
///
/// Any row the user neither owns nor is assigned rolls the whole batch back
/// and reports 404.
pub async fn reorder(pool: &PgPool, user_id: Uuid, items: &[ReorderItem]) -> ServiceResult<u64> {
    if items.len() > MAX_REORDER_ITEMS {
        return Err(ServiceError::BadRequest(format!(
            "At most {MAX_REORDER_ITEMS} tasks can be reordered at once"
        )));
    }
    if let Some(item) = items.iter().find(|item| item.position < 0) {
        return Err(ServiceError::BadRequest(format!(
            "Position of task {} must not be negative",
            item.id
        )));
    }

    let updated = Task::reorder(pool, user_id, items).await.map_err(|e| match e {
        sqlx::Error::RowNotFound => ServiceError::NotFound("Task"),
        other => ServiceError::Database(other),
    })?;

    info!(user_id = %user_id, updated, "Tasks reordered");
    Ok(updated)
}
