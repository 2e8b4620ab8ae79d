/// Task model and database operations
///
/// Tasks are the cards on the kanban board. Each task has an owner, may
/// belong to one of the owner's projects and may be assigned to a connected
/// user. `position` orders tasks within a status column of the owner's board.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('TODO', 'IN_PROGRESS', 'DONE');
/// CREATE TYPE task_priority AS ENUM ('LOW', 'MEDIUM', 'HIGH');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'TODO',
///     priority task_priority NOT NULL DEFAULT 'MEDIUM',
///     due_date TIMESTAMPTZ,
///     position INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasqar_shared::models::task::{CreateTask, Task, TaskPriority, TaskStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     owner_id,
///     title: "Write release notes".to_string(),
///     description: None,
///     status: TaskStatus::Todo,
///     priority: TaskPriority::High,
///     due_date: None,
///     project_id: None,
///     assignee_id: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::double_option;

const TASK_COLUMNS: &str = "id, owner_id, project_id, assignee_id, title, description, status, \
                            priority, due_date, position, created_at, updated_at";

/// Kanban column a task sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// All statuses in board column order
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }
}

/// Task priority; sorts LOW < MEDIUM < HIGH in the database enum as well
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// User who created and owns the task
    pub owner_id: Uuid,

    /// Project the task belongs to, if any
    pub project_id: Option<Uuid>,

    /// User the task is assigned to, if any
    pub assignee_id: Option<Uuid>,

    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub due_date: Option<DateTime<Utc>>,

    /// Order within the status column (ascending)
    pub position: i32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether `user_id` may see this task on their board
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.assignee_id == Some(user_id)
    }
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

/// Input for updating a task
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub project_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

impl UpdateTask {
    /// True when nothing would change
    pub fn is_empty(&self) -> bool {
        self == &UpdateTask::default()
    }

    /// Column the task moves to without an explicit position, if any
    pub fn column_change(&self, current: TaskStatus) -> Option<TaskStatus> {
        match (self.status, self.position) {
            (Some(status), None) if status != current => Some(status),
            _ => None,
        }
    }

    /// True when only `status` (and possibly `position`) is set
    pub fn is_status_only(&self) -> bool {
        let UpdateTask { status, position, .. } = self;
        let rest = UpdateTask {
            status: None,
            position: None,
            ..self.clone()
        };
        (status.is_some() || position.is_some()) && rest.is_empty()
    }

    /// Applies the update to an in-memory task
    ///
    /// Mirrors what [`Task::update`] does in SQL; used by clients to predict
    /// the server result.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(project_id) = self.project_id {
            task.project_id = project_id;
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = assignee_id;
        }
        if let Some(position) = self.position {
            task.position = position;
        }
    }
}

/// Sort order for task listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    /// Board order: position, then creation time
    #[default]
    Position,
    /// Earliest due date first, tasks without a due date last
    DueDate,
    /// Highest priority first
    Priority,
    /// Newest first
    CreatedAt,
}

impl TaskSort {
    fn order_by(&self) -> &'static str {
        match self {
            TaskSort::Position => "status, position ASC, created_at ASC",
            TaskSort::DueDate => "due_date ASC NULLS LAST, created_at DESC",
            TaskSort::Priority => "priority DESC, due_date ASC NULLS LAST",
            TaskSort::CreatedAt => "created_at DESC",
        }
    }
}

/// Filters for [`Task::list_for_user`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<Uuid>,
    /// Case-insensitive substring match on title and description
    pub search: Option<String>,
    #[serde(default)]
    pub sort: TaskSort,
}

/// One row of a bulk reorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderItem {
    pub id: Uuid,
    pub status: TaskStatus,
    pub position: i32,
}

impl Task {
    /// Creates a new task at the end of its status column
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (owner_id, title, description, status, priority, due_date,
                               project_id, assignee_id, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                    COALESCE((SELECT MAX(position) + 1 FROM tasks
                              WHERE owner_id = $1 AND status = $4), 0))
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.owner_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.project_id)
        .bind(data.assignee_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Position one past the last card in an owner's column
    pub async fn next_position(
        pool: &PgPool,
        owner_id: Uuid,
        status: TaskStatus,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM tasks WHERE owner_id = $1 AND status = $2",
        )
        .bind(owner_id)
        .bind(status)
        .fetch_one(pool)
        .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks owned by or assigned to `user_id`
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE (owner_id = $1 OR assignee_id = $1)"
        );
        let mut bind_count = 1;

        if filter.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }
        if filter.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND priority = ${}", bind_count));
        }
        if filter.project_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND project_id = ${}", bind_count));
        }
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if search.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (title ILIKE ${0} OR description ILIKE ${0})",
                bind_count
            ));
        }

        query.push_str(" ORDER BY ");
        query.push_str(filter.sort.order_by());

        let mut q = sqlx::query_as::<_, Task>(&query).bind(user_id);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority);
        }
        if let Some(project_id) = filter.project_id {
            q = q.bind(project_id);
        }
        if let Some(search) = search {
            q = q.bind(format!("%{}%", super::user::escape_like(search)));
        }

        q.fetch_all(pool).await
    }

    /// Lists the tasks of a project in board order
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE project_id = $1
            ORDER BY status, position ASC, created_at ASC
            "#
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Updates a task
    ///
    /// Only non-None fields in `data` are written. Returns None if the task
    /// doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push = |column: &str, present: bool, query: &mut String| {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        };
        push("title", data.title.is_some(), &mut query);
        push("description", data.description.is_some(), &mut query);
        push("status", data.status.is_some(), &mut query);
        push("priority", data.priority.is_some(), &mut query);
        push("due_date", data.due_date.is_some(), &mut query);
        push("project_id", data.project_id.is_some(), &mut query);
        push("assignee_id", data.assignee_id.is_some(), &mut query);
        push("position", data.position.is_some(), &mut query);

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(project_id) = data.project_id {
            q = q.bind(project_id);
        }
        if let Some(assignee_id) = data.assignee_id {
            q = q.bind(assignee_id);
        }
        if let Some(position) = data.position {
            q = q.bind(position);
        }

        q.fetch_optional(pool).await
    }

    /// Applies a batch of status/position updates in one transaction
    ///
    /// Every row must be owned by or assigned to `user_id`. If any row is
    /// missing the transaction is rolled back and `RowNotFound` is returned,
    /// so either all updates apply or none do.
    pub async fn reorder(
        pool: &PgPool,
        user_id: Uuid,
        items: &[ReorderItem],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut updated = 0;

        for item in items {
            let result = sqlx::query(
                r#"
                UPDATE tasks
                SET status = $3, position = $4, updated_at = NOW()
                WHERE id = $1 AND (owner_id = $2 OR assignee_id = $2)
                "#,
            )
            .bind(item.id)
            .bind(user_id)
            .bind(item.status)
            .bind(item.position)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tracing::warn!(task_id = %item.id, user_id = %user_id, "Reorder target not found, rolling back");
                tx.rollback().await?;
                return Err(sqlx::Error::RowNotFound);
            }
            updated += result.rows_affected();
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Deletes a task
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
