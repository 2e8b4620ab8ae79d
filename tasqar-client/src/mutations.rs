//! Optimistic mutations
//!
//! Every mutation follows the same steps:
//!
//! 1. Snapshot the cached list
//! 2. Write the expected result into the cache
//! 3. Send the request
//! 4. On failure, put the snapshot back and emit an error [`Toast`]
//! 5. Either way, invalidate the list and refetch it
//!
//! Concurrent edits are last-write-wins on the server; the refetch brings
//! the cache back in line with whatever won.

use chrono::Utc;
use std::future::Future;
use tasqar_shared::models::task::{ReorderItem, Task, TaskStatus, UpdateTask};
use uuid::Uuid;

use crate::api::NewTask;
use crate::board::{apply_reorder, Board};
use crate::cache::{QueryCache, QueryClient, QueryKey};
use crate::error::ClientResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

/// Short user-facing message about a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}

impl QueryClient {
    async fn optimistic<T, Fut>(
        &self,
        key: QueryKey,
        action: &str,
        apply: impl FnOnce(&QueryCache),
        request: Fut,
    ) -> ClientResult<T>
    where
        Fut: Future<Output = ClientResult<T>>,
    {
        let snapshot = self.cache.get(key);
        apply(&self.cache);

        let result = request.await;

        if let Err(e) = &result {
            tracing::warn!(?key, action, error = %e, "Mutation failed, rolling back");
            self.cache.restore(key, snapshot);
            self.toast(Toast::error(format!("Failed to {action}: {e}")));
        }

        self.settle(key).await;
        result
    }

    /// Creates a task, showing a placeholder card until the server answers
    pub async fn create_task(&self, task: NewTask) -> ClientResult<Task> {
        let now = Utc::now();
        let mut placeholder = Task {
            id: Uuid::new_v4(),
            owner_id: self.user_id.unwrap_or_default(),
            project_id: task.project_id,
            assignee_id: task.assignee_id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            position: 0,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .optimistic(
                QueryKey::Tasks,
                "create task",
                |cache| {
                    cache.update_tasks(|tasks| {
                        placeholder.position = tasks
                            .iter()
                            .filter(|t| t.status == placeholder.status)
                            .map(|t| t.position + 1)
                            .max()
                            .unwrap_or(0);
                        tasks.push(placeholder);
                    })
                },
                self.api.create_task(&task),
            )
            .await?;

        self.toast(Toast::success("Task created"));
        Ok(created)
    }

    pub async fn update_task(&self, id: Uuid, update: UpdateTask) -> ClientResult<Task> {
        self.optimistic(
            QueryKey::Tasks,
            "update task",
            |cache| {
                cache.update_tasks(|tasks| {
                    if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                        update.apply_to(task);
                    }
                })
            },
            self.api.update_task(id, &update),
        )
        .await
    }

    pub async fn delete_task(&self, id: Uuid) -> ClientResult<()> {
        self.optimistic(
            QueryKey::Tasks,
            "delete task",
            |cache| cache.update_tasks(|tasks| tasks.retain(|t| t.id != id)),
            self.api.delete_task(id),
        )
        .await?;

        self.toast(Toast::success("Task deleted"));
        Ok(())
    }

    /// Sends a bulk reorder; an empty list is a no-op
    pub async fn reorder(&self, items: Vec<ReorderItem>) -> ClientResult<u64> {
        if items.is_empty() {
            return Ok(0);
        }

        self.optimistic(
            QueryKey::Tasks,
            "reorder tasks",
            |cache| {
                cache.update_tasks(|tasks| {
                    apply_reorder(tasks, &items);
                })
            },
            self.api.reorder_tasks(&items),
        )
        .await
    }

    /// Drag-and-drop: moves a card on the cached board and saves the new order
    pub async fn move_task(&self, id: Uuid, to_status: TaskStatus, to_index: usize) -> ClientResult<u64> {
        let tasks = match self.cache.tasks() {
            Some(tasks) => tasks,
            None => self.tasks().await?,
        };

        let items = Board::from_tasks(tasks).move_task(id, to_status, to_index)?;
        self.reorder(items).await
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> ClientResult<()> {
        self.optimistic(
            QueryKey::Notifications,
            "mark notification as read",
            |cache| {
                cache.update_notifications(|notifications| {
                    if let Some(n) = notifications.iter_mut().find(|n| n.id == id) {
                        n.read = true;
                    }
                })
            },
            self.api.mark_notification_read(id),
        )
        .await?;
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self) -> ClientResult<u64> {
        self.optimistic(
            QueryKey::Notifications,
            "mark notifications as read",
            |cache| {
                cache.update_notifications(|notifications| {
                    notifications.iter_mut().for_each(|n| n.read = true)
                })
            },
            self.api.mark_all_notifications_read(),
        )
        .await
    }
}
