//! Kanban board
//!
//! Groups tasks into one column per [`TaskStatus`] and turns drag-and-drop
//! moves into the `ReorderItem`s `PUT /api/tasks/reorder` expects.

use tasqar_shared::models::task::{ReorderItem, Task, TaskStatus};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

/// One status column, in display order
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

/// Tasks grouped into TODO / IN_PROGRESS / DONE columns
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    columns: Vec<Column>,
}

fn column_index(status: TaskStatus) -> usize {
    match status {
        TaskStatus::Todo => 0,
        TaskStatus::InProgress => 1,
        TaskStatus::Done => 2,
    }
}

fn sort_column(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then(a.created_at.cmp(&b.created_at))
    });
}

impl Board {
    /// Builds the board; each column is ordered by position, then creation time
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut columns: Vec<Column> = TaskStatus::ALL
            .iter()
            .map(|&status| Column {
                status,
                tasks: Vec::new(),
            })
            .collect();

        for task in tasks {
            columns[column_index(task.status)].tasks.push(task);
        }

        for column in &mut columns {
            sort_column(&mut column.tasks);
        }

        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, status: TaskStatus) -> &[Task] {
        &self.columns[column_index(status)].tasks
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn locate(&self, task_id: Uuid) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(col, column)| {
            column
                .tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|row| (col, row))
        })
    }

    /// Moves a card to `to_index` in the `to_status` column
    ///
    /// `to_index` is the card's index in the destination column after it has
    /// been lifted out of its current one, clamped to the column length.
    /// Positions in every touched column are renumbered `0..n`. Returns the
    /// rows whose status or position changed, ready for a bulk reorder.
    pub fn move_task(
        &mut self,
        task_id: Uuid,
        to_status: TaskStatus,
        to_index: usize,
    ) -> ClientResult<Vec<ReorderItem>> {
        let (from_col, row) = self
            .locate(task_id)
            .ok_or(ClientError::UnknownTask(task_id))?;
        let to_col = column_index(to_status);

        let task = self.columns[from_col].tasks.remove(row);
        let target = &mut self.columns[to_col].tasks;
        let index = to_index.min(target.len());
        target.insert(index, task);

        let mut changed = Vec::new();
        let mut touched = vec![from_col];
        if to_col != from_col {
            touched.push(to_col);
        }

        for col in touched {
            let column = &mut self.columns[col];
            for (position, task) in column.tasks.iter_mut().enumerate() {
                let position = position as i32;
                if task.position != position || task.status != column.status {
                    task.position = position;
                    task.status = column.status;
                    changed.push(ReorderItem {
                        id: task.id,
                        status: task.status,
                        position,
                    });
                }
            }
        }

        Ok(changed)
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.columns.into_iter().flat_map(|c| c.tasks).collect()
    }
}

/// Writes reorder results into a task list in place
///
/// Tasks not named in `items` are left alone. Returns how many tasks matched.
pub fn apply_reorder(tasks: &mut [Task], items: &[ReorderItem]) -> usize {
    let mut applied = 0;
    for item in items {
        if let Some(task) = tasks.iter_mut().find(|t| t.id == item.id) {
            task.status = item.status;
            task.position = item.position;
            applied += 1;
        }
    }
    applied
}
