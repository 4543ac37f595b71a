/// Task model, status cycle and comments
///
/// A task belongs to the user who created it. Assignees gain operational
/// access (status, assignment, comments, delete) without becoming owners.
///
/// # Status Cycle
///
/// ```text
/// Pending ──► In Progress ──► Completed
///    ▲                            │
///    └────────────────────────────┘
/// ```
///
/// Clients may also jump straight to any status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::{fmt, str::FromStr};
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, task_name, description, priority, task_status, due_date, \
                            category, user_id, board_id, assigned_to, tags, created_at, updated_at";

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    Pending,

    #[sqlx(rename = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,

    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Next status in the toggle cycle
    pub fn next(&self) -> TaskStatus {
        match self {
            TaskStatus::Pending => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }

    /// Resolves the target of a status toggle: explicit value or next in cycle
    pub fn toggle_target(&self, requested: Option<TaskStatus>) -> TaskStatus {
        requested.unwrap_or_else(|| self.next())
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status value: {0}")]
pub struct InvalidStatus(pub String);

impl FromStr for TaskStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority")]
pub enum TaskPriority {
    Low,

    #[default]
    Medium,

    High,
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub task_name: String,

    pub description: String,

    pub priority: TaskPriority,

    pub task_status: TaskStatus,

    pub due_date: Option<DateTime<Utc>>,

    pub category: String,

    /// Owning (creating) user
    pub user_id: Uuid,

    pub board_id: Option<Uuid>,

    /// Assignees in assignment order, without duplicates
    pub assigned_to: Vec<Uuid>,

    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub task_name: String,
    pub description: String,
    pub priority: TaskPriority,
    pub task_status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub category: String,
    pub user_id: Uuid,
    pub board_id: Option<Uuid>,
    pub assigned_to: Vec<Uuid>,
    pub tags: Vec<String>,
}

/// Owner edit of core fields; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    /// `Some(None)` clears the due date
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub category: Option<String>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.task_name.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.category.is_none()
    }
}

/// Removes repeated ids while keeping first-seen order
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

impl Task {
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assigned_to.contains(&user_id)
    }

    /// Owner followed by assignees, each once
    pub fn participants(&self) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(self.assigned_to.len() + 1);
        ids.push(self.user_id);
        ids.extend_from_slice(&self.assigned_to);
        dedup_ids(&ids)
    }

    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (task_name, description, priority, task_status, due_date,
                               category, user_id, board_id, assigned_to, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(data.task_name)
        .bind(data.description)
        .bind(data.priority)
        .bind(data.task_status)
        .bind(data.due_date)
        .bind(data.category)
        .bind(data.user_id)
        .bind(data.board_id)
        .bind(dedup_ids(&data.assigned_to))
        .bind(data.tags)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Tasks the user owns or is assigned to, newest first
    pub async fn list_visible(
        pool: &PgPool,
        user_id: Uuid,
        board_id: Option<Uuid>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {}
            FROM tasks
            WHERE (user_id = $1 OR $1 = ANY(assigned_to))
              AND ($2::uuid IS NULL OR board_id = $2)
            ORDER BY created_at DESC
            "#,
            TASK_COLUMNS
        ))
        .bind(user_id)
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// Applies an owner edit; returns `None` if the task is missing
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(task_name) = data.task_name {
            query.push(", task_name = ").push_bind(task_name);
        }
        if let Some(description) = data.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(priority) = data.priority {
            query.push(", priority = ").push_bind(priority);
        }
        if let Some(due_date) = data.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(category) = data.category {
            query.push(", category = ").push_bind(category);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(TASK_COLUMNS);

        query.build_query_as::<Task>().fetch_optional(pool).await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET task_status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the assignee list (duplicates dropped)
    pub async fn set_assignees(
        pool: &PgPool,
        id: Uuid,
        assignees: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET assigned_to = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(dedup_ids(assignees))
        .fetch_optional(pool)
        .await
    }

    /// Deletes the task and its comments
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Comment on a task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskComment {
    pub id: Uuid,

    pub task_id: Uuid,

    pub user_id: Uuid,

    pub content: String,

    /// Users mentioned in the comment
    pub mentions: Vec<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for adding a comment
#[derive(Debug, Clone)]
pub struct CreateComment {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub mentions: Vec<Uuid>,
}

impl TaskComment {
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let comment = sqlx::query_as::<_, TaskComment>(
            r#"
            INSERT INTO task_comments (task_id, user_id, content, mentions)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, user_id, content, mentions, created_at, updated_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.content)
        .bind(dedup_ids(&data.mentions))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE tasks SET updated_at = NOW() WHERE id = $1")
            .bind(data.task_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(comment)
    }

    /// Comments of one task, oldest first
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        Self::list_for_tasks(pool, &[task_id]).await
    }

    /// Comments of several tasks, oldest first
    pub async fn list_for_tasks(
        pool: &PgPool,
        task_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, TaskComment>(
            r#"
            SELECT id, task_id, user_id, content, mentions, created_at, updated_at
            FROM task_comments
            WHERE task_id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await
    }
}
