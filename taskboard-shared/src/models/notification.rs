/// Notification log
///
/// Notifications are written as a side effect of board and task mutations
/// and read, marked or deleted only by their recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str =
    "n.id, n.user_id, n.kind, n.title, n.message, n.data, n.is_read, n.read_at, n.created_at, n.updated_at";

/// Event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskAssigned,

    TaskStatusChanged,

    TaskCommentAdded,

    /// Declared, no producer yet
    TaskDueDateChanged,

    BoardInvitation,

    BoardMemberJoined,

    /// Declared, no producer yet
    BoardMemberLeft,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TaskAssigned => "task_assigned",
            NotificationType::TaskStatusChanged => "task_status_changed",
            NotificationType::TaskCommentAdded => "task_comment_added",
            NotificationType::TaskDueDateChanged => "task_due_date_changed",
            NotificationType::BoardInvitation => "board_invitation",
            NotificationType::BoardMemberJoined => "board_member_joined",
            NotificationType::BoardMemberLeft => "board_member_left",
        }
    }
}

/// Event payload stored as JSONB
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<Uuid>,

    /// Acting user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

/// Notification row joined with the names its payload refers to
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    pub kind: NotificationType,

    pub title: String,

    pub message: String,

    pub data: Json<NotificationData>,

    pub is_read: bool,

    pub read_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Acting user's name, email and avatar (absent if deleted)
    pub actor_name: Option<String>,

    pub actor_email: Option<String>,

    pub actor_avatar: Option<String>,

    /// Referenced board's name (absent if deleted)
    pub board_name: Option<String>,

    /// Referenced task's name (absent if deleted)
    pub task_name: Option<String>,
}

/// Notification to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
}

/// Listing filter
#[derive(Debug, Clone, Copy)]
pub struct NotificationQuery {
    pub user_id: Uuid,
    pub unread_only: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Notification {
    /// Inserts a batch in one statement, returning the number stored
    ///
    /// Recipients that no longer exist are skipped.
    pub async fn insert_many(pool: &PgPool, batch: &[NewNotification]) -> Result<u64, sqlx::Error> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO notifications (user_id, kind, title, message, data) \
             SELECT v.user_id, v.kind, v.title, v.message, v.data FROM (",
        );

        query.push_values(batch, |mut row, n| {
            row.push_bind(n.user_id)
                .push_bind(n.kind)
                .push_bind(n.title.as_str())
                .push_bind(n.message.as_str())
                .push_bind(Json(&n.data));
        });

        query.push(
            ") AS v(user_id, kind, title, message, data) \
             WHERE EXISTS (SELECT 1 FROM users u WHERE u.id = v.user_id)",
        );

        let result = query.build().execute(pool).await?;

        Ok(result.rows_affected())
    }

    /// One page of the recipient's notifications, newest first, with the total count
    pub async fn list(pool: &PgPool, q: NotificationQuery) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {},
                   a.name AS actor_name, a.email AS actor_email, a.avatar AS actor_avatar,
                   b.name AS board_name, t.task_name AS task_name
            FROM notifications n
            LEFT JOIN users a ON a.id = (n.data->>'userId')::uuid
            LEFT JOIN boards b ON b.id = (n.data->>'boardId')::uuid
            LEFT JOIN tasks t ON t.id = (n.data->>'taskId')::uuid
            WHERE n.user_id = $1 AND (NOT $2 OR n.is_read = FALSE)
            ORDER BY n.created_at DESC, n.id
            LIMIT $3 OFFSET $4
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(q.user_id)
        .bind(q.unread_only)
        .bind(q.limit)
        .bind(q.offset)
        .fetch_all(pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)",
        )
        .bind(q.user_id)
        .bind(q.unread_only)
        .fetch_one(pool)
        .await?;

        Ok((notifications, total))
    }

    pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Marks one of the user's notifications read; false if none matched
    pub async fn mark_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks every unread notification of the user read
    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = NOW(), updated_at = NOW()
            WHERE user_id = $1 AND is_read = FALSE
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes one of the user's notifications; false if none matched
    pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
