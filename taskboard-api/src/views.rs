/// Response bodies
///
/// Rows are returned "populated": foreign keys to users, boards and tasks are
/// replaced by small embedded objects, and ids are exposed as `_id`. Every
/// endpoint returning a task, board, invitation or notification goes through
/// the builders here so the shapes stay consistent.
///
/// A reference to a record that no longer exists renders as `null`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use taskboard_shared::models::{
    board::{Board, BoardMember, BoardRole},
    invitation::{BoardInvitation, InvitationRole, InvitationStatus},
    notification::{Notification, NotificationType},
    task::{Task, TaskComment, TaskPriority, TaskStatus},
    user::UserSummary,
};
use uuid::Uuid;

/// User summaries keyed by id
#[derive(Debug, Default)]
struct Users(HashMap<Uuid, UserSummary>);

impl Users {
    async fn load(pool: &PgPool, ids: impl IntoIterator<Item = Uuid>) -> Result<Self, sqlx::Error> {
        let mut ids: Vec<Uuid> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let summaries = UserSummary::find_many(pool, &ids).await?;
        Ok(Self(summaries.into_iter().map(|u| (u.id, u)).collect()))
    }

    fn get(&self, id: &Uuid) -> Option<UserSummary> {
        self.0.get(id).cloned()
    }

    /// Known users in `ids` order; unknown ids are dropped
    fn list(&self, ids: &[Uuid]) -> Vec<UserSummary> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }
}

/// Board embedded in a task
#[derive(Debug, Clone, Serialize)]
pub struct BoardRef {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub name: String,
}

/// Comment with its author
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub user: Option<UserSummary>,

    pub content: String,

    pub mentions: Vec<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl CommentView {
    fn build(comment: TaskComment, users: &Users) -> Self {
        Self {
            id: comment.id,
            user: users.get(&comment.user_id),
            content: comment.content,
            mentions: comment.mentions,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }

    pub async fn populate(pool: &PgPool, comments: Vec<TaskComment>) -> Result<Vec<Self>, sqlx::Error> {
        let users = Users::load(pool, comments.iter().map(|c| c.user_id)).await?;
        Ok(comments.into_iter().map(|c| Self::build(c, &users)).collect())
    }
}

/// Task with owner, assignees, board and comments
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub task_name: String,

    pub description: String,

    pub priority: TaskPriority,

    pub task_status: TaskStatus,

    pub due_date: Option<DateTime<Utc>>,

    pub category: String,

    pub user: Option<UserSummary>,

    pub board: Option<BoardRef>,

    pub assigned_to: Vec<UserSummary>,

    pub comments: Vec<CommentView>,

    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    /// Populates a batch of tasks with a fixed number of queries
    pub async fn populate(pool: &PgPool, tasks: Vec<Task>) -> Result<Vec<Self>, sqlx::Error> {
        let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        let comments = TaskComment::list_for_tasks(pool, &task_ids).await?;

        let board_ids: Vec<Uuid> = tasks.iter().filter_map(|t| t.board_id).collect();
        let boards: HashMap<Uuid, BoardRef> = Board::find_many(pool, &board_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, BoardRef { id: b.id, name: b.name }))
            .collect();

        let user_ids = tasks
            .iter()
            .flat_map(|t| std::iter::once(t.user_id).chain(t.assigned_to.iter().copied()))
            .chain(comments.iter().map(|c| c.user_id));
        let users = Users::load(pool, user_ids).await?;

        let mut comments_by_task: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
        for comment in comments {
            comments_by_task
                .entry(comment.task_id)
                .or_default()
                .push(CommentView::build(comment, &users));
        }

        Ok(tasks
            .into_iter()
            .map(|task| Self {
                id: task.id,
                user: users.get(&task.user_id),
                board: task.board_id.and_then(|id| boards.get(&id).cloned()),
                assigned_to: users.list(&task.assigned_to),
                comments: comments_by_task.remove(&task.id).unwrap_or_default(),
                task_name: task.task_name,
                description: task.description,
                priority: task.priority,
                task_status: task.task_status,
                due_date: task.due_date,
                category: task.category,
                tags: task.tags,
                created_at: task.created_at,
                updated_at: task.updated_at,
            })
            .collect())
    }

    pub async fn populate_one(pool: &PgPool, task: Task) -> Result<Self, sqlx::Error> {
        Self::populate(pool, vec![task])
            .await?
            .pop()
            .ok_or(sqlx::Error::RowNotFound)
    }
}

/// Board member with user details
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user: Option<UserSummary>,

    pub role: BoardRole,

    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSettings {
    pub allow_comments: bool,

    pub allow_task_assignment: bool,
}

/// Board with owner and members
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub name: String,

    pub description: String,

    pub owner: Option<UserSummary>,

    pub members: Vec<MemberView>,

    pub is_public: bool,

    pub settings: BoardSettings,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl BoardView {
    pub async fn populate(pool: &PgPool, boards: Vec<Board>) -> Result<Vec<Self>, sqlx::Error> {
        let board_ids: Vec<Uuid> = boards.iter().map(|b| b.id).collect();
        let members = BoardMember::list_for_boards(pool, &board_ids).await?;

        let user_ids = boards
            .iter()
            .map(|b| b.owner_id)
            .chain(members.iter().map(|m| m.user_id));
        let users = Users::load(pool, user_ids).await?;

        let mut members_by_board: HashMap<Uuid, Vec<MemberView>> = HashMap::new();
        for member in members {
            members_by_board
                .entry(member.board_id)
                .or_default()
                .push(MemberView {
                    user: users.get(&member.user_id),
                    role: member.role,
                    joined_at: member.joined_at,
                });
        }

        Ok(boards
            .into_iter()
            .map(|board| Self {
                id: board.id,
                owner: users.get(&board.owner_id),
                members: members_by_board.remove(&board.id).unwrap_or_default(),
                is_public: board.is_public,
                settings: BoardSettings {
                    allow_comments: board.allow_comments,
                    allow_task_assignment: board.allow_task_assignment,
                },
                name: board.name,
                description: board.description,
                created_at: board.created_at,
                updated_at: board.updated_at,
            })
            .collect())
    }

    pub async fn populate_one(pool: &PgPool, board: Board) -> Result<Self, sqlx::Error> {
        Self::populate(pool, vec![board])
            .await?
            .pop()
            .ok_or(sqlx::Error::RowNotFound)
    }
}

/// Board embedded in an invitation
#[derive(Debug, Clone, Serialize)]
pub struct InvitationBoard {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub name: String,

    pub description: String,
}

/// Pending invitation with board and inviter
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationView {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub board: Option<InvitationBoard>,

    pub invited_by: Option<UserSummary>,

    pub invited_user: Uuid,

    pub role: InvitationRole,

    pub status: InvitationStatus,

    pub message: String,

    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl InvitationView {
    pub async fn populate(
        pool: &PgPool,
        invitations: Vec<BoardInvitation>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let board_ids: Vec<Uuid> = invitations.iter().map(|i| i.board_id).collect();
        let boards: HashMap<Uuid, InvitationBoard> = Board::find_many(pool, &board_ids)
            .await?
            .into_iter()
            .map(|b| {
                (
                    b.id,
                    InvitationBoard {
                        id: b.id,
                        name: b.name,
                        description: b.description,
                    },
                )
            })
            .collect();

        let users = Users::load(pool, invitations.iter().map(|i| i.invited_by)).await?;

        Ok(invitations
            .into_iter()
            .map(|inv| Self {
                id: inv.id,
                board: boards.get(&inv.board_id).cloned(),
                invited_by: users.get(&inv.invited_by),
                invited_user: inv.invited_user,
                role: inv.role,
                status: inv.status,
                message: inv.message,
                expires_at: inv.expires_at,
                created_at: inv.created_at,
                updated_at: inv.updated_at,
            })
            .collect())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub task_name: String,
}

/// Notification payload with references resolved
///
/// A key is omitted when the event carried no such reference and `null`
/// when the referenced record has since been deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDataView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Option<TaskRef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<Option<BoardRef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Option<UserSummary>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub user: Uuid,

    #[serde(rename = "type")]
    pub kind: NotificationType,

    pub title: String,

    pub message: String,

    pub data: NotificationDataView,

    pub is_read: bool,

    pub read_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl From<Notification> for NotificationView {
    fn from(n: Notification) -> Self {
        let data = n.data.0;

        let task_id = data.task_id.map(|id| {
            n.task_name.map(|task_name| TaskRef { id, task_name })
        });
        let board_id = data.board_id.map(|id| n.board_name.map(|name| BoardRef { id, name }));
        let user_id = data.user_id.map(|id| {
            n.actor_name.map(|name| UserSummary {
                id,
                name,
                email: n.actor_email.unwrap_or_default(),
                avatar: n.actor_avatar.unwrap_or_default(),
            })
        });

        Self {
            id: n.id,
            user: n.user_id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            data: NotificationDataView {
                task_id,
                board_id,
                user_id,
                old_value: data.old_value,
                new_value: data.new_value,
            },
            is_read: n.is_read,
            read_at: n.read_at,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}
