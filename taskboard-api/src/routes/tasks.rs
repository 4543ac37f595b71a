/// Task endpoints
///
/// # Endpoints
///
/// - `POST /api/task` - Create a task, optionally on a board
/// - `GET /api/task?boardId=` - Tasks the caller owns or is assigned to
/// - `GET /api/task/:id` - One task (owner only)
/// - `PUT /api/task/:id` - Edit core fields (owner only)
/// - `PATCH /api/task/:id/status` - Set or cycle the status
/// - `PATCH /api/task/:id/assign` - Replace the assignee list
/// - `DELETE /api/task/:id` - Delete the task
/// - `POST /api/task/:id/comments` - Add a comment
/// - `GET /api/task/:id/comments` - List comments
///
/// # Access
///
/// Reading a single task and editing it are reserved to the owner. Status
/// changes, assignment, comments and deletion are open to the owner and
/// every assignee. See [`taskboard_shared::auth::authorization`].

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use taskboard_shared::{
    auth::{
        authorization::{authorize_board, authorize_task, BoardAction, TaskAction},
        middleware::AuthContext,
    },
    fanout,
    models::{
        board::Board,
        task::{CreateComment, CreateTask, Task, TaskComment, TaskPriority, TaskStatus, UpdateTask},
        user::User,
    },
};
use tracing::info;
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{JsonBody, PathId, QueryParams},
    routes::{auth::MessageResponse, boards::load_board},
    views::{CommentView, TaskView},
};

/// Category given to tasks created without one
pub const DEFAULT_CATEGORY: &str = "General";

/// Absent → `None`, `null` → `Some(None)`, value → `Some(Some(v))`
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parses a due date sent as RFC 3339 or as a plain `YYYY-MM-DD` date
///
/// An empty string means "no due date".
pub fn parse_due_date(raw: &str) -> ApiResult<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Some(naive.and_utc()))
        .ok_or_else(|| ApiError::BadRequest("Invalid due date!".to_string()))
}

/// Create task request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub task_status: Option<TaskStatus>,
    pub due_date: Option<String>,
    pub category: Option<String>,
    pub board_id: Option<Uuid>,
    pub assigned_to: Option<Vec<Uuid>>,
    pub tags: Option<Vec<String>>,
}

/// Owner edit request; omitted fields stay as they are
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,

    /// `null` or `""` clears the due date
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,

    pub category: Option<String>,
}

impl UpdateTaskRequest {
    pub fn into_update(self) -> ApiResult<UpdateTask> {
        let due_date = match self.due_date {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) => Some(parse_due_date(&raw)?),
        };

        Ok(UpdateTask {
            task_name: self.task_name,
            description: self.description,
            priority: self.priority,
            due_date,
            category: self.category,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub board_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

impl StatusRequest {
    /// Explicit target status, if one was sent
    ///
    /// Runs before the task is looked up.
    pub fn requested(&self) -> ApiResult<Option<TaskStatus>> {
        match self.status.as_deref().filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<TaskStatus>()
                .map(Some)
                .map_err(|_| ApiError::BadRequest("Invalid status value!".to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub user_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
    pub mentions: Option<Vec<Uuid>>,
}

#[derive(Debug, serde::Serialize)]
pub struct CreatedTask {
    pub task: TaskView,
}

async fn find_task(state: &AppState, id: Uuid, not_found: &str) -> ApiResult<Task> {
    Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(not_found.to_string()))
}

/// Loads a board and checks a board-level action for the caller
async fn guard_board(
    state: &AppState,
    board_id: Uuid,
    user_id: Uuid,
    action: BoardAction,
) -> ApiResult<Board> {
    let (board, members) = load_board(state, board_id).await?;
    authorize_board(&board, &members, user_id, action)?;

    Ok(board)
}

/// Create task handler
///
/// Notifies every initial assignee.
///
/// # Errors
///
/// - `400 Bad Request`: Missing task name or malformed due date
/// - `404 Not Found`: `boardId` names no board
/// - `403 Forbidden`: Caller is neither owner nor member of the board
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    JsonBody(req): JsonBody<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<CreatedTask>)> {
    let task_name = req
        .task_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Task name is required!".to_string()))?;

    if let Some(board_id) = req.board_id {
        guard_board(&state, board_id, auth.user_id, BoardAction::AddTask).await?;
    }

    let due_date = match req.due_date.as_deref() {
        Some(raw) => parse_due_date(raw)?,
        None => None,
    };

    let task = Task::create(
        &state.db,
        CreateTask {
            task_name,
            description: req.description.unwrap_or_default(),
            priority: req.priority.unwrap_or_default(),
            task_status: req.task_status.unwrap_or(TaskStatus::Pending),
            due_date,
            category: req
                .category
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            user_id: auth.user_id,
            board_id: req.board_id,
            assigned_to: req.assigned_to.unwrap_or_default(),
            tags: req.tags.unwrap_or_default(),
        },
    )
    .await?;

    info!(task_id = %task.id, user_id = %auth.user_id, "Task created");

    let batch = fanout::task_assigned(&task, &task.assigned_to, auth.user_id, true);
    fanout::deliver(&state.db, batch).await;

    let task = TaskView::populate_one(&state.db, task).await?;
    Ok((StatusCode::CREATED, Json(CreatedTask { task })))
}

/// List tasks handler
///
/// # Errors
///
/// - `404 Not Found`: `boardId` names no board
/// - `403 Forbidden`: Board is private and caller is not owner or member
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    QueryParams(query): QueryParams<ListTasksQuery>,
) -> ApiResult<Json<Vec<TaskView>>> {
    if let Some(board_id) = query.board_id {
        guard_board(&state, board_id, auth.user_id, BoardAction::ListTasks).await?;
    }

    let tasks = Task::list_visible(&state.db, auth.user_id, query.board_id).await?;
    Ok(Json(TaskView::populate(&state.db, tasks).await?))
}

/// Get task handler (owner only)
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(id): PathId,
) -> ApiResult<Json<TaskView>> {
    let task = find_task(&state, id, "Task not found!").await?;
    authorize_task(&task, auth.user_id, TaskAction::View)?;

    Ok(Json(TaskView::populate_one(&state.db, task).await?))
}

/// Update task handler (owner only)
///
/// A missing task answers the same 403 as someone else's task.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(id): PathId,
    JsonBody(req): JsonBody<UpdateTaskRequest>,
) -> ApiResult<Json<TaskView>> {
    let denied = || ApiError::Forbidden(TaskAction::Edit.denial_message().to_string());

    let task = Task::find_by_id(&state.db, id).await?.ok_or_else(denied)?;
    authorize_task(&task, auth.user_id, TaskAction::Edit)?;

    let update = req.into_update()?;
    let task = Task::update(&state.db, task.id, update)
        .await?
        .ok_or_else(denied)?;

    info!(task_id = %task.id, user_id = %auth.user_id, "Task updated");

    Ok(Json(TaskView::populate_one(&state.db, task).await?))
}

/// Status handler
///
/// Sets the requested status, or advances Pending → In Progress →
/// Completed → Pending when none is given. Owner and assignees other than
/// the caller are notified when the status actually changes.
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status value
/// - `404 Not Found`: No such task
/// - `403 Forbidden`: Caller is neither owner nor assignee
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(id): PathId,
    JsonBody(req): JsonBody<StatusRequest>,
) -> ApiResult<Json<TaskView>> {
    let requested = req.requested()?;

    let task = find_task(&state, id, "Task not found").await?;
    authorize_task(&task, auth.user_id, TaskAction::ChangeStatus)?;

    let old_status = task.task_status;
    let new_status = old_status.toggle_target(requested);

    let task = Task::set_status(&state.db, task.id, new_status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    info!(
        task_id = %task.id,
        user_id = %auth.user_id,
        from = %old_status,
        to = %new_status,
        "Task status changed"
    );

    fanout::deliver(&state.db, fanout::status_changed(&task, old_status, auth.user_id)).await;

    Ok(Json(TaskView::populate_one(&state.db, task).await?))
}

/// Assignment handler
///
/// Replaces the assignee list; only newly added users are notified.
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(id): PathId,
    JsonBody(req): JsonBody<AssignRequest>,
) -> ApiResult<Json<TaskView>> {
    let task = find_task(&state, id, "Task not found").await?;
    authorize_task(&task, auth.user_id, TaskAction::Assign)?;

    let user_ids = req.user_ids.unwrap_or_default();
    let added = fanout::newly_assigned(&task.assigned_to, &user_ids);

    let task = Task::set_assignees(&state.db, task.id, &user_ids)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    info!(
        task_id = %task.id,
        user_id = %auth.user_id,
        assignees = task.assigned_to.len(),
        added = added.len(),
        "Task assignees updated"
    );

    fanout::deliver(&state.db, fanout::task_assigned(&task, &added, auth.user_id, false)).await;

    Ok(Json(TaskView::populate_one(&state.db, task).await?))
}

/// Delete task handler
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(id): PathId,
) -> ApiResult<Json<MessageResponse>> {
    let task = find_task(&state, id, "Task not found").await?;
    authorize_task(&task, auth.user_id, TaskAction::Delete)?;

    Task::delete(&state.db, task.id).await?;
    info!(task_id = %task.id, user_id = %auth.user_id, "Task deleted");

    Ok(MessageResponse::new("Task deleted successfully"))
}

/// Add comment handler
///
/// Mentioned users hear "mentioned you"; the remaining owner and assignees
/// hear "commented on". The author is never notified.
///
/// # Errors
///
/// - `400 Bad Request`: Empty content
/// - `404 Not Found`: No such task
/// - `403 Forbidden`: Caller is neither owner nor assignee
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(id): PathId,
    JsonBody(req): JsonBody<CommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    let content = req
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Comment content is required".to_string()))?;

    let task = find_task(&state, id, "Task not found").await?;
    authorize_task(&task, auth.user_id, TaskAction::Comment)?;

    let author = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found!".to_string()))?;

    let comment = TaskComment::create(
        &state.db,
        CreateComment {
            task_id: task.id,
            user_id: author.id,
            content,
            mentions: req.mentions.unwrap_or_default(),
        },
    )
    .await?;

    info!(
        task_id = %task.id,
        comment_id = %comment.id,
        mentions = comment.mentions.len(),
        "Comment added"
    );

    let batch = fanout::comment_added(&task, author.id, &author.name, &comment.mentions);
    fanout::deliver(&state.db, batch).await;

    let view = CommentView::populate(&state.db, vec![comment])
        .await?
        .pop()
        .ok_or_else(|| ApiError::InternalError("Comment vanished after insert".to_string()))?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// List comments handler
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(id): PathId,
) -> ApiResult<Json<Vec<CommentView>>> {
    let task = find_task(&state, id, "Task not found").await?;
    authorize_task(&task, auth.user_id, TaskAction::ReadComments)?;

    let comments = TaskComment::list_for_task(&state.db, task.id).await?;
    Ok(Json(CommentView::populate(&state.db, comments).await?))
}
