/// Notification inbox endpoints
///
/// # Endpoints
///
/// - `GET /api/notifications?page=&limit=&unreadOnly=` - One page, newest first
/// - `GET /api/notifications/unread-count` - Number of unread notifications
/// - `PUT /api/notifications/:id/read` - Mark one as read
/// - `PUT /api/notifications/mark-all-read` - Mark all as read
/// - `DELETE /api/notifications/:id` - Delete one
///
/// Every operation is scoped to the caller's own notifications; someone
/// else's notification id answers 404.

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::notification::{Notification, NotificationQuery},
};
use tracing::debug;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{PathId, QueryParams},
    routes::auth::MessageResponse,
    views::NotificationView,
};

pub const DEFAULT_PAGE: i64 = 1;

pub const DEFAULT_LIMIT: i64 = 20;

/// Largest page size served
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub unread_only: Option<bool>,
}

/// Page request with defaults applied and bounds enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn from_query(query: &ListQuery) -> Self {
        Self {
            page: query.page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Rows to skip; saturates so far-out pages read as empty
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed for `total` items
    pub fn pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<NotificationView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: i64,
}

/// List handler
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    QueryParams(query): QueryParams<ListQuery>,
) -> ApiResult<Json<NotificationList>> {
    let page = Page::from_query(&query);

    let (notifications, total) = Notification::list(
        &state.db,
        NotificationQuery {
            user_id: auth.user_id,
            unread_only: query.unread_only.unwrap_or(false),
            limit: page.limit,
            offset: page.offset(),
        },
    )
    .await?;

    Ok(Json(NotificationList {
        notifications: notifications.into_iter().map(NotificationView::from).collect(),
        pagination: Pagination {
            page: page.page,
            limit: page.limit,
            total,
            pages: page.pages(total),
        },
    }))
}

/// Unread count handler
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UnreadCount>> {
    let count = Notification::unread_count(&state.db, auth.user_id).await?;
    Ok(Json(UnreadCount { count }))
}

/// Mark-as-read handler
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(id): PathId,
) -> ApiResult<Json<MessageResponse>> {
    if !Notification::mark_read(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }

    Ok(MessageResponse::new("Notification marked as read"))
}

/// Mark-all-as-read handler
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MessageResponse>> {
    let updated = Notification::mark_all_read(&state.db, auth.user_id).await?;
    debug!(user_id = %auth.user_id, updated, "Notifications marked as read");

    Ok(MessageResponse::new("All notifications marked as read"))
}

/// Delete handler
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(id): PathId,
) -> ApiResult<Json<MessageResponse>> {
    if !Notification::delete(&state.db, id, auth.user_id).await? {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }

    Ok(MessageResponse::new("Notification deleted"))
}
