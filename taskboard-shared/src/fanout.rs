/// Notification fanout
///
/// Planning is pure: each function turns one triggering event into the
/// batch of notifications it causes. [`deliver`] then writes the batch in a
/// single insert after the primary mutation has committed.
///
/// # Recipients
///
/// | Event          | Recipients                                              |
/// |----------------|---------------------------------------------------------|
/// | Task created   | every initial assignee                                  |
/// | Reassignment   | ids not previously assigned                             |
/// | Status change  | owner and assignees, minus the actor                    |
/// | Comment        | mentioned users, then other participants, minus author  |
/// | Invitation     | the invitee                                             |
/// | Member joined  | the board owner                                         |
///
/// Every recipient appears at most once per event. Delivery is best-effort:
/// a failed insert is logged and never fails the request.
///
/// # Example
///
/// ```
/// use taskboard_shared::fanout::newly_assigned;
/// use uuid::Uuid;
///
/// let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
/// assert_eq!(newly_assigned(&[a], &[a, b]), vec![b]);
/// ```

use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    board::Board,
    notification::{NewNotification, Notification, NotificationData, NotificationType},
    task::{dedup_ids, Task, TaskStatus},
};

/// Ids present in `new` but not in `old`, in `new` order
pub fn newly_assigned(old: &[Uuid], new: &[Uuid]) -> Vec<Uuid> {
    dedup_ids(new)
        .into_iter()
        .filter(|id| !old.contains(id))
        .collect()
}

/// `task_assigned` for each recipient
///
/// The actor is not excluded: self-assignment notifies the assigner too.
pub fn task_assigned(
    task: &Task,
    recipients: &[Uuid],
    actor_id: Uuid,
    include_board: bool,
) -> Vec<NewNotification> {
    dedup_ids(recipients)
        .into_iter()
        .map(|user_id| NewNotification {
            user_id,
            kind: NotificationType::TaskAssigned,
            title: "Task Assigned".to_string(),
            message: format!("You have been assigned to \"{}\"", task.task_name),
            data: NotificationData {
                task_id: Some(task.id),
                board_id: if include_board { task.board_id } else { None },
                user_id: Some(actor_id),
                ..Default::default()
            },
        })
        .collect()
}

/// `task_status_changed` for owner and assignees other than the actor
///
/// Empty when the status did not change.
pub fn status_changed(task: &Task, old_status: TaskStatus, actor_id: Uuid) -> Vec<NewNotification> {
    let new_status = task.task_status;
    if old_status == new_status {
        return Vec::new();
    }

    task.participants()
        .into_iter()
        .filter(|id| *id != actor_id)
        .map(|user_id| NewNotification {
            user_id,
            kind: NotificationType::TaskStatusChanged,
            title: "Task Status Updated".to_string(),
            message: format!(
                "\"{}\" status changed from {} to {}",
                task.task_name, old_status, new_status
            ),
            data: NotificationData {
                task_id: Some(task.id),
                user_id: Some(actor_id),
                old_value: Some(old_status.to_string()),
                new_value: Some(new_status.to_string()),
                ..Default::default()
            },
        })
        .collect()
}

/// `task_comment_added` for mentioned users and remaining participants
///
/// Mentioned users get the "mentioned you" variant; owner and assignees who
/// were not mentioned get "commented on". The author never hears about
/// their own comment.
pub fn comment_added(
    task: &Task,
    author_id: Uuid,
    author_name: &str,
    mentions: &[Uuid],
) -> Vec<NewNotification> {
    let mentioned = dedup_ids(mentions);

    let comment = |user_id: Uuid, message: String| NewNotification {
        user_id,
        kind: NotificationType::TaskCommentAdded,
        title: "Task Comment".to_string(),
        message,
        data: NotificationData {
            task_id: Some(task.id),
            user_id: Some(author_id),
            ..Default::default()
        },
    };

    let mut batch: Vec<NewNotification> = mentioned
        .iter()
        .filter(|id| **id != author_id)
        .map(|id| {
            comment(
                *id,
                format!("{} mentioned you in \"{}\"", author_name, task.task_name),
            )
        })
        .collect();

    batch.extend(
        task.participants()
            .into_iter()
            .filter(|id| *id != author_id && !mentioned.contains(id))
            .map(|id| {
                comment(
                    id,
                    format!("{} commented on \"{}\"", author_name, task.task_name),
                )
            }),
    );

    batch
}

/// `board_invitation` for the invitee
pub fn board_invitation(board: &Board, invitee_id: Uuid, inviter_id: Uuid) -> NewNotification {
    NewNotification {
        user_id: invitee_id,
        kind: NotificationType::BoardInvitation,
        title: "Board Invitation".to_string(),
        message: format!("You have been invited to join \"{}\"", board.name),
        data: NotificationData {
            board_id: Some(board.id),
            user_id: Some(inviter_id),
            ..Default::default()
        },
    }
}

/// `board_member_joined` for the board owner
pub fn member_joined(board: &Board, member_id: Uuid, member_name: &str) -> NewNotification {
    NewNotification {
        user_id: board.owner_id,
        kind: NotificationType::BoardMemberJoined,
        title: "New Board Member".to_string(),
        message: format!("{} joined \"{}\"", member_name, board.name),
        data: NotificationData {
            board_id: Some(board.id),
            user_id: Some(member_id),
            ..Default::default()
        },
    }
}

/// Writes a planned batch; failures are logged, not returned
pub async fn deliver(pool: &PgPool, batch: Vec<NewNotification>) {
    if batch.is_empty() {
        return;
    }

    let kind = batch[0].kind;
    match Notification::insert_many(pool, &batch).await {
        Ok(stored) => debug!(
            kind = kind.as_str(),
            planned = batch.len(),
            stored,
            "Notifications delivered"
        ),
        Err(e) => warn!(
            kind = kind.as_str(),
            planned = batch.len(),
            error = %e,
            "Notification delivery failed"
        ),
    }
}
