/// Board invitations
///
/// # State Machine
///
/// ```text
/// pending ──► accepted
///    │
///    ├──────► declined
///    │
///    └──────► expired   (time-based)
/// ```
///
/// Accepted, declined and expired are terminal. Only the invited user may
/// respond. An invitation stops existing once `expires_at` passes: lookups
/// ignore it and the background sweep deletes it, so the `expired` status is
/// never written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::board::{BoardMember, BoardRole};

const INVITATION_COLUMNS: &str = "id, board_id, invited_by, invited_user, role, status, \
                                  message, expires_at, created_at, updated_at";

/// Role granted on acceptance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationRole {
    Admin,

    #[default]
    Member,
}

impl From<InvitationRole> for BoardRole {
    fn from(role: InvitationRole) -> Self {
        match role {
            InvitationRole::Admin => BoardRole::Admin,
            InvitationRole::Member => BoardRole::Member,
        }
    }
}

/// Invitation lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,

    Accepted,

    Declined,

    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }

    pub fn can_transition_to(&self, target: InvitationStatus) -> bool {
        matches!(
            (self, target),
            (InvitationStatus::Pending, InvitationStatus::Accepted)
                | (InvitationStatus::Pending, InvitationStatus::Declined)
                | (InvitationStatus::Pending, InvitationStatus::Expired)
        )
    }
}

/// Why a response to an invitation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvitationError {
    /// Caller is not the invited user
    #[error("Access denied")]
    NotInvitee,

    /// Invitation already left the pending state
    #[error("Invitation is no longer valid")]
    NoLongerValid,
}

/// Invitation row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardInvitation {
    pub id: Uuid,

    pub board_id: Uuid,

    pub invited_by: Uuid,

    pub invited_user: Uuid,

    pub role: InvitationRole,

    pub status: InvitationStatus,

    pub message: String,

    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating an invitation
#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub board_id: Uuid,
    pub invited_by: Uuid,
    pub invited_user: Uuid,
    pub role: InvitationRole,
    pub message: String,
}

impl BoardInvitation {
    /// Checks that `user_id` may move this invitation to `target`
    pub fn check_response(
        &self,
        user_id: Uuid,
        target: InvitationStatus,
    ) -> Result<(), InvitationError> {
        if self.invited_user != user_id {
            return Err(InvitationError::NotInvitee);
        }

        if !self.status.can_transition_to(target) {
            return Err(InvitationError::NoLongerValid);
        }

        Ok(())
    }

    /// Creates a pending invitation expiring in seven days
    ///
    /// An expired invitation for the same pair that the sweeper has not yet
    /// removed is deleted in the same transaction.
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `uq_board_invitations_pending` if the
    /// user already has a live pending invitation for this board.
    pub async fn create(pool: &PgPool, data: CreateInvitation) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM board_invitations
            WHERE board_id = $1 AND invited_user = $2
              AND status = 'pending' AND expires_at <= NOW()
            "#,
        )
        .bind(data.board_id)
        .bind(data.invited_user)
        .execute(&mut *tx)
        .await?;

        let invitation = sqlx::query_as::<_, BoardInvitation>(&format!(
            r#"
            INSERT INTO board_invitations (board_id, invited_by, invited_user, role, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        ))
        .bind(data.board_id)
        .bind(data.invited_by)
        .bind(data.invited_user)
        .bind(data.role)
        .bind(data.message)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(invitation)
    }

    /// Finds a live (unexpired) invitation
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BoardInvitation>(&format!(
            "SELECT {} FROM board_invitations WHERE id = $1 AND expires_at > NOW()",
            INVITATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Whether the user already has a live pending invitation for the board
    pub async fn has_pending(
        pool: &PgPool,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM board_invitations
                WHERE board_id = $1 AND invited_user = $2
                  AND status = 'pending' AND expires_at > NOW()
            )
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Live pending invitations addressed to the user, newest first
    pub async fn list_pending_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BoardInvitation>(&format!(
            r#"
            SELECT {}
            FROM board_invitations
            WHERE invited_user = $1 AND status = 'pending' AND expires_at > NOW()
            ORDER BY created_at DESC
            "#,
            INVITATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Accepts the invitation and adds the invitee to the board
    ///
    /// Both writes share one transaction. Returns `None` (and changes nothing)
    /// if the invitation left the pending state concurrently.
    pub async fn accept(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let accepted = sqlx::query_as::<_, BoardInvitation>(&format!(
            r#"
            UPDATE board_invitations
            SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND status = 'pending' AND expires_at > NOW()
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(invitation) = accepted else {
            tx.rollback().await?;
            return Ok(None);
        };

        BoardMember::insert(
            &mut tx,
            invitation.board_id,
            invitation.invited_user,
            invitation.role.into(),
        )
        .await?;

        tx.commit().await?;

        Ok(Some(invitation))
    }

    /// Declines a pending invitation; `None` if it is no longer pending
    pub async fn decline(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BoardInvitation>(&format!(
            r#"
            UPDATE board_invitations
            SET status = 'declined', updated_at = NOW()
            WHERE id = $1 AND status = 'pending' AND expires_at > NOW()
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Deletes every invitation whose expiry has passed
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM board_invitations WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
