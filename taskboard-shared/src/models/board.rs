/// Board model and membership
///
/// A board is a shared space owned by one user. Its member list always
/// starts with the owner (role `owner`); further members join by accepting an
/// invitation. Boards have no delete operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const BOARD_COLUMNS: &str = "id, name, description, owner_id, is_public, allow_comments, \
                             allow_task_assignment, created_at, updated_at";

/// Role of a user within a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "board_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BoardRole {
    /// Creator of the board
    Owner,

    /// May invite other users
    Admin,

    /// Regular member
    Member,
}

impl BoardRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardRole::Owner => "owner",
            BoardRole::Admin => "admin",
            BoardRole::Member => "member",
        }
    }
}

/// Board row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub id: Uuid,

    pub name: String,

    pub description: String,

    pub owner_id: Uuid,

    /// Public boards are readable by any signed-in user
    pub is_public: bool,

    /// Stored setting, not enforced
    pub allow_comments: bool,

    /// Stored setting, not enforced
    pub allow_task_assignment: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Membership row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardMember {
    pub board_id: Uuid,

    pub user_id: Uuid,

    pub role: BoardRole,

    pub joined_at: DateTime<Utc>,
}

/// Input for creating a board
#[derive(Debug, Clone)]
pub struct CreateBoard {
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub is_public: bool,
}

impl Board {
    /// Creates a board and registers its owner as the first member
    pub async fn create(pool: &PgPool, data: CreateBoard) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(&format!(
            r#"
            INSERT INTO boards (name, description, owner_id, is_public)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BOARD_COLUMNS
        ))
        .bind(data.name)
        .bind(data.description)
        .bind(data.owner_id)
        .bind(data.is_public)
        .fetch_one(&mut *tx)
        .await?;

        BoardMember::insert(&mut tx, board.id, board.owner_id, BoardRole::Owner).await?;

        tx.commit().await?;

        Ok(board)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(&format!("SELECT {} FROM boards WHERE id = $1", BOARD_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Loads several boards by id (missing ids are skipped)
    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Board>(&format!(
            "SELECT {} FROM boards WHERE id = ANY($1)",
            BOARD_COLUMNS
        ))
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Boards the user owns or belongs to, most recently updated first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(&format!(
            r#"
            SELECT {}
            FROM boards b
            WHERE b.owner_id = $1
               OR EXISTS (
                   SELECT 1 FROM board_members m
                   WHERE m.board_id = b.id AND m.user_id = $1
               )
            ORDER BY b.updated_at DESC
            "#,
            BOARD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

impl BoardMember {
    /// Adds a member inside an open transaction; a repeated insert is a no-op
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        board_id: Uuid,
        user_id: Uuid,
        role: BoardRole,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO board_members (board_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (board_id, user_id) DO NOTHING
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .bind(role)
        .execute(&mut **tx)
        .await?;

        sqlx::query("UPDATE boards SET updated_at = NOW() WHERE id = $1")
            .bind(board_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Members of one board in join order
    pub async fn list_for_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, BoardMember>(
            r#"
            SELECT board_id, user_id, role, joined_at
            FROM board_members
            WHERE board_id = $1
            ORDER BY joined_at, user_id
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// Members of several boards in join order
    pub async fn list_for_boards(
        pool: &PgPool,
        board_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        if board_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, BoardMember>(
            r#"
            SELECT board_id, user_id, role, joined_at
            FROM board_members
            WHERE board_id = ANY($1)
            ORDER BY joined_at, user_id
            "#,
        )
        .bind(board_ids)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_role_serialization() {
        assert_eq!(serde_json::to_value(BoardRole::Owner).unwrap(), "owner");
        assert_eq!(serde_json::to_value(BoardRole::Admin).unwrap(), "admin");
        assert_eq!(
            serde_json::from_value::<BoardRole>(serde_json::json!("member")).unwrap(),
            BoardRole::Member
        );
    }

    #[test]
    fn test_board_role_as_str() {
        assert_eq!(BoardRole::Owner.as_str(), "owner");
        assert_eq!(BoardRole::Admin.as_str(), "admin");
        assert_eq!(BoardRole::Member.as_str(), "member");
    }
}
