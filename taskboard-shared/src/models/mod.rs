/// Database models for Taskboard
///
/// Each model owns its SQL. Queries are built at runtime with
/// `sqlx::query_as` so the crate compiles without a live database.
///
/// # Models
///
/// - `user`: Accounts and profile pictures
/// - `board`: Boards and their members
/// - `invitation`: Board invitations and their state machine
/// - `task`: Tasks, status cycle and comments
/// - `notification`: Per-user notification log
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::board::{Board, CreateBoard};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(owner_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let board = Board::create(&pool, CreateBoard {
///     name: "Launch".to_string(),
///     description: String::new(),
///     owner_id,
///     is_public: false,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod board;
pub mod invitation;
pub mod notification;
pub mod task;
pub mod user;
