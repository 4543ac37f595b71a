/// Capability checks for boards and tasks
///
/// Every access decision is made here over already-loaded records, so
/// handlers never re-derive membership logic themselves.
///
/// # Board Rules
///
/// | Action     | Owner | Admin | Member | Public board |
/// |------------|-------|-------|--------|--------------|
/// | View       | ✓     | ✓     | ✓      | ✓            |
/// | ListTasks  | ✓     | ✓     | ✓      | ✓            |
/// | AddTask    | ✓     | ✓     | ✓      |              |
/// | Invite     | ✓     | ✓     |        |              |
///
/// # Task Rules
///
/// `View` and `Edit` are owner-only. Every other action is allowed to the
/// owner and to any assignee.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::authorization::{TaskAccess, TaskAction};
///
/// let assignee = TaskAccess { is_owner: false, is_assignee: true };
/// assert!(assignee.allows(TaskAction::ChangeStatus));
/// assert!(!assignee.allows(TaskAction::Edit));
/// ```

use uuid::Uuid;

use crate::models::{
    board::{Board, BoardMember, BoardRole},
    task::Task,
};

/// Authorization error; the message is safe to show to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("{}", .0.denial_message())]
    Board(BoardAction),

    #[error("{}", .0.denial_message())]
    Task(TaskAction),
}

/// Operations guarded at board level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardAction {
    /// Read the board with its members
    View,

    /// List the board's tasks
    ListTasks,

    /// Attach a new task to the board
    AddTask,

    /// Invite another user
    Invite,
}

impl BoardAction {
    pub fn denial_message(&self) -> &'static str {
        match self {
            BoardAction::View => "Access denied",
            BoardAction::ListTasks => "Access denied to this board",
            BoardAction::AddTask => "You don't have access to this board",
            BoardAction::Invite => "Only board owners and admins can invite users",
        }
    }
}

/// What a user is to a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardAccess {
    pub is_owner: bool,

    /// Role from the member list, if listed
    pub role: Option<BoardRole>,

    pub is_public: bool,
}

impl BoardAccess {
    /// Resolves the user's standing from the board row and its member list
    pub fn resolve(board: &Board, members: &[BoardMember], user_id: Uuid) -> Self {
        let role = members
            .iter()
            .find(|m| m.board_id == board.id && m.user_id == user_id)
            .map(|m| m.role);

        Self {
            is_owner: board.owner_id == user_id,
            role,
            is_public: board.is_public,
        }
    }

    pub fn is_member(&self) -> bool {
        self.role.is_some()
    }

    pub fn allows(&self, action: BoardAction) -> bool {
        match action {
            BoardAction::View | BoardAction::ListTasks => {
                self.is_owner || self.is_member() || self.is_public
            }
            BoardAction::AddTask => self.is_owner || self.is_member(),
            BoardAction::Invite => self.is_owner || self.role == Some(BoardRole::Admin),
        }
    }

    pub fn require(&self, action: BoardAction) -> Result<(), AuthzError> {
        if self.allows(action) {
            Ok(())
        } else {
            Err(AuthzError::Board(action))
        }
    }
}

/// Checks a board action for a user
pub fn authorize_board(
    board: &Board,
    members: &[BoardMember],
    user_id: Uuid,
    action: BoardAction,
) -> Result<(), AuthzError> {
    BoardAccess::resolve(board, members, user_id).require(action)
}

/// Operations guarded at task level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    /// Fetch a single task by id
    View,

    /// Change name, description, priority, due date or category
    Edit,

    ChangeStatus,

    Assign,

    Comment,

    ReadComments,

    Delete,
}

impl TaskAction {
    pub fn denial_message(&self) -> &'static str {
        match self {
            TaskAction::View => "Unauthorized! You do not own this task.",
            TaskAction::Edit => "Unauthorized! Task does not belong to you.",
            TaskAction::ChangeStatus
            | TaskAction::Assign
            | TaskAction::Comment
            | TaskAction::ReadComments => "Unauthorized! You don't have access to this task.",
            TaskAction::Delete => "Unauthorized! You can't delete this task.",
        }
    }

    /// Whether assignees share this capability with the owner
    pub fn open_to_assignees(&self) -> bool {
        !matches!(self, TaskAction::View | TaskAction::Edit)
    }
}

/// What a user is to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskAccess {
    pub is_owner: bool,
    pub is_assignee: bool,
}

impl TaskAccess {
    pub fn resolve(task: &Task, user_id: Uuid) -> Self {
        Self {
            is_owner: task.is_owner(user_id),
            is_assignee: task.is_assignee(user_id),
        }
    }

    pub fn allows(&self, action: TaskAction) -> bool {
        self.is_owner || (self.is_assignee && action.open_to_assignees())
    }

    pub fn require(&self, action: TaskAction) -> Result<(), AuthzError> {
        if self.allows(action) {
            Ok(())
        } else {
            Err(AuthzError::Task(action))
        }
    }
}

/// Checks a task action for a user
pub fn authorize_task(task: &Task, user_id: Uuid, action: TaskAction) -> Result<(), AuthzError> {
    TaskAccess::resolve(task, user_id).require(action)
}
