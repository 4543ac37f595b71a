/// Board and invitation endpoints
///
/// # Endpoints
///
/// - `POST /api/board` - Create a board; the caller becomes its owner
/// - `GET /api/board` - Boards the caller owns or belongs to
/// - `GET /api/board/:boardId` - One board (members, owner, or anyone if public)
/// - `POST /api/board/:boardId/invite` - Invite a user by email (owner/admin)
/// - `GET /api/board/invitations` - Caller's pending invitations
/// - `POST /api/board/invitations/:invitationId/accept` - Join the board
/// - `POST /api/board/invitations/:invitationId/decline` - Refuse
///
/// # Invitation Lifecycle
///
/// ```text
///            ┌──► accepted
/// pending ───┼──► declined
///            └──► expired (removed by the sweeper)
/// ```
///
/// Only the invited user may respond, and only while the invitation is
/// pending and unexpired.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use taskboard_shared::{
    auth::{
        authorization::{authorize_board, BoardAction},
        middleware::AuthContext,
    },
    fanout,
    models::{
        board::{Board, BoardMember, CreateBoard},
        invitation::{
            BoardInvitation, CreateInvitation, InvitationError, InvitationRole, InvitationStatus,
        },
        user::User,
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{validate, JsonBody, PathId},
    routes::auth::MessageResponse,
    views::{BoardView, InvitationView},
};

/// Create board request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardRequest {
    #[validate(
        required(message = "Board name is required"),
        length(min = 1, message = "Board name is required")
    )]
    pub name: Option<String>,

    pub description: Option<String>,

    pub is_public: Option<bool>,
}

/// Invite request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(
        required(message = "Email is required"),
        length(min = 1, message = "Email is required")
    )]
    pub email: Option<String>,

    pub role: Option<InvitationRole>,

    pub message: Option<String>,
}

/// Loads a board with its member list
pub(crate) async fn load_board(
    state: &AppState,
    board_id: Uuid,
) -> ApiResult<(Board, Vec<BoardMember>)> {
    let board = Board::find_by_id(&state.db, board_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    let members = BoardMember::list_for_board(&state.db, board.id).await?;
    Ok((board, members))
}

async fn find_invitation(state: &AppState, id: Uuid) -> ApiResult<BoardInvitation> {
    BoardInvitation::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))
}

/// Create board handler
pub async fn create_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    JsonBody(req): JsonBody<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<BoardView>)> {
    validate(&req)?;

    let name = req
        .name
        .ok_or_else(|| ApiError::BadRequest("Board name is required".to_string()))?;

    let board = Board::create(
        &state.db,
        CreateBoard {
            name,
            description: req.description.unwrap_or_default(),
            owner_id: auth.user_id,
            is_public: req.is_public.unwrap_or(false),
        },
    )
    .await?;

    info!(board_id = %board.id, user_id = %auth.user_id, "Board created");

    Ok((
        StatusCode::CREATED,
        Json(BoardView::populate_one(&state.db, board).await?),
    ))
}

/// List boards handler, most recently updated first
pub async fn list_boards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<BoardView>>> {
    let boards = Board::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(BoardView::populate(&state.db, boards).await?))
}

/// Get board handler
///
/// # Errors
///
/// - `404 Not Found`: No such board
/// - `403 Forbidden`: Private board and caller is neither owner nor member
pub async fn get_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(board_id): PathId,
) -> ApiResult<Json<BoardView>> {
    let (board, members) = load_board(&state, board_id).await?;
    authorize_board(&board, &members, auth.user_id, BoardAction::View)?;

    Ok(Json(BoardView::populate_one(&state.db, board).await?))
}

/// Invite handler
///
/// # Errors
///
/// - `404 Not Found`: No such board, or no account with that email
/// - `403 Forbidden`: Caller is neither owner nor admin
/// - `400 Bad Request`: Missing email, invitee already a member, or an
///   invitation is already pending
pub async fn invite_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(board_id): PathId,
    JsonBody(req): JsonBody<InviteRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let (board, members) = load_board(&state, board_id).await?;
    authorize_board(&board, &members, auth.user_id, BoardAction::Invite)?;

    validate(&req)?;
    let email = req
        .email
        .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?;

    let invitee = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if members.iter().any(|m| m.user_id == invitee.id) {
        return Err(ApiError::BadRequest(
            "User is already a member of this board".to_string(),
        ));
    }

    if BoardInvitation::has_pending(&state.db, board.id, invitee.id).await? {
        return Err(ApiError::BadRequest("Invitation already sent".to_string()));
    }

    let invitation = BoardInvitation::create(
        &state.db,
        CreateInvitation {
            board_id: board.id,
            invited_by: auth.user_id,
            invited_user: invitee.id,
            role: req.role.unwrap_or_default(),
            message: req.message.unwrap_or_default(),
        },
    )
    .await?;

    info!(
        invitation_id = %invitation.id,
        board_id = %board.id,
        invited_user = %invitee.id,
        role = ?invitation.role,
        "Invitation sent"
    );

    fanout::deliver(
        &state.db,
        vec![fanout::board_invitation(&board, invitee.id, auth.user_id)],
    )
    .await;

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Invitation sent successfully"),
    ))
}

/// Pending invitations handler, newest first
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<InvitationView>>> {
    let invitations = BoardInvitation::list_pending_for_user(&state.db, auth.user_id).await?;
    Ok(Json(InvitationView::populate(&state.db, invitations).await?))
}

/// Accept handler
///
/// Adds the caller to the board with the invited role and tells the board
/// owner.
///
/// # Errors
///
/// - `404 Not Found`: No such (unexpired) invitation, or the board is gone
/// - `403 Forbidden`: Caller is not the invitee
/// - `400 Bad Request`: Invitation is no longer pending
pub async fn accept_invitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(invitation_id): PathId,
) -> ApiResult<Json<MessageResponse>> {
    let invitation = find_invitation(&state, invitation_id).await?;
    invitation.check_response(auth.user_id, InvitationStatus::Accepted)?;

    let board = Board::find_by_id(&state.db, invitation.board_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    // Membership and status change commit together; a lost race reads as no longer valid
    let accepted = BoardInvitation::accept(&state.db, invitation.id)
        .await?
        .ok_or(InvitationError::NoLongerValid)?;

    info!(
        invitation_id = %accepted.id,
        board_id = %board.id,
        user_id = %auth.user_id,
        role = ?accepted.role,
        "Invitation accepted"
    );

    if let Some(member) = User::find_by_id(&state.db, auth.user_id).await? {
        fanout::deliver(
            &state.db,
            vec![fanout::member_joined(&board, member.id, &member.name)],
        )
        .await;
    }

    Ok(MessageResponse::new("Invitation accepted successfully"))
}

/// Decline handler
///
/// # Errors
///
/// - `404 Not Found`: No such (unexpired) invitation
/// - `403 Forbidden`: Caller is not the invitee
/// - `400 Bad Request`: Invitation is no longer pending
pub async fn decline_invitation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathId(invitation_id): PathId,
) -> ApiResult<Json<MessageResponse>> {
    let invitation = find_invitation(&state, invitation_id).await?;
    invitation.check_response(auth.user_id, InvitationStatus::Declined)?;

    let declined = BoardInvitation::decline(&state.db, invitation.id)
        .await?
        .ok_or(InvitationError::NoLongerValid)?;

    info!(
        invitation_id = %declined.id,
        user_id = %auth.user_id,
        "Invitation declined"
    );

    Ok(MessageResponse::new("Invitation declined"))
}
