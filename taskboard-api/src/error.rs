/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; every error renders as a JSON
/// body with a single `message` field.
///
/// Internal errors are logged with their details and replaced by a generic
/// message before reaching the client.
///
/// # Example
///
/// ```
/// use taskboard_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(name: Option<String>) -> ApiResult<Json<Value>> {
///     let name = name.ok_or_else(|| ApiError::BadRequest("Board name is required".to_string()))?;
///     Ok(Json(json!({ "name": name })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskboard_shared::{
    auth::{authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError},
    models::invitation::InvitationError,
    storage::StorageError,
};

/// Unique index guarding account emails
const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Partial unique index allowing one pending invitation per user and board
const PENDING_INVITATION_CONSTRAINT: &str = "uq_board_invitations_pending";

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Not acceptable (406) - e.g., login while already signed in
    NotAcceptable(String),

    /// Internal server error (500); the detail is logged, never sent
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::NotAcceptable(msg) => write!(f, "Not acceptable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self {
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Server error!".to_string()
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::NotAcceptable(msg) => msg,
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.constraint() {
                Some(EMAIL_CONSTRAINT) => {
                    return ApiError::BadRequest("This email is already used!".to_string());
                }
                Some(PENDING_INVITATION_CONSTRAINT) => {
                    return ApiError::BadRequest("Invitation already sent".to_string());
                }
                _ => {}
            }
        }

        ApiError::InternalError(format!("Database error: {}", err))
    }
}

/// Convert authentication errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if let AuthError::InvalidToken(source) = &err {
            tracing::debug!(error = %source, "Rejected session token");
        }
        ApiError::Unauthorized(err.to_string())
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<InvitationError> for ApiError {
    fn from(err: InvitationError) -> Self {
        match err {
            InvitationError::NotInvitee => ApiError::Forbidden(err.to_string()),
            InvitationError::NoLongerValid => ApiError::BadRequest(err.to_string()),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Token errors only surface here when minting a session
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::InternalError(format!("Session token error: {}", err))
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedType | StorageError::TooLarge => {
                ApiError::BadRequest(err.to_string())
            }
            StorageError::NotConfigured | StorageError::Http(_) | StorageError::Rejected(_) => {
                ApiError::InternalError(format!("Upload failed: {}", err))
            }
        }
    }
}
