/// Authentication and account endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/signup` - Create an account and start a session
/// - `POST /api/auth/login` - Start a session
/// - `POST /api/auth/logout` - End the session
/// - `GET /api/auth/check` - Report the signed-in user
/// - `GET /api/auth/getuser` - Current user profile
/// - `POST /api/auth/profilepic` - Upload a profile picture (multipart `profilePic`)
/// - `DELETE /api/auth/profilepic` - Remove the profile picture
/// - `DELETE /api/auth/delete-account` - Delete the account
/// - `GET /api/auth/systeminfo` - Host memory usage (public)
///
/// Sessions are carried in the `JwtToken` cookie; see
/// [`crate::middleware::session`].

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use sysinfo::System;
use taskboard_shared::{
    auth::{
        jwt::{create_token, Claims},
        middleware::AuthContext,
        password::{hash_password, meets_minimum_length, verify_password},
    },
    models::user::{CreateUser, User},
    storage::{validate_image, ImageUpload, StorageError},
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{validate, JsonBody},
    middleware::session::{end_session, has_session, start_session},
};

/// Multipart field carrying the profile picture
pub const PROFILE_PIC_FIELD: &str = "profilePic";

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(
        required(message = "All fields are required!"),
        length(min = 1, message = "All fields are required!")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "All fields are required!"),
        length(min = 1, message = "All fields are required!")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "All fields are required!"),
        length(min = 1, message = "All fields are required!")
    )]
    pub password: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        required(message = "Email and password are required!"),
        length(min = 1, message = "Email and password are required!")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Email and password are required!"),
        length(min = 1, message = "Email and password are required!")
    )]
    pub password: Option<String>,
}

/// Signup and login response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub authenticated: bool,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub profile_pic: String,
    pub profile_pic_public_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePicResponse {
    pub message: String,
    pub url: String,
    pub public_id: String,
}

/// Host memory figures, formatted as `"x.xx GB"`
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemInfoResponse {
    #[serde(rename = "totalRAM")]
    pub total_ram: String,

    #[serde(rename = "freeRAM")]
    pub free_ram: String,

    #[serde(rename = "usedRAM")]
    pub used_ram: String,
}

impl SystemInfoResponse {
    pub fn from_bytes(total: u64, free: u64) -> Self {
        const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
        let total = total as f64 / GIB;
        let free = free as f64 / GIB;

        Self {
            total_ram: format!("{:.2} GB", total),
            free_ram: format!("{:.2} GB", free),
            used_ram: format!("{:.2} GB", (total - free).max(0.0)),
        }
    }
}

fn session_token(state: &AppState, user_id: Uuid) -> ApiResult<String> {
    Ok(create_token(&Claims::new(user_id), state.jwt_secret())?)
}

/// Removes an image from storage, logging instead of failing
async fn discard_image(state: &AppState, public_id: &str) {
    if let Err(e) = state.images.delete(public_id).await {
        warn!(public_id, error = %e, "Failed to delete stored image");
    }
}

/// Signup handler
///
/// # Errors
///
/// - `400 Bad Request`: Missing field, password shorter than 4 characters,
///   or email already registered
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    validate(&req)?;

    let (Some(name), Some(email), Some(password)) = (req.name, req.email, req.password) else {
        return Err(ApiError::BadRequest("All fields are required!".to_string()));
    };

    if !meets_minimum_length(&password) {
        return Err(ApiError::BadRequest(
            "Password must be at least 4 characters!".to_string(),
        ));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::BadRequest("This email is already used!".to_string()));
    }

    let password_hash = hash_password(&password)?;

    // A concurrent signup still trips the unique index, which maps to the same 400
    let user = User::create(
        &state.db,
        CreateUser {
            name,
            email,
            password_hash,
        },
    )
    .await?;

    let token = session_token(&state, user.id)?;
    info!(user_id = %user.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        start_session(jar, token, state.config.api.production),
        Json(SessionResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            message: "Signup successful!".to_string(),
        }),
    ))
}

/// Login handler
///
/// # Errors
///
/// - `406 Not Acceptable`: A session cookie is already present
/// - `400 Bad Request`: Missing field, unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if has_session(&jar) {
        return Err(ApiError::NotAcceptable("User already logged in!".to_string()));
    }

    validate(&req)?;

    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(ApiError::BadRequest(
            "Email and password are required!".to_string(),
        ));
    };

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid email, please signup!".to_string()))?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(ApiError::BadRequest("Invalid password!".to_string()));
    }

    let token = session_token(&state, user.id)?;
    info!(user_id = %user.id, "User logged in");

    Ok((
        StatusCode::OK,
        start_session(jar, token, state.config.api.production),
        Json(SessionResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            message: "Login successful!".to_string(),
        }),
    ))
}

/// Logout handler
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
) -> impl IntoResponse {
    info!(user_id = %auth.user_id, "User logged out");

    (
        end_session(jar, state.config.api.production),
        MessageResponse::new("Logout successful!"),
    )
}

/// Session check handler
pub async fn check(Extension(auth): Extension<AuthContext>) -> Json<CheckResponse> {
    Json(CheckResponse {
        authenticated: true,
        user_id: auth.user_id,
    })
}

async fn current_user(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found!".to_string()))
}

/// Current user handler
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = current_user(&state, &auth).await?;

    Ok(Json(UserResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        avatar: user.avatar,
        profile_pic: user.profile_pic,
        profile_pic_public_id: user.profile_pic_public_id,
    }))
}

/// Pulls the `profilePic` file out of a multipart body
async fn read_profile_pic(mut multipart: Multipart) -> ApiResult<Option<ImageUpload>> {
    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::from(StorageError::TooLarge)
        } else {
            ApiError::BadRequest(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(PROFILE_PIC_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(Some(ImageUpload {
            bytes,
            file_name,
            content_type,
        }));
    }

    Ok(None)
}

/// Profile picture upload handler
///
/// The new image is stored first; the previous one is deleted and the
/// reference replaced only once the upload has succeeded.
///
/// # Errors
///
/// - `400 Bad Request`: No file, unsupported type, or larger than 5 MB
/// - `404 Not Found`: Account no longer exists
/// - `500 Internal Server Error`: Storage upload failed
pub async fn upload_profile_pic(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> ApiResult<Json<ProfilePicResponse>> {
    let image = read_profile_pic(multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("No file provided!".to_string()))?;

    validate_image(&image)?;

    let stored = state.images.upload(image).await?;

    let Some(user) = User::find_by_id(&state.db, auth.user_id).await? else {
        discard_image(&state, &stored.public_id).await;
        return Err(ApiError::NotFound("User not found!".to_string()));
    };

    if let Some(old) = &user.profile_pic_public_id {
        discard_image(&state, old).await;
    }

    User::set_profile_pic(&state.db, user.id, &stored.url, &stored.public_id).await?;
    info!(user_id = %user.id, public_id = %stored.public_id, "Profile picture updated");

    Ok(Json(ProfilePicResponse {
        message: "Profile picture updated!".to_string(),
        url: stored.url,
        public_id: stored.public_id,
    }))
}

/// Profile picture delete handler
///
/// # Errors
///
/// - `400 Bad Request`: No stored picture
/// - `404 Not Found`: Account no longer exists
pub async fn delete_profile_pic(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MessageResponse>> {
    let user = current_user(&state, &auth).await?;

    let Some(public_id) = &user.profile_pic_public_id else {
        return Err(ApiError::BadRequest(
            "No profile picture to delete!".to_string(),
        ));
    };

    discard_image(&state, public_id).await;
    User::clear_profile_pic(&state.db, user.id).await?;
    info!(user_id = %user.id, "Profile picture deleted");

    Ok(MessageResponse::new("Profile picture deleted!"))
}

/// Account deletion handler
///
/// Removes the stored picture, the account and everything it owns, then
/// clears the session cookie.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    let user = current_user(&state, &auth).await?;

    if let Some(public_id) = &user.profile_pic_public_id {
        discard_image(&state, public_id).await;
    }

    User::delete_account(&state.db, user.id).await?;
    info!(user_id = %user.id, "Account deleted");

    Ok((
        end_session(jar, state.config.api.production),
        MessageResponse::new("Account deleted!"),
    ))
}

/// Host memory handler
pub async fn system_info() -> Json<SystemInfoResponse> {
    let mut system = System::new();
    system.refresh_memory();

    Json(SystemInfoResponse::from_bytes(
        system.total_memory(),
        system.available_memory(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_info_formatting() {
        const GIB: u64 = 1024 * 1024 * 1024;
        let info = SystemInfoResponse::from_bytes(16 * GIB, 4 * GIB + GIB / 2);

        assert_eq!(info.total_ram, "16.00 GB");
        assert_eq!(info.free_ram, "4.50 GB");
        assert_eq!(info.used_ram, "11.50 GB");
    }

    #[test]
    fn test_system_info_keys() {
        let value = serde_json::to_value(SystemInfoResponse::from_bytes(0, 0)).unwrap();

        assert_eq!(value["totalRAM"], "0.00 GB");
        assert!(value.get("freeRAM").is_some());
        assert!(value.get("usedRAM").is_some());
    }

    #[test]
    fn test_signup_validation_messages() {
        let req = SignupRequest {
            name: Some("Ada".to_string()),
            email: None,
            password: Some("pass".to_string()),
        };
        assert_eq!(
            validate(&req).unwrap_err().to_string(),
            "Bad request: All fields are required!"
        );

        let req = SignupRequest {
            name: Some(String::new()),
            email: Some("ada@example.com".to_string()),
            password: Some("pass".to_string()),
        };
        assert!(validate(&req).is_err());
    }

    #[test]
    fn test_login_validation_messages() {
        let req = LoginRequest {
            email: Some("ada@example.com".to_string()),
            password: None,
        };
        assert_eq!(
            validate(&req).unwrap_err().to_string(),
            "Bad request: Email and password are required!"
        );
    }

    #[test]
    fn test_user_response_shape() {
        let value = serde_json::to_value(UserResponse {
            id: Uuid::nil(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            avatar: String::new(),
            profile_pic: String::new(),
            profile_pic_public_id: None,
        })
        .unwrap();

        assert!(value.get("_id").is_some());
        assert!(value.get("profilePic").is_some());
        assert!(value["profilePicPublicId"].is_null());
    }
}
