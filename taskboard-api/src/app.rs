/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::{image_store, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let images = image_store(&config);
/// let state = AppState::new(pool, config, images);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{security::SecurityHeadersLayer, session::require_session},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::{path::Path, sync::Arc, time::Duration};
use taskboard_shared::storage::{
    cloudinary::{CloudinaryCredentials, CloudinaryStore},
    DisabledImageStore, ImageStore, MAX_IMAGE_BYTES,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

/// Request body limit on the profile picture upload (image plus multipart framing)
pub const PROFILE_PIC_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Profile picture storage
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, images: Arc<dyn ImageStore>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            images,
        }
    }

    /// Secret for session token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Picks the image store the configuration allows
pub fn image_store(config: &Config) -> Arc<dyn ImageStore> {
    match &config.cloudinary {
        Some(c) => {
            info!(cloud_name = %c.cloud_name, "Image storage: Cloudinary");
            Arc::new(CloudinaryStore::new(CloudinaryCredentials {
                cloud_name: c.cloud_name.clone(),
                api_key: c.api_key.clone(),
                api_secret: c.api_secret.clone(),
            }))
        }
        None => {
            warn!("Cloudinary credentials not set; profile picture uploads are disabled");
            Arc::new(DisabledImageStore)
        }
    }
}

/// CORS policy for the configured origins
///
/// Credentials are always allowed so the session cookie travels; `*` is
/// served by mirroring the request origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Answer for unknown `/api` paths
async fn api_not_found() -> ApiError {
    ApiError::NotFound("API endpoint not found".to_string())
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health
/// ├── /api/
/// │   ├── /auth/            signup, login, systeminfo public; rest need a session
/// │   ├── /task/            session required
/// │   ├── /board/           session required
/// │   ├── /notifications/   session required
/// │   └── *                 404 {"message": "API endpoint not found"}
/// └── *                     static frontend (when FRONTEND_DIST is set)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost last):
/// 1. Session check (per-route, `route_layer`)
/// 2. Logging (tower-http TraceLayer)
/// 3. Compression
/// 4. CORS
/// 5. Security headers
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{auth, boards, health, notifications, tasks};

    let session = || axum::middleware::from_fn_with_state(state.clone(), require_session);

    let auth_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/check", get(auth::check))
        .route("/getuser", get(auth::get_user))
        .route(
            "/profilepic",
            post(auth::upload_profile_pic)
                .delete(auth::delete_profile_pic)
                .layer(DefaultBodyLimit::max(PROFILE_PIC_BODY_LIMIT)),
        )
        .route("/delete-account", delete(auth::delete_account))
        .route_layer(session())
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/systeminfo", get(auth::system_info));

    let task_routes = Router::new()
        .route("/", post(tasks::create_task).get(tasks::list_tasks))
        .route(
            "/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/:id/status", patch(tasks::update_status))
        .route("/:id/assign", patch(tasks::assign_task))
        .route(
            "/:id/comments",
            post(tasks::add_comment).get(tasks::list_comments),
        )
        .route_layer(session());

    let board_routes = Router::new()
        .route("/", post(boards::create_board).get(boards::list_boards))
        .route("/invitations", get(boards::list_invitations))
        .route(
            "/invitations/:invitation_id/accept",
            post(boards::accept_invitation),
        )
        .route(
            "/invitations/:invitation_id/decline",
            post(boards::decline_invitation),
        )
        .route("/:board_id", get(boards::get_board))
        .route("/:board_id/invite", post(boards::invite_user))
        .route_layer(session());

    let notification_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/unread-count", get(notifications::unread_count))
        .route("/mark-all-read", put(notifications::mark_all_read))
        .route("/:id/read", put(notifications::mark_read))
        .route("/:id", delete(notifications::delete_notification))
        .route_layer(session());

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/task", task_routes)
        .nest("/board", board_routes)
        .nest("/notifications", notification_routes)
        .fallback(api_not_found);

    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes);

    if let Some(dist) = &state.config.api.frontend_dist {
        let index = Path::new(dist).join("index.html");
        router = router.fallback_service(ServeDir::new(dist).fallback(ServeFile::new(index)));
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
