/// Health check endpoint
///
/// Reports whether the server is up and the database answers.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```
///
/// A database failure still answers 200 with `"status": "degraded"`.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::db::pool;
use tracing::warn;

use crate::app::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,
}

impl HealthResponse {
    pub fn new(database_ok: bool) -> Self {
        let (status, database) = if database_ok {
            ("healthy", "connected")
        } else {
            ("degraded", "disconnected")
        };

        Self {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database.to_string(),
        }
    }
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = match pool::health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            false
        }
    };

    Json(HealthResponse::new(database_ok))
}
