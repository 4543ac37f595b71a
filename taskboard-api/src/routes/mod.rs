/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login, session and profile endpoints
/// - `tasks`: Task CRUD, status, assignment and comments
/// - `boards`: Boards and invitations
/// - `notifications`: Notification inbox

pub mod auth;
pub mod boards;
pub mod health;
pub mod notifications;
pub mod tasks;
