/// Middleware modules for the API server
///
/// - `session`: Cookie session authentication and cookie construction
/// - `security`: Security response headers

pub mod security;
pub mod session;
