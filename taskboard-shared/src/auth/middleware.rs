/// Session authentication context
///
/// The HTTP layer pulls the session token out of the `JwtToken` cookie and
/// hands it to [`authenticate`]. On success the resulting [`AuthContext`] is
/// stored in the request extensions for handlers to extract.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{create_token, Claims};
/// use taskboard_shared::auth::middleware::{authenticate, AuthError};
/// use uuid::Uuid;
///
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let user_id = Uuid::new_v4();
/// let token = create_token(&Claims::new(user_id), secret).unwrap();
///
/// let ctx = authenticate(Some(&token), secret).unwrap();
/// assert_eq!(ctx.user_id, user_id);
///
/// assert!(matches!(authenticate(None, secret), Err(AuthError::MissingCredentials)));
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "JwtToken";

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Signed-in user
    pub user_id: Uuid,
}

/// Authentication failure
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session cookie on the request
    #[error("User not authenticated!")]
    MissingCredentials,

    /// Cookie present but the token did not verify
    #[error("Invalid Token")]
    InvalidToken(#[source] JwtError),
}

/// Verifies a session token and builds the caller context
pub fn authenticate(token: Option<&str>, secret: &str) -> Result<AuthContext, AuthError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingCredentials)?;

    let claims = validate_token(token, secret).map_err(AuthError::InvalidToken)?;

    Ok(AuthContext {
        user_id: claims.sub,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims};
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_missing_or_empty_token() {
        assert!(matches!(authenticate(None, SECRET), Err(AuthError::MissingCredentials)));
        assert!(matches!(authenticate(Some(""), SECRET), Err(AuthError::MissingCredentials)));
    }

    #[test]
    fn test_invalid_token() {
        let err = authenticate(Some("garbage"), SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
        assert_eq!(err.to_string(), "Invalid Token");
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let claims = Claims::with_expiration(Uuid::new_v4(), Duration::seconds(-3600));
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(
            authenticate(Some(&token), SECRET),
            Err(AuthError::InvalidToken(JwtError::Expired))
        ));
    }

    #[test]
    fn test_valid_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id), SECRET).unwrap();

        let ctx = authenticate(Some(&token), SECRET).unwrap();
        assert_eq!(ctx, AuthContext { user_id });
    }
}
