/// Cookie session authentication
///
/// Signed-in clients carry an HS256 session token in the `JwtToken` cookie.
/// [`require_session`] verifies it and stores the caller's
/// [`AuthContext`] in the request extensions, where handlers pick it up with
/// `Extension<AuthContext>`.
///
/// The cookie is HttpOnly, scoped to `/`, SameSite=Lax, lives for six days
/// and is marked Secure in production. Removal reuses the same attributes so
/// browsers match and drop it.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use taskboard_shared::auth::{
    jwt::SESSION_TTL_DAYS,
    middleware::{authenticate, SESSION_COOKIE},
};

use crate::{app::AppState, error::ApiError};

/// Rejects requests without a valid session cookie
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value());
    let auth_context = authenticate(token, state.jwt_secret())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Whether the request already carries a session cookie
pub fn has_session(jar: &CookieJar) -> bool {
    jar.get(SESSION_COOKIE)
        .is_some_and(|cookie| !cookie.value().is_empty())
}

fn base_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Session cookie carrying `token`
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(token, secure);
    cookie.set_max_age(time::Duration::days(SESSION_TTL_DAYS));
    cookie
}

/// Adds the session cookie to the jar
pub fn start_session(jar: CookieJar, token: String, secure: bool) -> CookieJar {
    jar.add(session_cookie(token, secure))
}

/// Expires the session cookie
pub fn end_session(jar: CookieJar, secure: bool) -> CookieJar {
    jar.remove(base_cookie(String::new(), secure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("token".to_string(), false);

        assert_eq!(cookie.name(), "JwtToken");
        assert_eq!(cookie.value(), "token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(6)));
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_secure_in_production() {
        let cookie = session_cookie("token".to_string(), true);
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_has_session() {
        let jar = CookieJar::new();
        assert!(!has_session(&jar));

        let jar = start_session(jar, "token".to_string(), false);
        assert!(has_session(&jar));
    }

    #[test]
    fn test_end_session_emits_removal() {
        let jar = start_session(CookieJar::new(), "token".to_string(), false);
        let jar = end_session(jar, false);

        assert!(jar.get(SESSION_COOKIE).is_none());
    }
}
