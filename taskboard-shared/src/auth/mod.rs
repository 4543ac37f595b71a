/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the signup length rule
/// - [`jwt`]: Session token issuance and validation
/// - [`middleware`]: Caller context built from the session cookie
/// - [`authorization`]: Board and task capability checks
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::password::{hash_password, verify_password};
/// use taskboard_shared::auth::jwt::{create_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = create_token(&Claims::new(Uuid::new_v4()), "secret-of-at-least-32-characters!!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
