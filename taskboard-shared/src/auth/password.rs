/// Password hashing for user credentials
///
/// Passwords are stored as Argon2id PHC strings. The cost parameters are
/// embedded in every stored hash, so verification keeps working if the
/// hashing parameters below are tuned later.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("hunter2")?;
/// assert!(verify_password("hunter2", &hash)?);
/// assert!(!verify_password("hunter3", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Minimum accepted password length at signup, in characters
pub const MIN_PASSWORD_LENGTH: usize = 4;

/// Error type for password operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a valid PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password with Argon2id (19 MiB, 2 passes, 1 lane)
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(19 * 1024)
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Returns `Ok(false)` on mismatch; errors are reserved for unreadable hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Returns true when the password satisfies the signup length rule
pub fn meets_minimum_length(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id() {
        let hash = hash_password("test_password").expect("Hash should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
    }

    #[test]
    fn test_hash_uses_fresh_salt() {
        let hash1 = hash_password("same").expect("Hash 1 should succeed");
        let hash2 = hash_password("same").expect("Hash 2 should succeed");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct").expect("Hash should succeed");

        assert!(verify_password("correct", &hash).unwrap());
        assert!(!verify_password("incorrect", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(matches!(
            verify_password("password", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
        assert!(verify_password("password", "").is_err());
    }

    #[test]
    fn test_verify_password_parseable_but_wrong_hash() {
        // Valid PHC shape with a bogus hash body never matches
        assert!(!verify_password("password", "$argon2id$invalid").unwrap());
    }

    #[test]
    fn test_minimum_length() {
        assert!(!meets_minimum_length(""));
        assert!(!meets_minimum_length("abc"));
        assert!(meets_minimum_length("abcd"));
        // counted in characters, not bytes
        assert!(!meets_minimum_length("密码"));
        assert!(meets_minimum_length("パスワード"));
    }
}
