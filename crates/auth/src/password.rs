//! Password hashing and verification.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::{AuthError, AuthResult};

/// Hashes a password using argon2id.
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert_ne!(hash, "correct horse battery staple");

        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("same input").unwrap();
        let second = hash_password("same input").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
