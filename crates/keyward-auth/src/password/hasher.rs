//! Argon2id credential hashing and verification.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use tracing::warn;

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::traits::CredentialVerifier;

/// Argon2id implementation of [`CredentialVerifier`].
#[derive(Debug, Clone, Default)]
pub struct Argon2Verifier;

impl Argon2Verifier {
    /// Creates a new verifier.
    pub fn new() -> Self {
        Self
    }

    /// Hashes a plaintext secret with a random salt into a PHC string.
    pub fn hash(&self, plaintext: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }
}

impl CredentialVerifier for Argon2Verifier {
    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Stored password hash is malformed");
                return false;
            }
        };

        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                warn!(error = %e, "Password verification failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let verifier = Argon2Verifier::new();
        let hash = verifier.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verifier.verify("correct horse", &hash));
        assert!(!verifier.verify("battery staple", &hash));
    }

    #[test]
    fn test_malformed_hash_is_no_match() {
        assert!(!Argon2Verifier::new().verify("anything", "not-a-phc-string"));
    }
}
