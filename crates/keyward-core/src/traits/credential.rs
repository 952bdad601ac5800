//! Credential verification capability.

/// Checks a plaintext secret against a stored hash.
///
/// Hashing itself is owned by the implementation; the engine only asks
/// whether a secret matches.
pub trait CredentialVerifier: Send + Sync + std::fmt::Debug + 'static {
    /// Returns `true` on a match. Malformed hashes count as no match.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}
