//! One-time code generation and hashing.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Digits in a one-time code.
pub const CODE_LENGTH: usize = 6;

/// A fresh zero-padded six-digit code.
pub fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

/// Hex SHA-256 of the code bound to its user and the server pepper.
///
/// Binding the user id means a hash copied between records never
/// matches.
pub fn hash_code(pepper: &str, user_id: Uuid, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pepper.as_bytes());
    hasher.update(b":");
    hasher.update(user_id.as_bytes());
    hasher.update(b":");
    hasher.update(code.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compares two code hashes in time independent of where they differ.
pub fn hashes_match(candidate: &str, stored: &str) -> bool {
    candidate.as_bytes().ct_eq(stored.as_bytes()).into()
}

/// Whether `input` has the shape of a code at all.
pub fn is_well_formed(input: &str) -> bool {
    let input = input.trim();
    input.len() == CODE_LENGTH && input.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert!(is_well_formed(&code), "bad code {code}");
        }
    }

    #[test]
    fn test_hashes_match() {
        let user = Uuid::new_v4();
        let stored = hash_code("pepper", user, "123456");

        assert!(hashes_match(&hash_code("pepper", user, "123456"), &stored));
        assert!(!hashes_match(&hash_code("pepper", user, "654321"), &stored));
        assert!(!hashes_match(&stored[..63], &stored));
        assert!(!hashes_match("", &stored));
    }

    #[test]
    fn test_hash_depends_on_user_and_pepper() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let base = hash_code("pepper", a, "123456");

        assert_eq!(base.len(), 64);
        assert_eq!(base, hash_code("pepper", a, " 123456 "));
        assert_ne!(base, hash_code("pepper", b, "123456"));
        assert_ne!(base, hash_code("other", a, "123456"));
        assert_ne!(base, hash_code("pepper", a, "123457"));
    }

    #[test]
    fn test_well_formed() {
        assert!(is_well_formed("000123"));
        assert!(!is_well_formed("12345"));
        assert!(!is_well_formed("12a456"));
    }
}
