//! JWT token validation.
//!
//! Decoding never fails with an error: a token is either valid, expired,
//! or invalid, and callers branch on that.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;

use keyward_core::config::AuthConfig;

use super::claims::{Claims, TokenType};

/// Outcome of verifying a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenStatus {
    /// Signature, type and expiry all check out.
    Valid(Claims),
    /// Well-formed and correctly signed, but past its expiry.
    Expired,
    /// Malformed, wrongly signed, or of the wrong type.
    Invalid,
}

impl TokenStatus {
    /// The claims of a valid token.
    pub fn into_claims(self) -> Option<Claims> {
        match self {
            Self::Valid(claims) => Some(claims),
            _ => None,
        }
    }

    /// Whether the token is valid.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Validates access and refresh tokens against their own secrets.
#[derive(Clone)]
pub struct JwtDecoder {
    access_key: DecodingKey,
    refresh_key: DecodingKey,
    /// Signature-only validation; expiry is checked against the caller's clock.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            access_key: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_key: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            validation,
        }
    }

    /// Checks a token of the `expected` type at `now`.
    ///
    /// 1. Signature with the secret for `expected`
    /// 2. `token_type` claim matches `expected`
    /// 3. Expiry against `now`
    pub fn decode(&self, token: &str, expected: TokenType, now: DateTime<Utc>) -> TokenStatus {
        let key = expected.select(&self.access_key, &self.refresh_key);

        let claims = match decode::<Claims>(token, key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(error = %e, token_type = ?expected, "Token rejected");
                return TokenStatus::Invalid;
            }
        };

        if claims.token_type != expected {
            debug!(token_type = ?claims.token_type, "Token type mismatch");
            return TokenStatus::Invalid;
        }

        if claims.is_expired_at(now) {
            return TokenStatus::Expired;
        }

        TokenStatus::Valid(claims)
    }
}
