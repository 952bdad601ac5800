//! Signs token pairs, each type with its own HS256 secret.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use keyward_core::config::AuthConfig;
use keyward_core::error::AppError;
use keyward_entity::user::User;

use super::claims::{Claims, TokenType};

#[derive(Clone)]
pub struct JwtEncoder {
    access_key: EncodingKey,
    refresh_key: EncodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// A freshly minted access/refresh pair and when each stops verifying.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl JwtEncoder {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_key: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_key: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
        }
    }

    /// Both tokens share `now` as `iat` but carry distinct `jti`s.
    pub fn generate_token_pair(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair, AppError> {
        let access_exp = now + self.access_ttl;
        let refresh_exp = now + self.refresh_ttl;

        let access_token = self.sign(user, now, access_exp, TokenType::Access)?;
        let refresh_token = self.sign(user, now, refresh_exp, TokenType::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at: access_exp,
            refresh_expires_at: refresh_exp,
        })
    }

    fn sign(
        &self,
        user: &User,
        now: DateTime<Utc>,
        exp: DateTime<Utc>,
        token_type: TokenType,
    ) -> Result<String, AppError> {
        let claims = Claims::for_user(user, token_type, now, exp);
        let key = token_type.select(&self.access_key, &self.refresh_key);
        encode(&Header::default(), &claims, key)
            .map_err(|e| AppError::internal(format!("Failed to encode {token_type:?} token: {e}")))
    }
}
