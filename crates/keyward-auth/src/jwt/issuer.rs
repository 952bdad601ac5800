//! Token issuer: signs and verifies token pairs against the engine clock.

use std::sync::Arc;

use keyward_core::config::AuthConfig;
use keyward_core::result::AppResult;
use keyward_core::traits::Clock;
use keyward_entity::user::User;

use super::claims::TokenType;
use super::decoder::{JwtDecoder, TokenStatus};
use super::encoder::{JwtEncoder, TokenPair};

/// Issues and verifies tokens. Pure over the configured secrets; no store
/// access.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    encoder: JwtEncoder,
    decoder: JwtDecoder,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Creates an issuer from auth configuration.
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoder: JwtEncoder::new(config),
            decoder: JwtDecoder::new(config),
            clock,
        }
    }

    /// Mint an access/refresh pair for `user`.
    pub fn issue(&self, user: &User) -> AppResult<TokenPair> {
        self.encoder.generate_token_pair(user, self.clock.now())
    }

    /// Verify an access token.
    pub fn verify_access(&self, token: &str) -> TokenStatus {
        self.decoder.decode(token, TokenType::Access, self.clock.now())
    }

    /// Verify a refresh token.
    pub fn verify_refresh(&self, token: &str) -> TokenStatus {
        self.decoder.decode(token, TokenType::Refresh, self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use keyward_core::traits::ManualClock;
    use keyward_entity::user::{UserRole, UserStatus};
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret".into(),
            refresh_token_secret: "refresh-secret".into(),
            ..AuthConfig::default()
        }
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "jwt@example.com".into(),
            password_hash: String::new(),
            role: UserRole::Admin,
            status: UserStatus::Active,
            blocked_until: None,
            two_factor_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_fresh_pair_verifies() {
        let clock = Arc::new(ManualClock::default());
        let issuer = TokenIssuer::new(&config(), clock);
        let user = user();
        let pair = issuer.issue(&user).unwrap();

        let access = issuer.verify_access(&pair.access_token).into_claims().unwrap();
        assert_eq!(access.sub, user.id);
        assert_eq!(access.role, UserRole::Admin);
        assert!(issuer.verify_refresh(&pair.refresh_token).is_valid());
    }

    #[test]
    fn test_tokens_expire_with_the_clock() {
        let clock = Arc::new(ManualClock::default());
        let issuer = TokenIssuer::new(&config(), clock.clone());
        let pair = issuer.issue(&user()).unwrap();

        clock.advance(Duration::minutes(61));
        assert_eq!(issuer.verify_access(&pair.access_token), TokenStatus::Expired);
        assert!(issuer.verify_refresh(&pair.refresh_token).is_valid());

        clock.advance(Duration::days(30));
        assert_eq!(issuer.verify_refresh(&pair.refresh_token), TokenStatus::Expired);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let issuer = TokenIssuer::new(&config(), Arc::new(ManualClock::default()));
        let pair = issuer.issue(&user()).unwrap();

        assert_eq!(issuer.verify_refresh(&pair.access_token), TokenStatus::Invalid);
        assert_eq!(issuer.verify_access(&pair.refresh_token), TokenStatus::Invalid);
    }

    #[test]
    fn test_garbage_is_invalid() {
        let issuer = TokenIssuer::new(&config(), Arc::new(ManualClock::default()));
        assert_eq!(issuer.verify_access("not-a-jwt"), TokenStatus::Invalid);
        assert_eq!(issuer.verify_refresh(""), TokenStatus::Invalid);
    }

    #[test]
    fn test_each_issue_is_unique() {
        let issuer = TokenIssuer::new(&config(), Arc::new(ManualClock::default()));
        let user = user();
        let a = issuer.issue(&user).unwrap();
        let b = issuer.issue(&user).unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
    }
}
