//! What a Keyward token says about its holder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keyward_entity::user::{User, UserRole};

/// Access and refresh tokens carry the same payload; `token_type` tells
/// them apart and each type is signed with its own secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    /// Unix seconds.
    pub iat: i64,
    /// Unix seconds.
    pub exp: i64,
    /// Random per token, so two tokens minted in the same second differ.
    pub jti: Uuid,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    /// Picks the per-type key out of an access/refresh pair.
    pub(crate) fn select<'a, K>(self, access: &'a K, refresh: &'a K) -> &'a K {
        match self {
            Self::Access => access,
            Self::Refresh => refresh,
        }
    }
}

impl Claims {
    pub(crate) fn for_user(
        user: &User,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Expiry is inclusive: a token is dead at its `exp` second.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
