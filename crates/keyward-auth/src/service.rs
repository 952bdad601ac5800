//! Caller-facing authentication flows composed from the engine parts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::traits::CredentialVerifier;
use keyward_database::repositories::UserRepository;
use keyward_entity::session::{DeviceInfo, RevokedReason, Session};
use keyward_entity::user::User;

use crate::jwt::{Claims, TokenIssuer, TokenPair, TokenStatus};
use crate::sanction::SanctionCascade;
use crate::session::{InvalidationOutcome, SessionManager};
use crate::two_factor::TwoFactorService;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_SESSION: &str = "invalid session";

/// A session together with the tokens bound to it.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedSession {
    /// The authenticated user.
    pub user: User,
    /// The session record.
    pub session: Session,
    /// The freshly minted token pair.
    pub tokens: TokenPair,
}

/// Result of a password login.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    /// The user must confirm an emailed code before a session exists.
    TwoFactorRequired {
        /// User to pass back to `complete_two_factor`.
        user_id: Uuid,
        /// When the emailed code expires.
        expires_at: DateTime<Utc>,
    },
    /// Logged in.
    Authenticated(Box<AuthenticatedSession>),
}

/// Result of checking a token pair.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// The access token is still good.
    Valid(Claims),
    /// The access token had expired and the pair was rotated.
    Rotated(Box<AuthenticatedSession>),
}

/// Login, two-factor, refresh, check, logout and password-change flows.
///
/// Token failures surface as one generic `Unauthorized` so callers cannot
/// tell a revoked token from an expired or malformed one.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialVerifier>,
    issuer: Arc<TokenIssuer>,
    sessions: Arc<SessionManager>,
    two_factor: Arc<TwoFactorService>,
    sanctions: Arc<SanctionCascade>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("sessions", &self.sessions)
            .finish()
    }
}

impl AuthService {
    /// Creates the façade.
    pub fn new(
        users: Arc<dyn UserRepository>,
        credentials: Arc<dyn CredentialVerifier>,
        issuer: Arc<TokenIssuer>,
        sessions: Arc<SessionManager>,
        two_factor: Arc<TwoFactorService>,
        sanctions: Arc<SanctionCascade>,
    ) -> Self {
        Self {
            users,
            credentials,
            issuer,
            sessions,
            two_factor,
            sanctions,
        }
    }

    /// Password login:
    ///
    /// 1. Find the user and verify the password
    /// 2. Reject blocked accounts (lapsed blocks are lifted first)
    /// 3. Either send a one-time code or create the session
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device: &DeviceInfo,
    ) -> AppResult<LoginOutcome> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

        if !self.credentials.verify(password, &user.password_hash) {
            info!(user_id = %user.id, "Login rejected: bad credentials");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        self.ensure_not_blocked(user.id).await?;

        if user.two_factor_enabled {
            let issued = self.two_factor.issue_code(user.id, None).await?;
            return Ok(LoginOutcome::TwoFactorRequired {
                user_id: user.id,
                expires_at: issued.expires_at,
            });
        }

        let session = self.establish_session(user, device).await?;
        Ok(LoginOutcome::Authenticated(Box::new(session)))
    }

    /// Confirms a one-time code, then creates the session.
    pub async fn complete_two_factor(
        &self,
        user_id: Uuid,
        code: &str,
        device: &DeviceInfo,
    ) -> AppResult<AuthenticatedSession> {
        let user = self.two_factor.verify_code(user_id, code).await?;
        self.ensure_not_blocked(user.id).await?;
        self.establish_session(user, device).await
    }

    /// Sends a new one-time code unless the resend cooldown is active.
    pub async fn resend_two_factor(&self, user_id: Uuid) -> AppResult<DateTime<Utc>> {
        Ok(self.two_factor.resend_code(user_id).await?.expires_at)
    }

    /// Trades a refresh token for a new pair on the same session.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthenticatedSession> {
        self.try_refresh(refresh_token)
            .await
            .map_err(|e| generic_unauthorized("refresh", e))
    }

    /// Validates an access/refresh pair; rotates it when only the access
    /// token has expired.
    pub async fn check(&self, access_token: &str, refresh_token: &str) -> AppResult<CheckOutcome> {
        match self.issuer.verify_access(access_token) {
            TokenStatus::Valid(claims) => self
                .confirm_session(&claims, refresh_token)
                .await
                .map(|()| CheckOutcome::Valid(claims))
                .map_err(|e| generic_unauthorized("check", e)),
            TokenStatus::Expired => {
                let rotated = self.refresh(refresh_token).await?;
                Ok(CheckOutcome::Rotated(Box::new(rotated)))
            }
            TokenStatus::Invalid => Err(AppError::unauthorized(INVALID_SESSION)),
        }
    }

    /// Ends the session bound to `refresh_token`. Unknown tokens are a
    /// no-op.
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let Some(session) = self.sessions.find_by_refresh_token(refresh_token).await? else {
            debug!("Logout for unknown refresh token");
            return Ok(());
        };
        self.sessions
            .invalidate_specific_session(session.id, RevokedReason::ManuallyRevoked)
            .await?;
        info!(user_id = %session.user_id, session_id = %session.id, "Logged out");
        Ok(())
    }

    /// Revokes the user's other sessions after a password change.
    pub async fn password_changed(
        &self,
        user_id: Uuid,
        current_session_id: Option<Uuid>,
    ) -> AppResult<InvalidationOutcome> {
        self.sessions
            .invalidate_all_except_current(user_id, current_session_id)
            .await
    }

    async fn establish_session(
        &self,
        user: User,
        device: &DeviceInfo,
    ) -> AppResult<AuthenticatedSession> {
        let tokens = self.issuer.issue(&user)?;
        let session = self
            .sessions
            .create_or_update_session(user.id, &tokens.refresh_token, device)
            .await?;
        info!(user_id = %user.id, session_id = %session.id, "Logged in");
        Ok(AuthenticatedSession {
            user,
            session,
            tokens,
        })
    }

    async fn ensure_not_blocked(&self, user_id: Uuid) -> AppResult<()> {
        let status = self.sanctions.check_user_block_status(user_id).await?;
        if status.is_blocked() {
            info!(user_id = %user_id, "Rejected: account blocked");
            return Err(AppError::forbidden("Account is blocked"));
        }
        Ok(())
    }

    /// Steps, in order; any failure rejects:
    ///
    /// 1. Signature, type and expiry of the token
    /// 2. Blacklist (an unreachable blacklist rejects)
    /// 3. Live session bound to this exact token
    /// 4. Account not blocked
    /// 5. Temporarily blacklist the consumed token
    /// 6. Mint a new pair and swap it in only if nobody rotated first
    async fn try_refresh(&self, refresh_token: &str) -> AppResult<AuthenticatedSession> {
        let claims = self
            .issuer
            .verify_refresh(refresh_token)
            .into_claims()
            .ok_or_else(|| AppError::unauthorized("refresh token not valid"))?;

        let session = self.live_session(&claims, refresh_token).await?;

        let user = self
            .users
            .find_by_id(claims.user_id())
            .await?
            .ok_or_else(|| AppError::unauthorized("user no longer exists"))?;
        self.ensure_not_blocked(user.id).await?;

        self.sessions
            .blacklist()
            .add_temporary(refresh_token)
            .await?;

        let tokens = self.issuer.issue(&user)?;
        if !self
            .sessions
            .rotate_refresh_token(session.id, refresh_token, &tokens.refresh_token)
            .await?
        {
            return Err(AppError::conflict("refresh token already rotated"));
        }

        let session = self
            .sessions
            .find_by_refresh_token(&tokens.refresh_token)
            .await?
            .ok_or_else(|| AppError::unauthorized("session vanished during rotation"))?;

        debug!(user_id = %user.id, session_id = %session.id, "Refresh token rotated");
        Ok(AuthenticatedSession {
            user,
            session,
            tokens,
        })
    }

    async fn confirm_session(&self, access: &Claims, refresh_token: &str) -> AppResult<()> {
        let claims = self
            .issuer
            .verify_refresh(refresh_token)
            .into_claims()
            .ok_or_else(|| AppError::unauthorized("refresh token not valid"))?;
        if claims.sub != access.sub {
            return Err(AppError::unauthorized("token pair mismatch"));
        }
        self.live_session(&claims, refresh_token).await?;
        Ok(())
    }

    async fn live_session(&self, claims: &Claims, refresh_token: &str) -> AppResult<Session> {
        if self.sessions.blacklist().is_revoked(refresh_token).await? {
            return Err(AppError::unauthorized("refresh token revoked"));
        }

        self.sessions
            .find_by_refresh_token(refresh_token)
            .await?
            .filter(|s| s.is_active() && s.user_id == claims.sub)
            .ok_or_else(|| AppError::unauthorized("no live session for token"))
    }
}

fn generic_unauthorized(flow: &'static str, cause: AppError) -> AppError {
    if cause.is_internal() {
        error!(flow, error = %cause, "Token validation failed closed");
    } else {
        debug!(flow, reason = %cause, "Token rejected");
    }
    AppError::unauthorized(INVALID_SESSION)
}
