//! Wires the engine components over a set of stores and collaborators.

use std::sync::Arc;
use std::time::Duration;

use keyward_core::config::AppConfig;
use keyward_core::traits::{AuditLogger, CacheProvider, Clock, CredentialVerifier, Notifier};
use keyward_database::connection::PgRepositories;
use keyward_database::repositories::{
    SanctionRepository, SessionRepository, TwoFactorRepository, UserRepository,
};

use crate::blacklist::BlacklistGateway;
use crate::jwt::TokenIssuer;
use crate::outbound::{TracingAuditLogger, TracingNotifier};
use crate::password::Argon2Verifier;
use crate::sanction::SanctionCascade;
use crate::service::AuthService;
use crate::session::SessionManager;
use crate::two_factor::TwoFactorService;

/// Everything the engine needs from the outside.
#[derive(Debug, Clone)]
pub struct EngineDeps {
    /// User records.
    pub users: Arc<dyn UserRepository>,
    /// Session records.
    pub sessions: Arc<dyn SessionRepository>,
    /// One-time code records.
    pub two_factor: Arc<dyn TwoFactorRepository>,
    /// Sanction records.
    pub sanctions: Arc<dyn SanctionRepository>,
    /// Ephemeral store.
    pub cache: Arc<dyn CacheProvider>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Password checker.
    pub credentials: Arc<dyn CredentialVerifier>,
    /// Outbound messages.
    pub notifier: Arc<dyn Notifier>,
    /// Audit trail.
    pub audit: Arc<dyn AuditLogger>,
}

impl EngineDeps {
    /// Uses one store for every repository, with the default credential
    /// verifier, notifier and audit logger.
    pub fn with_store<S>(store: Arc<S>, cache: Arc<dyn CacheProvider>, clock: Arc<dyn Clock>) -> Self
    where
        S: UserRepository + SessionRepository + TwoFactorRepository + SanctionRepository,
    {
        Self {
            users: store.clone(),
            sessions: store.clone(),
            two_factor: store.clone(),
            sanctions: store,
            cache,
            clock,
            credentials: Arc::new(Argon2Verifier::new()),
            notifier: Arc::new(TracingNotifier),
            audit: Arc::new(TracingAuditLogger),
        }
    }

    /// Uses the PostgreSQL repositories, with the default credential
    /// verifier, notifier and audit logger.
    pub fn from_repositories(
        repos: PgRepositories,
        cache: Arc<dyn CacheProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users: Arc::new(repos.users),
            sessions: Arc::new(repos.sessions),
            two_factor: Arc::new(repos.two_factor),
            sanctions: Arc::new(repos.sanctions),
            cache,
            clock,
            credentials: Arc::new(Argon2Verifier::new()),
            notifier: Arc::new(TracingNotifier),
            audit: Arc::new(TracingAuditLogger),
        }
    }
}

/// The assembled engine. Cloning shares every component.
#[derive(Debug, Clone)]
pub struct AuthEngine {
    /// Token signing and verification.
    pub issuer: Arc<TokenIssuer>,
    /// Blacklist access.
    pub blacklist: Arc<BlacklistGateway>,
    /// Session lifecycle.
    pub sessions: Arc<SessionManager>,
    /// One-time codes.
    pub two_factor: Arc<TwoFactorService>,
    /// Blocks and unblocks.
    pub sanctions: Arc<SanctionCascade>,
    /// Login and token flows.
    pub auth: Arc<AuthService>,
}

impl AuthEngine {
    /// Builds every component from configuration.
    pub fn new(config: &AppConfig, deps: EngineDeps) -> Self {
        let issuer = Arc::new(TokenIssuer::new(&config.auth, deps.clock.clone()));
        let blacklist = Arc::new(BlacklistGateway::new(deps.cache.clone(), &config.blacklist));

        let sessions = Arc::new(SessionManager::new(
            deps.sessions,
            blacklist.clone(),
            deps.clock.clone(),
            config.session.max_sessions_per_user,
            Duration::from_secs(config.auth.refresh_ttl_seconds()),
        ));

        let two_factor = Arc::new(TwoFactorService::new(
            deps.users.clone(),
            deps.two_factor,
            deps.cache,
            deps.notifier,
            deps.clock.clone(),
            config.two_factor.clone(),
        ));

        let sanctions = Arc::new(SanctionCascade::new(
            deps.users.clone(),
            deps.sanctions,
            sessions.clone(),
            deps.audit,
            deps.clock,
            blacklist.permanent_ttl(),
        ));

        let auth = Arc::new(AuthService::new(
            deps.users,
            deps.credentials,
            issuer.clone(),
            sessions.clone(),
            two_factor.clone(),
            sanctions.clone(),
        ));

        tracing::info!(
            max_sessions = config.session.max_sessions_per_user,
            "Auth engine initialized"
        );

        Self {
            issuer,
            blacklist,
            sessions,
            two_factor,
            sanctions,
            auth,
        }
    }
}
