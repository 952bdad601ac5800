//! # keyward-auth
//!
//! Session and credential-security engine for Keyward.
//!
//! ## Modules
//!
//! - `jwt`: access/refresh token issuance and verification
//! - `blacklist`: revoked refresh tokens in the ephemeral store, behind a retry policy
//! - `session`: session upsert, pruning, revocation and cleanup
//! - `two_factor`: hashed one-time codes with expiry and attempt limits
//! - `sanction`: user blocks and the session cascade they trigger
//! - `service`: login, refresh, check and logout flows
//! - `engine`: wiring over stores and collaborators

pub mod blacklist;
pub mod engine;
pub mod jwt;
pub mod outbound;
pub mod password;
pub mod sanction;
pub mod service;
pub mod session;
pub mod two_factor;

pub use blacklist::{BlacklistGateway, RetryPolicy};
pub use engine::{AuthEngine, EngineDeps};
pub use jwt::{Claims, TokenIssuer, TokenPair, TokenStatus};
pub use outbound::{TracingAuditLogger, TracingNotifier};
pub use password::Argon2Verifier;
pub use sanction::{Actor, AdminIdentity, BlockRequest, BlockStatus, SanctionCascade};
pub use service::{AuthService, AuthenticatedSession, CheckOutcome, LoginOutcome};
pub use session::{InvalidationOutcome, SessionManager};
pub use two_factor::{IssuedCode, TwoFactorService};
