//! Repository traits and their PostgreSQL implementations.
//!
//! Every method that mutates more than one row is atomic inside the
//! repository. Callers pass `now` explicitly so that the engine's clock,
//! not the database's, decides timestamps and expiry.

pub mod sanction;
pub mod session;
pub mod two_factor;
pub mod user;

pub use sanction::{PgSanctionRepository, SanctionRepository};
pub use session::{PgSessionRepository, SessionRepository};
pub use two_factor::{PgTwoFactorRepository, TwoFactorRepository};
pub use user::{PgUserRepository, UserRepository};

use keyward_core::error::{AppError, ErrorKind};

/// Wrap a sqlx error with context.
pub(crate) fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}
