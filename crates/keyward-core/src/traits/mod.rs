//! Core traits defined in `keyward-core` and implemented by other crates.

pub mod audit;
pub mod cache;
pub mod clock;
pub mod credential;
pub mod notifier;

pub use audit::{AuditEntry, AuditLogger};
pub use cache::CacheProvider;
pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::CredentialVerifier;
pub use notifier::Notifier;
