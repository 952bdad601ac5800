//! User blocks and the session cascade they trigger.

pub mod actor;
pub mod cascade;

pub use actor::{Actor, AdminIdentity, SystemAuthority};
pub use cascade::{BlockRequest, BlockStatus, SanctionCascade};
