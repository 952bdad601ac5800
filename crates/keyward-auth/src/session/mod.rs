//! Session lifecycle management: creation, pruning, revocation, cleanup.

pub mod manager;

pub use manager::{InvalidationOutcome, SessionManager};
