//! # keyward-core
//!
//! Core crate for Keyward. Contains configuration schemas, the unified
//! error system, and the traits through which the session engine talks
//! to its collaborators (ephemeral store, clock, credential verifier,
//! notifier, audit logger).
//!
//! This crate has **no** internal dependencies on other Keyward crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
