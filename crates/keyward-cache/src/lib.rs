//! # keyward-cache
//!
//! Ephemeral store implementations for Keyward. Supports two modes:
//!
//! - **memory**: In-process store using [moka](https://crates.io/crates/moka)
//!   with per-entry TTLs
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration. Both hold
//! the refresh-token blacklist and the one-time-code rate-limit markers.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::CacheManager;
