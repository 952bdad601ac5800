//! # keyward-database
//!
//! Durable store for Keyward. Each repository is a trait with a
//! PostgreSQL implementation; operations that must be atomic run inside a
//! single SQL transaction. The `memory` feature adds [`MemoryStore`], an
//! in-process implementation of every repository trait.

pub mod connection;
#[cfg(feature = "memory")]
pub mod memory;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
