//! Shared ephemeral store for multi-node deployments.

pub mod client;
pub mod operations;

pub use client::RedisClient;
pub use operations::RedisCacheProvider;
