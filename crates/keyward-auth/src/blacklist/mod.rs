//! Refresh-token blacklist in the ephemeral store.

pub mod gateway;
pub mod retry;

pub use gateway::BlacklistGateway;
pub use retry::RetryPolicy;
