//! Session domain entities.

pub mod device;
pub mod model;
pub mod reason;

pub use device::DeviceInfo;
pub use model::Session;
pub use reason::RevokedReason;
