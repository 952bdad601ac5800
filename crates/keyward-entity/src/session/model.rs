//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::device::DeviceInfo;
use super::reason::RevokedReason;

/// One logged-in device of one user.
///
/// Revoked sessions are kept until the cleanup job purges them; the
/// `revoked` flag is the authoritative revocation signal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// The refresh token currently bound to this session.
    #[serde(skip_serializing)]
    pub refresh_token: String,
    /// Upsert key, see [`DeviceInfo::session_key`].
    pub device_key: String,
    /// Client-provided device identifier.
    pub device_id: Option<String>,
    /// Device type.
    pub device_type: Option<String>,
    /// Device model.
    pub device_model: Option<String>,
    /// Operating system.
    pub os: Option<String>,
    /// Operating system version.
    pub os_version: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Whether the session has been revoked.
    pub revoked: bool,
    /// Why the session was revoked.
    pub revoked_reason: Option<RevokedReason>,
    /// When the session was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// When the row was first inserted.
    pub created_at: DateTime<Utc>,
    /// Last login or refresh on this session.
    pub last_used_at: DateTime<Utc>,
}

impl Session {
    /// Check whether the session is still usable.
    pub fn is_active(&self) -> bool {
        !self.revoked
    }

    /// Reconstruct the device metadata stored on this session.
    pub fn device(&self) -> DeviceInfo {
        DeviceInfo {
            device_id: self.device_id.clone(),
            device_type: self.device_type.clone(),
            device_model: self.device_model.clone(),
            os: self.os.clone(),
            os_version: self.os_version.clone(),
            ip: self.ip_address.clone(),
        }
    }
}
