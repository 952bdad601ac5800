//! Device metadata attached to a session.

use serde::{Deserialize, Serialize};

/// Opaque device metadata extracted by the transport layer.
///
/// Every field is optional; the engine only uses it to decide which
/// session row a login belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Stable client-provided device identifier.
    pub device_id: Option<String>,
    /// e.g. `ios`, `android`, `web`.
    pub device_type: Option<String>,
    /// Hardware model.
    pub device_model: Option<String>,
    /// Operating system name.
    pub os: Option<String>,
    /// Operating system version.
    pub os_version: Option<String>,
    /// Client IP address.
    pub ip: Option<String>,
}

impl DeviceInfo {
    /// The upsert key for this device within a user's sessions.
    ///
    /// A device id wins when present. Otherwise the session is keyed by
    /// the `(type, model, ip)` fingerprint, so two logins from the same
    /// anonymous browser share one row.
    pub fn session_key(&self) -> String {
        match self.device_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => format!("id:{id}"),
            None => format!(
                "fp:{}|{}|{}",
                self.device_type.as_deref().unwrap_or(""),
                self.device_model.as_deref().unwrap_or(""),
                self.ip.as_deref().unwrap_or("")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_takes_precedence() {
        let device = DeviceInfo {
            device_id: Some("abc".into()),
            device_type: Some("ios".into()),
            ip: Some("10.0.0.1".into()),
            ..Default::default()
        };
        assert_eq!(device.session_key(), "id:abc");
    }

    #[test]
    fn test_fingerprint_without_device_id() {
        let device = DeviceInfo {
            device_id: Some(String::new()),
            device_type: Some("web".into()),
            device_model: None,
            ip: Some("10.0.0.1".into()),
            ..Default::default()
        };
        assert_eq!(device.session_key(), "fp:web||10.0.0.1");
    }

    #[test]
    fn test_ip_changes_fingerprint() {
        let a = DeviceInfo {
            device_type: Some("web".into()),
            ip: Some("10.0.0.1".into()),
            ..Default::default()
        };
        let b = DeviceInfo {
            ip: Some("10.0.0.2".into()),
            ..a.clone()
        };
        assert_ne!(a.session_key(), b.session_key());
    }
}
