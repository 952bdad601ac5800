//! Who is acting on a sanction.

use serde::Serialize;
use uuid::Uuid;

use keyward_entity::user::UserRole;

/// A human administrator performing a block or unblock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    /// The admin's user id.
    pub id: Uuid,
    /// The admin's email, recorded in the audit trail.
    pub email: String,
    /// The admin's role, which bounds whom they may sanction.
    pub role: UserRole,
}

/// The engine itself, used for lazy expiry and the expiry sweep.
///
/// Only this crate can construct one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemAuthority {
    _private: (),
}

impl SystemAuthority {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// The identity on whose behalf a sanction changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A human administrator.
    Admin(AdminIdentity),
    /// The engine acting on its own schedule.
    System(SystemAuthority),
}

impl Actor {
    /// Id recorded on sanctions and audit entries; `None` for the system.
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Self::Admin(admin) => Some(admin.id),
            Self::System(_) => None,
        }
    }

    /// Email recorded on audit entries; `None` for the system.
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Admin(admin) => Some(admin.email.as_str()),
            Self::System(_) => None,
        }
    }
}

impl From<AdminIdentity> for Actor {
    fn from(admin: AdminIdentity) -> Self {
        Self::Admin(admin)
    }
}
