//! Roles, as far as the sanction rules care about them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    /// May sanction regular users.
    Admin,
    /// May sanction anyone but themselves.
    Superadmin,
}

labelled!(UserRole, "user role", {
    User => "user",
    Admin => "admin",
    Superadmin => "superadmin",
});

impl UserRole {
    /// Admins and superadmins.
    pub fn is_admin(&self) -> bool {
        !matches!(self, Self::User)
    }

    /// Whether an actor holding `self` may sanction a holder of `target`.
    pub fn can_sanction(&self, target: UserRole) -> bool {
        match (self, target) {
            (Self::Superadmin, _) => true,
            (Self::Admin, Self::User) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanction_matrix() {
        assert!(UserRole::Superadmin.can_sanction(UserRole::Admin));
        assert!(UserRole::Admin.can_sanction(UserRole::User));
        assert!(!UserRole::Admin.can_sanction(UserRole::Admin));
        assert!(!UserRole::Admin.can_sanction(UserRole::Superadmin));
        assert!(!UserRole::User.can_sanction(UserRole::User));
    }

    #[test]
    fn test_labels_parse_case_insensitively() {
        assert_eq!("SUPERADMIN".parse::<UserRole>().unwrap(), UserRole::Superadmin);
        assert_eq!(UserRole::Admin.to_string(), "admin");
        let err = "viewer".parse::<UserRole>().unwrap_err();
        assert!(err.message.contains("user role"));
    }
}
