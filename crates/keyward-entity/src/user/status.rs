use serde::{Deserialize, Serialize};

/// Whether the account may log in. Only sanctions change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Blocked,
}

labelled!(UserStatus, "user status", {
    Active => "active",
    Blocked => "blocked",
});
