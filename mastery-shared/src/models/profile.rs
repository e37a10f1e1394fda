/// User profile
///
/// ```sql
/// CREATE TABLE user_profiles (
///     id TEXT PRIMARY KEY,
///     full_name VARCHAR(255) NOT NULL,
///     phone VARCHAR(64) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use super::UserId;
use serde::{Deserialize, Serialize};

/// Profile created at signup; read-only afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Same value as the identity-provider user id
    pub id: UserId,

    pub full_name: String,

    pub phone: String,
}

/// Input for creating a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    pub id: UserId,
    pub full_name: String,
    pub phone: String,
}

impl From<CreateProfile> for Profile {
    fn from(data: CreateProfile) -> Self {
        Profile {
            id: data.id,
            full_name: data.full_name,
            phone: data.phone,
        }
    }
}
