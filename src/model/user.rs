use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": "stud-23210-ec-001",
        "pin": "23210-EC-001",
        "name": "KUMMARI VAISHNAVI",
        "role_id": 6,
        "branch": "EC",
        "year": 1,
        "college_code": "210",
        "email": "kummari.vaishnavi@mira.edu",
        "email_verified": true,
        "access_revoked": false
    })
)]
pub struct User {
    #[schema(example = "stud-23210-ec-001")]
    pub id: String,

    /// Unique login handle, e.g. "23210-EC-001" or "FAC-01".
    #[schema(example = "23210-EC-001")]
    pub pin: String,

    #[schema(example = "KUMMARI VAISHNAVI")]
    pub name: String,

    /// Numeric role id, see `Role::from_id`.
    #[schema(example = 6)]
    pub role_id: u8,

    #[schema(example = "EC")]
    pub branch: String,

    #[schema(example = 1, nullable = true)]
    pub year: Option<u8>,

    /// Tenant key. NULL only for the super admin.
    #[schema(example = "210", nullable = true)]
    pub college_code: Option<String>,

    pub email: Option<String>,
    pub email_verified: bool,
    pub parent_email: Option<String>,
    pub parent_email_verified: bool,
    pub phone_number: Option<String>,

    pub image_url: Option<String>,

    /// Ground-truth photo for face verification at marking time.
    pub reference_image_url: Option<String>,

    #[serde(skip_serializing)]
    pub password: String,

    pub access_revoked: bool,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }

    /// Avatar shown on attendance records; falls back to a generated one.
    pub fn avatar(&self) -> String {
        self.image_url
            .clone()
            .unwrap_or_else(|| default_avatar(&self.name))
    }
}

/// Deterministic placeholder avatar, same provider the web client uses.
pub fn default_avatar(seed: &str) -> String {
    format!(
        "https://api.dicebear.com/8.x/initials/svg?seed={}",
        seed.replace(' ', "+")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_avatar_encodes_spaces() {
        let url = default_avatar("P. JANAKI DEVI");
        assert!(url.ends_with("seed=P.+JANAKI+DEVI"));
        assert!(!url.contains(' '));
    }
}
