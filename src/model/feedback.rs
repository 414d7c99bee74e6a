use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Feedback {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_role_id: u8,
    /// "Bug" | "Suggestion" | "Compliment"
    #[schema(example = "Suggestion")]
    pub fb_type: String,
    pub message: String,
    /// "New" | "In Progress" | "Resolved"
    #[schema(example = "New")]
    pub status: String,
    #[schema(value_type = String, format = "date-time")]
    pub submitted_at: DateTime<Utc>,
    pub is_anonymous: bool,
}
