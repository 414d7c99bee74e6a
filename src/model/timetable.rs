use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One timetable image per (college, branch, year).
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Timetable {
    pub id: String,
    pub college_code: String,
    pub branch: String,
    pub year: u8,
    pub url: String,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}
