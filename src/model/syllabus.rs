use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": "ec-3-5-EC-502",
        "branch": "EC",
        "year": 3,
        "semester": 5,
        "subject_code": "EC-502",
        "subject_name": "Industrial Electronics",
        "faculty_id": "fac_01",
        "faculty_name": "ARCOT VIDYA SAGAR",
        "total_topics": 25,
        "topics_completed": 23,
        "last_updated": "2026-08-30T09:00:00Z"
    })
)]
pub struct SyllabusCoverage {
    pub id: String,
    pub branch: String,
    pub year: u8,
    pub semester: u8,
    pub subject_code: String,
    pub subject_name: String,
    pub faculty_id: String,
    pub faculty_name: String,
    pub total_topics: u32,
    pub topics_completed: u32,
    #[schema(value_type = String, format = "date-time")]
    pub last_updated: DateTime<Utc>,
}
