use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stored attendance status. The marking path only ever writes `Present`;
/// `Absent` exists for historical imports and is otherwise inferred at
/// report time as the complement of students with no record for the day.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

/// One row per (user, date); the unique key carries the idempotence
/// guarantee. User fields are a snapshot taken at marking time and are
/// never retroactively updated.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "user_id": "fac_01",
        "user_name": "ARCOT VIDYA SAGAR",
        "user_pin": "FAC-01",
        "user_avatar": "https://api.dicebear.com/8.x/initials/svg?seed=ARCOT+VIDYA+SAGAR",
        "date": "2026-08-30",
        "status": "Present",
        "marked_at": "09:12:44",
        "location_status": "On-Campus",
        "coordinates": "17.62530, 78.08780",
        "distance_km": 0.0
    })
)]
pub struct AttendanceRecord {
    pub user_id: String,
    pub user_name: String,
    pub user_pin: String,
    pub user_avatar: String,

    #[schema(value_type = String, format = "date", example = "2026-08-30")]
    pub date: NaiveDate,

    pub status: String,

    /// Wall-clock time of marking; NULL on imported rows.
    #[schema(value_type = Option<String>, example = "09:12:44")]
    pub marked_at: Option<NaiveTime>,

    /// "On-Campus" / "Off-Campus". All three location columns are set
    /// together, or none at all when no coordinates were supplied.
    #[schema(nullable = true)]
    pub location_status: Option<String>,
    #[schema(nullable = true, example = "17.62530, 78.08780")]
    pub coordinates: Option<String>,
    #[schema(nullable = true)]
    pub distance_km: Option<f64>,
}
