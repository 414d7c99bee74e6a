use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum ApplicationType {
    Leave,
    Bonafide,
    #[serde(rename = "TC")]
    Tc,
}

impl ApplicationType {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationType::Leave => "Leave",
            ApplicationType::Bonafide => "Bonafide",
            ApplicationType::Tc => "TC",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

/// A leave / bonafide / TC application. The free-form payload of the
/// original is flattened into nullable columns.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Application {
    pub id: String,
    pub user_id: String,
    pub pin: String,
    #[schema(example = "Leave")]
    pub app_type: String,
    #[schema(example = "Pending")]
    pub status: String,

    pub reason: Option<String>,
    pub purpose: Option<String>,
    pub subject: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub from_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub to_date: Option<NaiveDate>,
    pub image_url: Option<String>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
