use crate::auth::auth::AuthUser;
use crate::model::role::Capability;
use crate::model::timetable::Timetable;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Deserialize, IntoParams)]
pub struct TimetableQuery {
    #[param(example = "EC")]
    pub branch: String,
    #[param(example = 1)]
    pub year: u8,
}

#[derive(Deserialize, ToSchema)]
pub struct UpsertTimetableReq {
    #[schema(example = "EC")]
    pub branch: String,
    #[schema(example = 1)]
    pub year: u8,
    /// Rendered timetable image.
    pub url: String,
}

/// Current timetable for one class of the caller's college.
#[utoipa::path(
    get,
    path = "/api/v1/timetables",
    params(TimetableQuery),
    responses(
        (status = 200, description = "Timetable", body = Timetable),
        (status = 404, description = "No timetable uploaded for this class")
    ),
    security(("bearer_auth" = [])),
    tag = "Timetables"
)]
pub async fn get_timetable(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TimetableQuery>,
) -> actix_web::Result<impl Responder> {
    // The super admin has no college of their own to read from.
    let Some(college) = auth.college_code.as_deref() else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "No timetable for this class"
        })));
    };

    let row = sqlx::query_as::<_, Timetable>(
        "SELECT * FROM timetables WHERE college_code = ? AND branch = ? AND year = ?",
    )
    .bind(college)
    .bind(query.branch.to_uppercase())
    .bind(query.year)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch timetable");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match row {
        Some(t) => Ok(HttpResponse::Ok().json(t)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "No timetable for this class"
        }))),
    }
}

/// Upload or replace the timetable for one class. At most one per
/// (college, branch, year); a re-upload overwrites.
#[utoipa::path(
    put,
    path = "/api/v1/timetables",
    request_body = UpsertTimetableReq,
    responses(
        (status = 200, description = "Stored timetable", body = Timetable),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Timetables"
)]
pub async fn upsert_timetable(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpsertTimetableReq>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageTimetables)?;

    // Writes always target the caller's own college; the super admin has
    // no college to write into.
    let Some(college) = auth.college_code.clone() else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Timetables belong to a college; log in as a college admin"
        })));
    };

    if payload.url.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({"message": "url is required"})));
    }

    let branch = payload.branch.trim().to_uppercase();
    let err500 = |e: sqlx::Error| {
        tracing::error!(error = %e, "Failed to upsert timetable");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    };

    sqlx::query(
        r#"
        INSERT INTO timetables (id, college_code, branch, year, url, updated_at, updated_by)
        VALUES (?, ?, ?, ?, ?, NOW(), ?)
        ON DUPLICATE KEY UPDATE
            url = VALUES(url), updated_at = NOW(), updated_by = VALUES(updated_by)
        "#,
    )
    .bind(format!("tt-{}", Uuid::new_v4()))
    .bind(&college)
    .bind(&branch)
    .bind(payload.year)
    .bind(payload.url.trim())
    .bind(&auth.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(err500)?;

    let stored = sqlx::query_as::<_, Timetable>(
        "SELECT * FROM timetables WHERE college_code = ? AND branch = ? AND year = ?",
    )
    .bind(&college)
    .bind(&branch)
    .bind(payload.year)
    .fetch_one(pool.get_ref())
    .await
    .map_err(err500)?;

    tracing::info!(college = %college, branch = %branch, year = payload.year, "Timetable stored");
    Ok(HttpResponse::Ok().json(stored))
}
