use crate::auth::auth::AuthUser;
use crate::model::role::Capability;
use crate::model::syllabus::SyllabusCoverage;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
pub struct SyllabusQuery {
    pub branch: Option<String>,
    pub year: Option<u8>,
    pub semester: Option<u8>,
}

#[derive(Deserialize, ToSchema)]
pub struct SyllabusProgressReq {
    #[schema(example = 23)]
    pub topics_completed: u32,
}

/// Syllabus coverage rows, fenced to the caller's college via the
/// owning faculty member. Rows carry no college of their own.
#[utoipa::path(
    get,
    path = "/api/v1/syllabus",
    params(SyllabusQuery),
    responses(
        (status = 200, description = "Coverage rows", body = [SyllabusCoverage]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Syllabus"
)]
pub async fn list_syllabus(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SyllabusQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::UpdateSyllabus)?;

    let mut sql = String::from(
        "SELECT s.* FROM syllabus_coverage s JOIN users u ON u.id = s.faculty_id WHERE 1 = 1",
    );
    if !auth.is_super_admin() {
        sql.push_str(" AND u.college_code = ?");
    }
    if query.branch.is_some() {
        sql.push_str(" AND s.branch = ?");
    }
    if query.year.is_some() {
        sql.push_str(" AND s.year = ?");
    }
    if query.semester.is_some() {
        sql.push_str(" AND s.semester = ?");
    }
    sql.push_str(" ORDER BY s.branch, s.year, s.semester, s.subject_code");

    let mut q = sqlx::query_as::<_, SyllabusCoverage>(&sql);
    if !auth.is_super_admin() {
        q = q.bind(auth.college_code.as_deref().unwrap_or(""));
    }
    if let Some(branch) = &query.branch {
        q = q.bind(branch.to_uppercase());
    }
    if let Some(year) = query.year {
        q = q.bind(year);
    }
    if let Some(semester) = query.semester {
        q = q.bind(semester);
    }

    let rows = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list syllabus coverage");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Record progress on one subject. Completion can move in either
/// direction (corrections happen) but never past the topic total.
#[utoipa::path(
    put,
    path = "/api/v1/syllabus/{id}/progress",
    request_body = SyllabusProgressReq,
    params(("id" = String, Path, description = "Coverage row id")),
    responses(
        (status = 200, description = "Updated row", body = SyllabusCoverage),
        (status = 400, description = "topics_completed exceeds total_topics"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown row")
    ),
    security(("bearer_auth" = [])),
    tag = "Syllabus"
)]
pub async fn update_syllabus_progress(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<SyllabusProgressReq>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::UpdateSyllabus)?;

    let id = path.into_inner();
    let err500 = |e: sqlx::Error| {
        tracing::error!(error = %e, "Failed to update syllabus progress");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    };

    let mut sql = String::from(
        "SELECT s.* FROM syllabus_coverage s JOIN users u ON u.id = s.faculty_id WHERE s.id = ?",
    );
    if !auth.is_super_admin() {
        sql.push_str(" AND u.college_code = ?");
    }
    let mut q = sqlx::query_as::<_, SyllabusCoverage>(&sql).bind(&id);
    if !auth.is_super_admin() {
        q = q.bind(auth.college_code.as_deref().unwrap_or(""));
    }
    let Some(row) = q.fetch_optional(pool.get_ref()).await.map_err(err500)? else {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Coverage row not found"})));
    };

    if payload.topics_completed > row.total_topics {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": format!(
                "topics_completed ({}) cannot exceed total_topics ({})",
                payload.topics_completed, row.total_topics
            )
        })));
    }

    sqlx::query(
        "UPDATE syllabus_coverage SET topics_completed = ?, last_updated = NOW() WHERE id = ?",
    )
    .bind(payload.topics_completed)
    .bind(&id)
    .execute(pool.get_ref())
    .await
    .map_err(err500)?;

    let updated = sqlx::query_as::<_, SyllabusCoverage>(
        "SELECT * FROM syllabus_coverage WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(err500)?;

    tracing::info!(id = %id, completed = payload.topics_completed, "Syllabus progress updated");
    Ok(HttpResponse::Ok().json(updated))
}
