use crate::auth::auth::AuthUser;
use crate::model::feedback::Feedback;
use crate::model::role::Capability;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;
use uuid::Uuid;

const FEEDBACK_TYPES: &[&str] = &["Bug", "Suggestion", "Compliment"];
const FEEDBACK_STATUSES: &[&str] = &["New", "In Progress", "Resolved"];

#[derive(Deserialize, ToSchema)]
pub struct SubmitFeedbackReq {
    /// "Bug" | "Suggestion" | "Compliment"
    #[schema(example = "Suggestion")]
    pub fb_type: String,
    pub message: String,
    /// When set, the stored row carries no name.
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct FeedbackStatusReq {
    /// "New" | "In Progress" | "Resolved"
    #[schema(example = "Resolved")]
    pub status: String,
}

/// File feedback as the logged-in user. Anonymous submissions keep the
/// author's role for triage but drop the name.
#[utoipa::path(
    post,
    path = "/api/v1/feedback",
    request_body = SubmitFeedbackReq,
    responses(
        (status = 201, description = "Feedback recorded", body = Feedback),
        (status = 400, description = "Unknown type or empty message")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn submit_feedback(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SubmitFeedbackReq>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();

    if !FEEDBACK_TYPES.contains(&req.fb_type.as_str()) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": format!("fb_type must be one of {:?}", FEEDBACK_TYPES)
        })));
    }
    if req.message.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({"message": "message is required"})));
    }

    let id = format!("fb-{}", Uuid::new_v4());
    let user_name = if req.is_anonymous {
        "Anonymous".to_string()
    } else {
        // Display name comes from the users table, not the token.
        sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE id = ?")
            .bind(&auth.user_id)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to resolve feedback author");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?
            .unwrap_or_else(|| auth.pin.clone())
    };

    sqlx::query(
        r#"
        INSERT INTO feedback (id, user_id, user_name, user_role_id, fb_type, message, status, is_anonymous)
        VALUES (?, ?, ?, ?, ?, ?, 'New', ?)
        "#,
    )
    .bind(&id)
    .bind(&auth.user_id)
    .bind(&user_name)
    .bind(auth.role.id())
    .bind(&req.fb_type)
    .bind(req.message.trim())
    .bind(req.is_anonymous)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to insert feedback");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let created = sqlx::query_as::<_, Feedback>("SELECT * FROM feedback WHERE id = ?")
        .bind(&id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read back feedback");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Created().json(created))
}

/// Feedback triage list, newest first. Fenced to the caller's college
/// through the author's account; the super admin sees everything.
#[utoipa::path(
    get,
    path = "/api/v1/feedback",
    responses(
        (status = 200, description = "Feedback entries", body = [Feedback]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn list_feedback(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ReviewFeedback)?;

    let mut sql = String::from("SELECT f.* FROM feedback f JOIN users u ON u.id = f.user_id");
    if !auth.is_super_admin() {
        sql.push_str(" WHERE u.college_code = ?");
    }
    sql.push_str(" ORDER BY f.submitted_at DESC");

    let mut q = sqlx::query_as::<_, Feedback>(&sql);
    if !auth.is_super_admin() {
        q = q.bind(auth.college_code.as_deref().unwrap_or(""));
    }

    let rows = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list feedback");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Move a feedback entry through triage.
#[utoipa::path(
    put,
    path = "/api/v1/feedback/{id}/status",
    request_body = FeedbackStatusReq,
    params(("id" = String, Path, description = "Feedback id")),
    responses(
        (status = 200, description = "Updated entry", body = Feedback),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown entry")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn update_feedback_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<FeedbackStatusReq>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ReviewFeedback)?;

    if !FEEDBACK_STATUSES.contains(&payload.status.as_str()) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": format!("status must be one of {:?}", FEEDBACK_STATUSES)
        })));
    }

    let id = path.into_inner();
    let err500 = |e: sqlx::Error| {
        tracing::error!(error = %e, "Failed to update feedback status");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    };

    // Same college fence as the listing; out-of-tenant ids read as
    // not-found.
    let mut sql = String::from(
        "SELECT COUNT(*) FROM feedback f JOIN users u ON u.id = f.user_id WHERE f.id = ?",
    );
    if !auth.is_super_admin() {
        sql.push_str(" AND u.college_code = ?");
    }
    let mut q = sqlx::query_scalar::<_, i64>(&sql).bind(&id);
    if !auth.is_super_admin() {
        q = q.bind(auth.college_code.as_deref().unwrap_or(""));
    }
    let visible = q.fetch_one(pool.get_ref()).await.map_err(err500)?;
    if visible == 0 {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Feedback not found"})));
    }

    sqlx::query("UPDATE feedback SET status = ? WHERE id = ?")
        .bind(&payload.status)
        .bind(&id)
        .execute(pool.get_ref())
        .await
        .map_err(err500)?;

    let updated = sqlx::query_as::<_, Feedback>("SELECT * FROM feedback WHERE id = ?")
        .bind(&id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(err500)?;

    Ok(HttpResponse::Ok().json(updated))
}
