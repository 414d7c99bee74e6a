use crate::auth::auth::AuthUser;
use crate::model::application::{Application, ApplicationStatus, ApplicationType};
use crate::model::role::Capability;
use crate::model::user::User;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct SubmitApplicationReq {
    #[schema(example = "23210-EC-001")]
    pub pin: String,
    #[schema(example = "Leave")]
    pub app_type: ApplicationType,
    pub reason: Option<String>,
    pub purpose: Option<String>,
    pub subject: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub from_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub to_date: Option<NaiveDate>,
    /// Supporting document (medical certificate etc.).
    pub image_url: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ReviewListQuery {
    /// Filter by status, e.g. "Pending".
    pub status: Option<ApplicationStatus>,
    /// Filter by type, e.g. "Leave".
    pub app_type: Option<ApplicationType>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewReq {
    /// Only "Approved" or "Rejected" are accepted here.
    pub status: ApplicationStatus,
}

/// Per-type required fields; everything else stays optional.
fn validate(req: &SubmitApplicationReq) -> Result<(), &'static str> {
    match req.app_type {
        ApplicationType::Leave => {
            if req.reason.as_deref().unwrap_or("").trim().is_empty() {
                return Err("Leave applications require a reason");
            }
            match (req.from_date, req.to_date) {
                (Some(from), Some(to)) if from <= to => Ok(()),
                (Some(_), Some(_)) => Err("from_date cannot be after to_date"),
                _ => Err("Leave applications require from_date and to_date"),
            }
        }
        ApplicationType::Bonafide => {
            if req.purpose.as_deref().unwrap_or("").trim().is_empty() {
                Err("Bonafide applications require a purpose")
            } else {
                Ok(())
            }
        }
        ApplicationType::Tc => {
            if req.reason.as_deref().unwrap_or("").trim().is_empty() {
                Err("TC applications require a reason")
            } else {
                Ok(())
            }
        }
    }
}

async fn resolve_pin_scoped(
    pool: &MySqlPool,
    auth: &AuthUser,
    pin: &str,
) -> actix_web::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE pin = ?")
        .bind(pin.to_uppercase())
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to resolve applicant");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    Ok(user.filter(|u| auth.can_access_college(u.college_code.as_deref())))
}

/// Submit a leave / bonafide / TC application on behalf of a user.
/// New applications always start out Pending.
#[utoipa::path(
    post,
    path = "/api/v1/applications",
    request_body = SubmitApplicationReq,
    responses(
        (status = 201, description = "Application recorded", body = Application),
        (status = 400, description = "Missing required fields for the type"),
        (status = 404, description = "Unknown PIN")
    ),
    security(("bearer_auth" = [])),
    tag = "Applications"
)]
pub async fn submit_application(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SubmitApplicationReq>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();

    if let Err(msg) = validate(&req) {
        return Ok(HttpResponse::BadRequest().json(json!({"message": msg})));
    }

    let Some(user) = resolve_pin_scoped(pool.get_ref(), &auth, &req.pin).await? else {
        return Ok(HttpResponse::NotFound().json(json!({"message": "User not found"})));
    };

    let id = format!("app-{}", Uuid::new_v4());
    sqlx::query(
        r#"
        INSERT INTO applications
            (id, user_id, pin, app_type, status, reason, purpose, subject,
             from_date, to_date, image_url)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&user.pin)
    .bind(req.app_type.as_str())
    .bind(ApplicationStatus::Pending.as_str())
    .bind(&req.reason)
    .bind(&req.purpose)
    .bind(&req.subject)
    .bind(req.from_date)
    .bind(req.to_date)
    .bind(&req.image_url)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to insert application");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let created = sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = ?")
        .bind(&id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read back application");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    tracing::info!(id = %id, pin = %user.pin, app_type = %req.app_type.as_str(), "Application submitted");
    Ok(HttpResponse::Created().json(created))
}

/// Applications filed by one user, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/applications/user/{pin}",
    params(("pin" = String, Path, description = "User PIN")),
    responses(
        (status = 200, description = "Applications", body = [Application]),
        (status = 404, description = "Unknown PIN")
    ),
    security(("bearer_auth" = [])),
    tag = "Applications"
)]
pub async fn applications_for_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let Some(user) = resolve_pin_scoped(pool.get_ref(), &auth, &path.into_inner()).await? else {
        return Ok(HttpResponse::NotFound().json(json!({"message": "User not found"})));
    };

    let apps = sqlx::query_as::<_, Application>(
        "SELECT * FROM applications WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(&user.id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to list user applications");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(apps))
}

/// Review queue across the caller's college, optionally filtered by
/// status and type.
#[utoipa::path(
    get,
    path = "/api/v1/applications",
    params(ReviewListQuery),
    responses(
        (status = 200, description = "Applications", body = [Application]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Applications"
)]
pub async fn list_applications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReviewListQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ReviewApplications)?;

    let mut sql = String::from(
        "SELECT a.* FROM applications a JOIN users u ON u.id = a.user_id WHERE 1 = 1",
    );
    if !auth.is_super_admin() {
        sql.push_str(" AND u.college_code = ?");
    }
    if query.status.is_some() {
        sql.push_str(" AND a.status = ?");
    }
    if query.app_type.is_some() {
        sql.push_str(" AND a.app_type = ?");
    }
    sql.push_str(" ORDER BY a.created_at DESC");

    let mut q = sqlx::query_as::<_, Application>(&sql);
    if !auth.is_super_admin() {
        q = q.bind(auth.college_code.as_deref().unwrap_or(""));
    }
    if let Some(status) = query.status {
        q = q.bind(status.as_str());
    }
    if let Some(app_type) = query.app_type {
        q = q.bind(app_type.as_str());
    }

    let apps = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list applications");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(apps))
}

/// Approve or reject a pending application. Decided applications are
/// final; a second review attempt conflicts.
#[utoipa::path(
    put,
    path = "/api/v1/applications/{id}/status",
    request_body = ReviewReq,
    params(("id" = String, Path, description = "Application id")),
    responses(
        (status = 200, description = "Updated application", body = Application),
        (status = 400, description = "Status must be Approved or Rejected"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown application"),
        (status = 409, description = "Application already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Applications"
)]
pub async fn review_application(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<ReviewReq>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ReviewApplications)?;

    if payload.status == ApplicationStatus::Pending {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Status must be Approved or Rejected"
        })));
    }

    let id = path.into_inner();
    let err500 = |e: sqlx::Error| {
        tracing::error!(error = %e, "Failed to review application");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    };

    // Tenancy check rides on the same fetch.
    let mut sql = String::from(
        "SELECT a.* FROM applications a JOIN users u ON u.id = a.user_id WHERE a.id = ?",
    );
    if !auth.is_super_admin() {
        sql.push_str(" AND u.college_code = ?");
    }
    let mut q = sqlx::query_as::<_, Application>(&sql).bind(&id);
    if !auth.is_super_admin() {
        q = q.bind(auth.college_code.as_deref().unwrap_or(""));
    }
    let Some(app) = q.fetch_optional(pool.get_ref()).await.map_err(err500)? else {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Application not found"})));
    };

    if app.status != ApplicationStatus::Pending.as_str() {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": format!("Application is already {}", app.status)
        })));
    }

    // Guarded update: the WHERE clause keeps a concurrent reviewer from
    // flipping an already-decided application.
    let affected = sqlx::query(
        "UPDATE applications SET status = ? WHERE id = ? AND status = 'Pending'",
    )
    .bind(payload.status.as_str())
    .bind(&id)
    .execute(pool.get_ref())
    .await
    .map_err(err500)?
    .rows_affected();

    if affected == 0 {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Application was decided concurrently"
        })));
    }

    let updated = sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = ?")
        .bind(&id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(err500)?;

    tracing::info!(id = %id, status = %payload.status.as_str(), reviewer = %auth.pin, "Application reviewed");
    Ok(HttpResponse::Ok().json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(app_type: ApplicationType) -> SubmitApplicationReq {
        SubmitApplicationReq {
            pin: "23210-EC-001".into(),
            app_type,
            reason: None,
            purpose: None,
            subject: None,
            from_date: None,
            to_date: None,
            image_url: None,
        }
    }

    #[test]
    fn leave_requires_reason_and_dates() {
        let mut req = base(ApplicationType::Leave);
        assert!(validate(&req).is_err());

        req.reason = Some("Fever".into());
        assert!(validate(&req).is_err());

        req.from_date = NaiveDate::from_ymd_opt(2026, 9, 1);
        req.to_date = NaiveDate::from_ymd_opt(2026, 9, 3);
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn leave_dates_must_be_ordered() {
        let mut req = base(ApplicationType::Leave);
        req.reason = Some("Fever".into());
        req.from_date = NaiveDate::from_ymd_opt(2026, 9, 3);
        req.to_date = NaiveDate::from_ymd_opt(2026, 9, 1);
        assert_eq!(validate(&req), Err("from_date cannot be after to_date"));
    }

    #[test]
    fn bonafide_requires_purpose() {
        let mut req = base(ApplicationType::Bonafide);
        assert!(validate(&req).is_err());
        req.purpose = Some("Passport application".into());
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn tc_requires_reason() {
        let mut req = base(ApplicationType::Tc);
        assert!(validate(&req).is_err());
        req.reason = Some("Transfer to another college".into());
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn tc_serde_alias_round_trips() {
        let t: ApplicationType = serde_json::from_str("\"TC\"").unwrap();
        assert_eq!(t, ApplicationType::Tc);
    }
}
