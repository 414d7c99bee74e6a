use crate::auth::auth::AuthUser;
use crate::geo::{CampusGeofence, Coordinates, LocationStamp};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::role::Capability;
use crate::model::user::User;
use crate::services::verification::FaceVerifier;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendanceReq {
    /// PIN of the faculty member or student being marked.
    #[schema(example = "23210-EC-001")]
    pub pin: String,
    /// Freshly captured photo, base64 data URL.
    pub live_image: String,
    /// Device position; optional. Absence only loses the location
    /// metadata, it does not block marking.
    pub coordinates: Option<Coordinates>,
}

#[derive(Serialize, ToSchema)]
pub struct MarkAttendanceResponse {
    pub record: AttendanceRecord,
    /// True when a record for this user and day already existed and was
    /// returned unchanged.
    pub already_marked: bool,
}

#[derive(Deserialize, IntoParams)]
pub struct DateQuery {
    /// Calendar date, YYYY-MM-DD.
    pub date: NaiveDate,
}

#[derive(Deserialize, IntoParams)]
pub struct DateRangeQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct DashboardStats {
    #[schema(example = 42)]
    pub present_today: i64,
    #[schema(example = 8)]
    pub absent_today: i64,
    /// Share of Present records over the last 30 days, rounded percent.
    #[schema(example = 87)]
    pub attendance_percentage: i64,
}

/// Assemble the row to persist. The user snapshot is taken here and never
/// updated afterwards; location columns are set together or not at all.
fn build_record(
    user: &User,
    now: NaiveDateTime,
    stamp: Option<LocationStamp>,
) -> AttendanceRecord {
    let (location_status, coordinates, distance_km) = match stamp {
        Some(s) => (
            Some(s.status.as_str().to_string()),
            Some(s.coordinates),
            Some(s.distance_km),
        ),
        None => (None, None, None),
    };

    AttendanceRecord {
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        user_pin: user.pin.clone(),
        user_avatar: user.avatar(),
        date: now.date(),
        status: AttendanceStatus::Present.as_str().to_string(),
        marked_at: Some(now.time()),
        location_status,
        coordinates,
        distance_km,
    }
}

async fn fetch_record(
    pool: &MySqlPool,
    user_id: &str,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance WHERE user_id = ? AND date = ?",
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

async fn insert_record(pool: &MySqlPool, rec: &AttendanceRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO attendance
            (user_id, user_name, user_pin, user_avatar, date, status, marked_at,
             location_status, coordinates, distance_km)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&rec.user_id)
    .bind(&rec.user_name)
    .bind(&rec.user_pin)
    .bind(&rec.user_avatar)
    .bind(rec.date)
    .bind(&rec.status)
    .bind(rec.marked_at)
    .bind(&rec.location_status)
    .bind(&rec.coordinates)
    .bind(rec.distance_km)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Mark attendance for a faculty member or student.
///
/// Flow: look up the subject, run the face-verification gate against the
/// stored reference photo, then write the daily record. At most one record
/// exists per (user, day); a repeat marking returns the existing record
/// unchanged.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/mark",
    request_body = MarkAttendanceReq,
    responses(
        (status = 200, description = "Attendance recorded (or already recorded today)", body = MarkAttendanceResponse),
        (status = 403, description = "Face verification failed, or role not subject to marking"),
        (status = 404, description = "No user with that PIN"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    verifier: web::Data<FaceVerifier>,
    fence: web::Data<CampusGeofence>,
    payload: web::Json<MarkAttendanceReq>,
) -> actix_web::Result<impl Responder> {
    // Same college fence as the read paths: subjects outside the
    // caller's college read as not-found.
    let Some(user) = resolve_pin_scoped(pool.get_ref(), &auth, payload.pin.trim()).await? else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "User not found for attendance marking"
        })));
    };

    match user.role() {
        Some(r) if r.can(Capability::MarkableAttendance) => {}
        _ => {
            return Ok(HttpResponse::Forbidden().json(serde_json::json!({
                "message": "Attendance marking applies to faculty and students only"
            })));
        }
    }

    // Verification gate. No reference photo means the gate cannot pass:
    // verification failures never default to allowing attendance.
    let Some(reference) = user.reference_image_url.as_deref() else {
        return Ok(HttpResponse::Forbidden().json(serde_json::json!({
            "message": "No reference photo on file; verification cannot proceed"
        })));
    };

    let verdict = verifier.verify(reference, &payload.live_image).await;
    if !verdict.is_match {
        tracing::info!(user_id = %user.id, reason = %verdict.reason, "Face verification rejected");
        return Ok(HttpResponse::Forbidden().json(serde_json::json!({
            "message": "Face verification failed",
            "reason": verdict.reason,
            "quality": verdict.quality,
        })));
    }

    let now = Local::now().naive_local();

    // Idempotent no-op: the first record of the day wins, repeat attempts
    // get it back unchanged.
    if let Some(existing) = fetch_record(pool.get_ref(), &user.id, now.date())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to check existing attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
    {
        return Ok(HttpResponse::Ok().json(MarkAttendanceResponse {
            record: existing,
            already_marked: true,
        }));
    }

    let stamp = payload.coordinates.map(|c| fence.stamp(c));
    let record = build_record(&user, now, stamp);

    match insert_record(pool.get_ref(), &record).await {
        Ok(()) => Ok(HttpResponse::Ok().json(MarkAttendanceResponse {
            record,
            already_marked: false,
        })),
        Err(e) => {
            // Lost a same-day race: the unique (user_id, date) key kept the
            // first record; return it unchanged.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    let existing = fetch_record(pool.get_ref(), &user.id, now.date())
                        .await
                        .map_err(|e| {
                            tracing::error!(error = %e, "Failed to re-read attendance after race");
                            actix_web::error::ErrorInternalServerError("Internal Server Error")
                        })?;
                    if let Some(existing) = existing {
                        return Ok(HttpResponse::Ok().json(MarkAttendanceResponse {
                            record: existing,
                            already_marked: true,
                        }));
                    }
                }
            }

            tracing::error!(error = %e, user_id = %record.user_id, "Failed to insert attendance");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Tenant-scoped SELECT over attendance joined to users; pushes the
/// college fence into SQL instead of filtering in memory.
async fn fetch_scoped(
    pool: &MySqlPool,
    auth: &AuthUser,
    condition: &str,
    binds: &[&str],
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let mut sql = format!(
        "SELECT a.* FROM attendance a JOIN users u ON u.id = a.user_id WHERE {}",
        condition
    );
    if !auth.is_super_admin() {
        sql.push_str(" AND u.college_code = ?");
    }
    sql.push_str(" ORDER BY a.date DESC, a.user_pin");

    let mut query = sqlx::query_as::<_, AttendanceRecord>(&sql);
    for b in binds {
        query = query.bind(*b);
    }
    if !auth.is_super_admin() {
        query = query.bind(auth.college_code.as_deref().unwrap_or(""));
    }
    query.fetch_all(pool).await
}

/// All records for one calendar day, within the caller's college.
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(DateQuery),
    responses(
        (status = 200, description = "Records for the day", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_for_date(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ViewReports)?;

    let date = query.date.to_string();
    let records = fetch_scoped(pool.get_ref(), &auth, "a.date = ?", &[date.as_str()])
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch attendance for date");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(records))
}

/// Records between two dates inclusive, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/range",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Records in range", body = [AttendanceRecord]),
        (status = 400, description = "start after end"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_for_range(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DateRangeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ViewReports)?;

    if query.start > query.end {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "start cannot be after end"
        })));
    }

    let start = query.start.to_string();
    let end = query.end.to_string();
    let records = fetch_scoped(
        pool.get_ref(),
        &auth,
        "a.date BETWEEN ? AND ?",
        &[start.as_str(), end.as_str()],
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch attendance range");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(records))
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
            tracing::error!(error = %e, "Failed to resolve pin");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    // Cross-college lookups behave as not-found.
    Ok(user.filter(|u| auth.can_access_college(u.college_code.as_deref())))
}

/// Attendance history for one user, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/user/{pin}",
    params(("pin" = String, Path, description = "User PIN")),
    responses(
        (status = 200, description = "History", body = [AttendanceRecord]),
        (status = 404, description = "Unknown PIN")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_for_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let Some(user) = resolve_pin_scoped(pool.get_ref(), &auth, &path.into_inner()).await? else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "User not found"
        })));
    };

    let records = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance WHERE user_id = ? ORDER BY date DESC",
    )
    .bind(&user.id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch user attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(records))
}

/// Today's record for one user, if any.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/user/{pin}/today",
    params(("pin" = String, Path, description = "User PIN")),
    responses(
        (status = 200, description = "Today's record", body = AttendanceRecord),
        (status = 404, description = "Unknown PIN or not marked today")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let Some(user) = resolve_pin_scoped(pool.get_ref(), &auth, &path.into_inner()).await? else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "User not found"
        })));
    };

    let today = Local::now().date_naive();
    let record = fetch_record(pool.get_ref(), &user.id, today)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch today's attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match record {
        Some(r) => Ok(HttpResponse::Ok().json(r)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Not marked today"
        }))),
    }
}

/// Dashboard stats over the caller's college: present/absent today
/// (absence is the complement of students with no record, it is never
/// stored by the marking path) and a 30-day percentage.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/stats",
    responses(
        (status = 200, description = "Dashboard stats", body = DashboardStats),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn dashboard_stats(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ViewReports)?;

    let err500 = |e: sqlx::Error| {
        tracing::error!(error = %e, "Failed to compute dashboard stats");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    };

    let college_clause = if auth.is_super_admin() {
        ""
    } else {
        " AND u.college_code = ?"
    };
    let college = auth.college_code.as_deref().unwrap_or("");

    // Student role id is 6; see model::role.
    let total_sql = format!(
        "SELECT COUNT(*) FROM users u WHERE u.role_id = 6{}",
        college_clause
    );
    let mut total_q = sqlx::query_scalar::<_, i64>(&total_sql);
    if !auth.is_super_admin() {
        total_q = total_q.bind(college);
    }
    let total_students = total_q.fetch_one(pool.get_ref()).await.map_err(err500)?;

    let present_sql = format!(
        r#"
        SELECT COUNT(*) FROM attendance a
        JOIN users u ON u.id = a.user_id
        WHERE a.date = CURDATE() AND a.status = 'Present' AND u.role_id = 6{}
        "#,
        college_clause
    );
    let mut present_q = sqlx::query_scalar::<_, i64>(&present_sql);
    if !auth.is_super_admin() {
        present_q = present_q.bind(college);
    }
    let present_today = present_q.fetch_one(pool.get_ref()).await.map_err(err500)?;

    let month_sql = format!(
        r#"
        SELECT COUNT(*), CAST(COALESCE(SUM(a.status = 'Present'), 0) AS SIGNED) FROM attendance a
        JOIN users u ON u.id = a.user_id
        WHERE a.date >= CURDATE() - INTERVAL 30 DAY AND u.role_id = 6{}
        "#,
        college_clause
    );
    let mut month_q = sqlx::query_as::<_, (i64, i64)>(&month_sql);
    if !auth.is_super_admin() {
        month_q = month_q.bind(college);
    }
    let (recent_total, recent_present) =
        month_q.fetch_one(pool.get_ref()).await.map_err(err500)?;

    let attendance_percentage = if recent_total > 0 {
        ((recent_present as f64 / recent_total as f64) * 100.0).round() as i64
    } else {
        0
    };

    Ok(HttpResponse::Ok().json(DashboardStats {
        present_today,
        absent_today: total_students - present_today,
        attendance_percentage,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeofenceStatus;
    use chrono::{NaiveDate, NaiveTime};

    fn sample_user() -> User {
        User {
            id: "stud-23210-ec-001".into(),
            pin: "23210-EC-001".into(),
            name: "KUMMARI VAISHNAVI".into(),
            role_id: 6,
            branch: "EC".into(),
            year: Some(1),
            college_code: Some("210".into()),
            email: None,
            email_verified: true,
            parent_email: None,
            parent_email_verified: false,
            phone_number: None,
            image_url: Some("https://example.com/a.png".into()),
            reference_image_url: Some("https://example.com/ref.png".into()),
            password: "hash".into(),
            access_revoked: false,
            last_login_at: None,
        }
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 30)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
    }

    #[test]
    fn record_without_coordinates_has_no_location_fields() {
        let rec = build_record(&sample_user(), noon(), None);
        assert_eq!(rec.status, "Present");
        assert!(rec.location_status.is_none());
        assert!(rec.coordinates.is_none());
        assert!(rec.distance_km.is_none());
    }

    #[test]
    fn record_snapshots_user_fields() {
        let user = sample_user();
        let rec = build_record(&user, noon(), None);
        assert_eq!(rec.user_id, user.id);
        assert_eq!(rec.user_name, user.name);
        assert_eq!(rec.user_pin, user.pin);
        assert_eq!(rec.user_avatar, "https://example.com/a.png");
        assert_eq!(rec.date, noon().date());
        assert_eq!(rec.marked_at, Some(noon().time()));
    }

    #[test]
    fn marking_subject_is_fenced_to_callers_college() {
        use crate::model::role::Role;

        let subject = sample_user(); // college 210

        let other_college = AuthUser {
            user_id: "hod-1".into(),
            pin: "HOD-01".into(),
            role: Role::Hod,
            college_code: Some("002".into()),
        };
        assert!(!other_college.can_access_college(subject.college_code.as_deref()));

        let same_college = AuthUser {
            user_id: "hod-2".into(),
            pin: "HOD-02".into(),
            role: Role::Hod,
            college_code: Some("210".into()),
        };
        assert!(same_college.can_access_college(subject.college_code.as_deref()));
    }

    #[test]
    fn record_carries_location_stamp_when_present() {
        let stamp = LocationStamp {
            status: GeofenceStatus::OnCampus,
            coordinates: "17.62530, 78.08780".into(),
            distance_km: 0.12,
        };
        let rec = build_record(&sample_user(), noon(), Some(stamp));
        assert_eq!(rec.location_status.as_deref(), Some("On-Campus"));
        assert_eq!(rec.coordinates.as_deref(), Some("17.62530, 78.08780"));
        assert_eq!(rec.distance_km, Some(0.12));
    }
}
