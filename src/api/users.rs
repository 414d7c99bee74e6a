use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::model::role::{Capability, Role};
use crate::model::user::{User, default_avatar};
use crate::utils::db_utils::{build_update_sql, execute_update};
use crate::utils::{pin_cache, pin_filter};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Accounts are provisioned by staff, never self-registered; new users
/// get this password until they change it.
const DEFAULT_PASSWORD: &str = "Welcome@123";

/// Columns the generic update path refuses to touch. Identity and
/// credentials have their own flows, role changes are not supported,
/// and revocation only moves through `delete_user`.
const PROTECTED_COLUMNS: &[&str] = &[
    "id",
    "pin",
    "role_id",
    "password",
    "college_code",
    "access_revoked",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateUserReq {
    #[schema(example = "23210-EC-001")]
    pub pin: String,
    #[schema(example = "KUMMARI VAISHNAVI")]
    pub name: String,
    /// Role name, e.g. "FACULTY" or "STUDENT".
    #[schema(example = "STUDENT")]
    pub role: Role,
    #[schema(example = "EC")]
    pub branch: String,
    pub year: Option<u8>,
    /// Required when a super admin creates the user; ignored otherwise
    /// (the creator's own college always wins).
    pub college_code: Option<String>,
    pub email: Option<String>,
    pub parent_email: Option<String>,
    pub phone_number: Option<String>,
    pub image_url: Option<String>,
    pub reference_image_url: Option<String>,
    /// Initial password; defaults when omitted.
    pub password: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct UserListQuery {
    /// Filter by role name.
    pub role: Option<Role>,
    pub branch: Option<String>,
    pub year: Option<u8>,
}

#[derive(Deserialize, IntoParams)]
pub struct DeleteQuery {
    /// Super admin only: permanently remove a principal together with
    /// every account in their college.
    #[serde(default)]
    pub hard: bool,
}

#[derive(Serialize, ToSchema)]
pub struct PinAvailability {
    pub pin: String,
    pub available: bool,
}

async fn pin_exists_in_db(pool: &MySqlPool, pin: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE pin = ?")
        .bind(pin)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Layered availability check: moka cache first (recently seen PINs),
/// then the cuckoo filter (a clean miss is definitive), and only on a
/// possible hit the database.
async fn pin_is_taken(pool: &MySqlPool, pin: &str) -> Result<bool, sqlx::Error> {
    if pin_cache::is_taken(pin).await {
        return Ok(true);
    }
    if !pin_filter::might_exist(pin) {
        return Ok(false);
    }
    let taken = pin_exists_in_db(pool, pin).await?;
    if taken {
        pin_cache::mark_taken(pin).await;
    }
    Ok(taken)
}

/// Check whether a PIN is free before provisioning an account.
#[utoipa::path(
    get,
    path = "/api/v1/users/check-pin/{pin}",
    params(("pin" = String, Path, description = "Candidate PIN")),
    responses(
        (status = 200, description = "Availability verdict", body = PinAvailability),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn check_pin(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    let pin = path.into_inner().trim().to_uppercase();
    let taken = pin_is_taken(pool.get_ref(), &pin).await.map_err(|e| {
        tracing::error!(error = %e, "PIN availability check failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(PinAvailability {
        pin,
        available: !taken,
    }))
}

/// Provision a new account.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "PIN already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUserReq>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    let req = payload.into_inner();
    let pin = req.pin.trim().to_uppercase();
    if pin.is_empty() || req.name.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "pin and name are required"
        })));
    }

    match req.role {
        Role::SuperAdmin => {
            return Ok(HttpResponse::Forbidden().json(json!({
                "message": "The super admin account cannot be created through the API"
            })));
        }
        Role::Principal => auth.require(Capability::ManagePrincipals)?,
        _ => {}
    }

    // Tenancy: a fenced admin can only create inside their own college.
    // The super admin must say which college the account belongs to.
    let college_code = if auth.is_super_admin() {
        match req.college_code {
            Some(c) if !c.trim().is_empty() => Some(c.trim().to_string()),
            _ => {
                return Ok(HttpResponse::BadRequest().json(json!({
                    "message": "college_code is required when creating users as super admin"
                })));
            }
        }
    } else {
        auth.college_code.clone()
    };

    if pin_is_taken(pool.get_ref(), &pin).await.map_err(|e| {
        tracing::error!(error = %e, "PIN availability check failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "PIN is already registered"
        })));
    }

    let id = format!("usr-{}", Uuid::new_v4());
    let name = req.name.trim().to_string();
    let image_url = req
        .image_url
        .clone()
        .unwrap_or_else(|| default_avatar(&name));
    let password_hash =
        hash_password(req.password.as_deref().unwrap_or(DEFAULT_PASSWORD));

    let result = sqlx::query(
        r#"
        INSERT INTO users
            (id, pin, name, role_id, branch, year, college_code,
             email, parent_email, phone_number, image_url, reference_image_url, password)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&pin)
    .bind(&name)
    .bind(req.role.id())
    .bind(req.branch.trim().to_uppercase())
    .bind(req.year)
    .bind(&college_code)
    .bind(&req.email)
    .bind(&req.parent_email)
    .bind(&req.phone_number)
    .bind(&image_url)
    .bind(&req.reference_image_url)
    .bind(&password_hash)
    .execute(pool.get_ref())
    .await;

    if let Err(e) = result {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return Ok(HttpResponse::Conflict().json(json!({
                    "message": "PIN is already registered"
                })));
            }
        }
        tracing::error!(error = %e, "Failed to insert user");
        return Err(actix_web::error::ErrorInternalServerError(
            "Internal Server Error",
        ));
    }

    pin_filter::insert(&pin);
    pin_cache::mark_taken(&pin).await;
    tracing::info!(pin = %pin, role = %req.role, "User created");

    let created = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read back created user");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Created().json(created))
}

/// List accounts within the caller's college, optionally filtered.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Accounts", body = [User]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserListQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    let mut sql = String::from("SELECT * FROM users WHERE 1 = 1");
    if !auth.is_super_admin() {
        sql.push_str(" AND college_code = ?");
    }
    if query.role.is_some() {
        sql.push_str(" AND role_id = ?");
    }
    if query.branch.is_some() {
        sql.push_str(" AND branch = ?");
    }
    if query.year.is_some() {
        sql.push_str(" AND year = ?");
    }
    sql.push_str(" ORDER BY role_id, pin");

    let mut q = sqlx::query_as::<_, User>(&sql);
    if !auth.is_super_admin() {
        q = q.bind(auth.college_code.as_deref().unwrap_or(""));
    }
    if let Some(role) = query.role {
        q = q.bind(role.id());
    }
    if let Some(branch) = &query.branch {
        q = q.bind(branch.to_uppercase());
    }
    if let Some(year) = query.year {
        q = q.bind(year);
    }

    let users = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list users");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(users))
}

async fn fetch_user_scoped(
    pool: &MySqlPool,
    auth: &AuthUser,
    pin: &str,
) -> actix_web::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE pin = ?")
        .bind(pin.to_uppercase())
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch user");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(user.filter(|u| auth.can_access_college(u.college_code.as_deref())))
}

/// Fetch one account by PIN.
#[utoipa::path(
    get,
    path = "/api/v1/users/{pin}",
    params(("pin" = String, Path, description = "User PIN")),
    responses(
        (status = 200, description = "Account", body = User),
        (status = 404, description = "Unknown PIN")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    match fetch_user_scoped(pool.get_ref(), &auth, &path.into_inner()).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Ok(HttpResponse::NotFound().json(json!({"message": "User not found"}))),
    }
}

/// Partial update of profile fields. Identity, role and credentials are
/// off limits here.
#[utoipa::path(
    put,
    path = "/api/v1/users/{pin}",
    request_body = Value,
    params(("pin" = String, Path, description = "User PIN")),
    responses(
        (status = 200, description = "Updated account", body = User),
        (status = 400, description = "Empty or malformed payload"),
        (status = 403, description = "Attempted to change a protected column"),
        (status = 404, description = "Unknown PIN")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    let Some(user) = fetch_user_scoped(pool.get_ref(), &auth, &path.into_inner()).await? else {
        return Ok(HttpResponse::NotFound().json(json!({"message": "User not found"})));
    };

    // Principal accounts are managed by the super admin only, same as
    // the delete path.
    if matches!(user.role(), Some(Role::SuperAdmin | Role::Principal)) {
        auth.require(Capability::ManagePrincipals)?;
    }

    if let Some(obj) = payload.as_object() {
        if let Some(key) = obj.keys().find(|k| PROTECTED_COLUMNS.contains(&k.as_str())) {
            return Ok(HttpResponse::Forbidden().json(json!({
                "message": format!("Column '{key}' cannot be changed through this endpoint")
            })));
        }
    }

    let update = build_update_sql("users", &payload, "id", &user.id)?;
    execute_update(pool.get_ref(), update).await.map_err(|e| {
        tracing::error!(error = %e, user_id = %user.id, "Failed to update user");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let updated = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&user.id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read back updated user");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Remove an account.
///
/// The super admin row is untouchable. Deleting a principal revokes
/// their access by default; a hard delete (super admin only) removes the
/// principal together with every account in their college.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{pin}",
    params(
        ("pin" = String, Path, description = "User PIN"),
        DeleteQuery
    ),
    responses(
        (status = 200, description = "Principal access revoked"),
        (status = 204, description = "Account deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown PIN")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    query: web::Query<DeleteQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    let Some(user) = fetch_user_scoped(pool.get_ref(), &auth, &path.into_inner()).await? else {
        return Ok(HttpResponse::NotFound().json(json!({"message": "User not found"})));
    };

    let err500 = |e: sqlx::Error| {
        tracing::error!(error = %e, "Failed to delete user");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    };

    match user.role() {
        Some(Role::SuperAdmin) => {
            return Ok(HttpResponse::Forbidden().json(json!({
                "message": "The super admin account cannot be deleted"
            })));
        }
        Some(Role::Principal) => {
            auth.require(Capability::ManagePrincipals)?;

            if query.hard {
                // Removing a college: the principal goes together with
                // every account fenced to their college_code.
                let mut tx = pool.get_ref().begin().await.map_err(err500)?;
                if let Some(code) = &user.college_code {
                    let pins = sqlx::query_scalar::<_, String>(
                        "SELECT pin FROM users WHERE college_code = ?",
                    )
                    .bind(code)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(err500)?;

                    sqlx::query("DELETE FROM users WHERE college_code = ?")
                        .bind(code)
                        .execute(&mut *tx)
                        .await
                        .map_err(err500)?;

                    tx.commit().await.map_err(err500)?;

                    for pin in &pins {
                        pin_filter::remove(pin);
                        pin_cache::PIN_CACHE.invalidate(&pin.to_uppercase()).await;
                    }
                    tracing::warn!(
                        college = %code,
                        removed = pins.len(),
                        "Principal hard-deleted together with college accounts"
                    );
                } else {
                    sqlx::query("DELETE FROM users WHERE id = ?")
                        .bind(&user.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(err500)?;
                    tx.commit().await.map_err(err500)?;
                    pin_filter::remove(&user.pin);
                    pin_cache::PIN_CACHE.invalidate(&user.pin.to_uppercase()).await;
                }
                return Ok(HttpResponse::NoContent().finish());
            }

            sqlx::query("UPDATE users SET access_revoked = 1 WHERE id = ?")
                .bind(&user.id)
                .execute(pool.get_ref())
                .await
                .map_err(err500)?;
            tracing::info!(pin = %user.pin, "Principal access revoked");
            return Ok(HttpResponse::Ok().json(json!({
                "message": "Principal access revoked; pass hard=true to remove the college"
            })));
        }
        _ => {}
    }

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(&user.id)
        .execute(pool.get_ref())
        .await
        .map_err(err500)?;

    pin_filter::remove(&user.pin);
    pin_cache::PIN_CACHE.invalidate(&user.pin.to_uppercase()).await;
    tracing::info!(pin = %user.pin, "User deleted");

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_columns_cover_identity_and_credentials() {
        for col in ["id", "pin", "role_id", "password", "college_code"] {
            assert!(PROTECTED_COLUMNS.contains(&col));
        }
        assert!(!PROTECTED_COLUMNS.contains(&"phone_number"));
    }

    #[test]
    fn revocation_flag_cannot_ride_the_generic_update() {
        // Un-revoking a principal must go through delete_user's flow,
        // never a profile PUT.
        assert!(PROTECTED_COLUMNS.contains(&"access_revoked"));
    }

    #[test]
    fn create_payload_accepts_role_names() {
        let req: CreateUserReq = serde_json::from_value(json!({
            "pin": "fac-07",
            "name": "P. JANAKI DEVI",
            "role": "FACULTY",
            "branch": "cs"
        }))
        .unwrap();
        assert_eq!(req.role, Role::Faculty);
        assert!(req.password.is_none());
    }
}
