use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    model::{
        role::{Capability, Role},
        user::User,
    },
    models::{LoginReqDto, OtpVerifyDto, TokenType},
    services::mailer::Mailer,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument, warn};

#[derive(Serialize, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

async fn fetch_user_by_pin(pool: &MySqlPool, pin: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE pin = ?")
        .bind(pin.to_uppercase())
        .fetch_optional(pool)
        .await
}

/// Issue an access/refresh token pair and persist the refresh jti.
async fn issue_tokens(
    user: &User,
    pool: &MySqlPool,
    config: &Config,
) -> Result<LoginResponse, sqlx::Error> {
    let access_token = generate_access_token(
        user.id.clone(),
        user.pin.clone(),
        user.role_id,
        user.college_code.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user.id.clone(),
        user.pin.clone(),
        user.role_id,
        user.college_code.clone(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    debug!(user_id = %user.id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(&user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await?;

    // Update last_login_at (non-fatal)
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(&user.id)
        .execute(pool)
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// PIN + password login. Students have no portal account; the super admin
/// gets an emailed OTP challenge instead of immediate tokens.
#[utoipa::path(
    post,
    path = "/auth/login",
    responses(
        (status = 200, description = "Tokens issued, or OTP challenge for super admin"),
        (status = 400, description = "Missing PIN or password"),
        (status = 401, description = "Invalid credentials or revoked access"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, mailer, creds), fields(pin = %creds.pin))]
pub async fn login(
    creds: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    mailer: web::Data<Mailer>,
) -> impl Responder {
    info!("Login request received");

    if creds.pin.trim().is_empty() || creds.password.is_empty() {
        info!("Validation failed: empty PIN or password");
        return HttpResponse::BadRequest().body("PIN or password required");
    }

    let db_user = match fetch_user_by_pin(pool.get_ref(), creds.pin.trim()).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let role = match db_user.role() {
        Some(r) if r.can(Capability::PortalLogin) => r,
        _ => {
            info!("Invalid credentials: role not allowed to log in");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
    };

    if db_user.access_revoked {
        warn!(user_id = %db_user.id, "Login attempt for revoked user");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    if let Err(e) = verify_password(&creds.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    // Second factor for the super admin: emailed one-time password.
    if role == Role::SuperAdmin {
        return send_login_otp(&db_user, pool.get_ref(), &config, &mailer).await;
    }

    match issue_tokens(&db_user, pool.get_ref(), &config).await {
        Ok(tokens) => {
            info!("Login successful");
            HttpResponse::Ok().json(tokens)
        }
        Err(e) => {
            error!(error = %e, "Failed to store refresh token");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// OTP email text; the validity window tracks the configured TTL,
/// rounded up to whole minutes.
fn otp_email_body(name: &str, code: &str, ttl_secs: i64) -> String {
    let minutes = (ttl_secs + 59) / 60;
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    format!(
        "Hello {name},\n\nYour One-Time Password (OTP) for logging into Mira Attendance is: {code}\n\n\
         This OTP is valid for {minutes} {unit}.\n\nRegards,\nMira Attendance System"
    )
}

/// Generate, persist and email a 6-digit OTP. The code itself is never
/// returned to the client.
async fn send_login_otp(
    user: &User,
    pool: &MySqlPool,
    config: &Config,
    mailer: &Mailer,
) -> HttpResponse {
    let Some(email) = user.email.as_deref() else {
        error!(user_id = %user.id, "Super admin has no email on file");
        return HttpResponse::InternalServerError().body("No email on file for OTP delivery");
    };

    let otp: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    let code = otp.to_string();

    if let Err(e) = sqlx::query(
        r#"
        REPLACE INTO login_otps (user_id, code, expires_at)
        VALUES (?, ?, NOW() + INTERVAL ? SECOND)
        "#,
    )
    .bind(&user.id)
    .bind(&code)
    .bind(config.login_otp_ttl)
    .execute(pool)
    .await
    {
        error!(error = %e, "Failed to store login OTP");
        return HttpResponse::InternalServerError().finish();
    }

    let subject = "Your Mira Attendance Login OTP";
    let body = otp_email_body(&user.name, &code, config.login_otp_ttl);

    let sent = mailer.send(email, subject, &body).await;
    if !sent {
        error!("Failed to send OTP email");
    }

    HttpResponse::Ok().json(json!({
        "otp_required": true,
        "user_id": user.id,
        "otp_sent": sent
    }))
}

/// Complete a super-admin login by presenting the emailed OTP.
#[utoipa::path(
    post,
    path = "/auth/otp/verify",
    responses(
        (status = 200, description = "OTP accepted, tokens issued"),
        (status = 401, description = "Invalid or expired OTP"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn verify_otp(
    payload: web::Json<OtpVerifyDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let stored = match sqlx::query_scalar::<_, String>(
        "SELECT code FROM login_otps WHERE user_id = ? AND expires_at > NOW()",
    )
    .bind(&payload.user_id)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to look up OTP");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match stored {
        Some(code) if code == payload.otp => {}
        _ => return HttpResponse::Unauthorized().body("Invalid or expired OTP"),
    }

    // Single use: clear before issuing tokens.
    if let Err(e) = sqlx::query("DELETE FROM login_otps WHERE user_id = ?")
        .bind(&payload.user_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to clear used OTP");
        return HttpResponse::InternalServerError().finish();
    }

    let user = match sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&payload.user_id)
        .fetch_optional(pool.get_ref())
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => return HttpResponse::Unauthorized().body("Invalid or expired OTP"),
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match issue_tokens(&user, pool.get_ref(), &config).await {
        Ok(tokens) => {
            info!(user_id = %user.id, "OTP login successful");
            HttpResponse::Ok().json(tokens)
        }
        Err(e) => {
            error!(error = %e, "Failed to store refresh token");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Rotate a refresh token for a fresh access/refresh pair.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair"),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::Unauthorized().body("No token"),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::Unauthorized().finish();
    }

    // find the refresh token in DB
    let record = match sqlx::query_as::<_, (u64, String, bool)>(
        "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to look up refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let (record_id, record_user_id, _) = match record {
        Some(r) if !r.2 => r,
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // revoke the old refresh token
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    // issue a new refresh token
    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id.clone(),
        claims.sub.clone(),
        claims.role,
        claims.college_code.clone(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(&record_user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store rotated refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    // new access token
    let access_token = generate_access_token(
        claims.user_id.clone(),
        claims.sub.clone(),
        claims.role,
        claims.college_code.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    HttpResponse::Ok().json(serde_json::json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    }))
}

/// Revoke the presented refresh token. Always answers 204, even for
/// tokens that never existed.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // revoke refresh token (idempotent)
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_email_mentions_configured_ttl() {
        let body = otp_email_body("ADMIN", "482913", 300);
        assert!(body.contains("482913"));
        assert!(body.contains("valid for 5 minutes"));

        let body = otp_email_body("ADMIN", "482913", 600);
        assert!(body.contains("valid for 10 minutes"));
    }

    #[test]
    fn otp_email_rounds_ttl_up_and_singularizes() {
        assert!(otp_email_body("ADMIN", "1", 60).contains("valid for 1 minute."));
        assert!(otp_email_body("ADMIN", "1", 90).contains("valid for 2 minutes."));
    }
}
