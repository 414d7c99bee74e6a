use crate::services::mailer::Mailer;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SendEmailReq {
    #[schema(example = "parent@example.com")]
    pub to: String,
    #[schema(example = "Attendance alert")]
    pub subject: String,
    pub body: String,
}

#[derive(Serialize, ToSchema)]
pub struct SendEmailResponse {
    pub success: bool,
}

/// Relay endpoint for notification emails. Always answers 200 with a
/// success flag; delivery failures never surface as HTTP errors.
#[utoipa::path(
    post,
    path = "/api/send-email",
    request_body = SendEmailReq,
    responses(
        (status = 200, description = "Delivery attempted", body = SendEmailResponse),
        (status = 400, description = "Missing recipient or subject")
    ),
    tag = "Mail"
)]
pub async fn send_email(
    mailer: web::Data<Mailer>,
    payload: web::Json<SendEmailReq>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();

    if req.to.trim().is_empty() || !req.to.contains('@') {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "A valid recipient address is required"
        })));
    }
    if req.subject.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "subject is required"
        })));
    }

    let success = mailer.send(req.to.trim(), req.subject.trim(), &req.body).await;
    Ok(HttpResponse::Ok().json(SendEmailResponse { success }))
}
