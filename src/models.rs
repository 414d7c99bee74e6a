use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "FAC-01")]
    pub pin: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct OtpVerifyDto {
    pub user_id: String,
    #[schema(example = "482913")]
    pub otp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    /// PIN of the authenticated user.
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Tenant key; absent for the super admin.
    pub college_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
