use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,
    pub login_otp_ttl: i64,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_mail_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Campus geofence
    pub campus_lat: f64,
    pub campus_lon: f64,
    pub campus_radius_km: f64,

    // External face-verification service
    pub verify_api_url: String,
    pub verify_api_key: String,

    // Upstream mail provider
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: env::var("ACCESS_TOKEN_TTL")
                .unwrap_or_else(|_| "900".to_string()) // default 15 min
                .parse()
                .unwrap(),
            refresh_token_ttl: env::var("REFRESH_TOKEN_TTL")
                .unwrap_or_else(|_| "604800".to_string()) // default 7 days
                .parse()
                .unwrap(),
            login_otp_ttl: env::var("LOGIN_OTP_TTL")
                .unwrap_or_else(|_| "300".to_string()) // default 5 min
                .parse()
                .unwrap(),

            rate_login_per_min: env::var("RATE_LOGIN_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            rate_mail_per_min: env::var("RATE_MAIL_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_refresh_per_min: env::var("RATE_REFRESH_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            campus_lat: env::var("CAMPUS_LAT")
                .unwrap_or_else(|_| "17.6253".to_string())
                .parse()
                .unwrap(),
            campus_lon: env::var("CAMPUS_LON")
                .unwrap_or_else(|_| "78.0878".to_string())
                .parse()
                .unwrap(),
            campus_radius_km: env::var("CAMPUS_RADIUS_KM")
                .unwrap_or_else(|_| "0.5".to_string()) // 500 meters
                .parse()
                .unwrap(),

            verify_api_url: env::var("VERIFY_API_URL").expect("VERIFY_API_URL must be set"),
            verify_api_key: env::var("VERIFY_API_KEY").expect("VERIFY_API_KEY must be set"),

            mail_api_url: env::var("MAIL_API_URL").expect("MAIL_API_URL must be set"),
            mail_api_key: env::var("MAIL_API_KEY").expect("MAIL_API_KEY must be set"),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Mira Attendance System <no-reply@mira.edu>".to_string()),
        }
    }
}
