use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub access_token_expiration_hours: u64,
    pub refresh_token_expiration_days: u64,
    /// Deployment environment embedded in API token literals (`qdk_<env>_...`).
    pub environment: String,
    pub password_reset_expiration_hours: u64,
    pub email_verification_expiration_days: u64,
    pub cors_allow_origins: Vec<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/quarterdeck".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let access_token_expiration_hours = env::var("ACCESS_TOKEN_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .unwrap_or(3);

        let refresh_token_expiration_days = env::var("REFRESH_TOKEN_EXPIRATION_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());

        let password_reset_expiration_hours = env::var("PASSWORD_RESET_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let email_verification_expiration_days = env::var("EMAIL_VERIFICATION_EXPIRATION_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Config {
            database_url,
            bind_addr,
            jwt_secret,
            access_token_expiration_hours,
            refresh_token_expiration_days,
            environment,
            password_reset_expiration_hours,
            email_verification_expiration_days,
            cors_allow_origins,
        })
    }
}
