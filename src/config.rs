//! Process configuration, read once at startup.

use std::env;

use crate::market;

/// Runtime settings, built in `main` and handed to the services that need
/// them. Nothing reads the environment after startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub finnhub_api_key: String,
    pub finnhub_base_url: String,
    pub jwt_secret: Vec<u8>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        let database_url = env::var("DATABASE_URL").ok();
        let finnhub_api_key = env::var("FINNHUB_API_KEY").unwrap_or_default();
        let finnhub_base_url = env::var("FINNHUB_BASE_URL")
            .unwrap_or_else(|_| market::DEFAULT_BASE_URL.to_string());
        // Dev fallback; set JWT_SECRET in any real deployment.
        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "dev-secret".to_string())
            .into_bytes();

        Self {
            port,
            database_url,
            finnhub_api_key,
            finnhub_base_url,
            jwt_secret,
        }
    }
}
