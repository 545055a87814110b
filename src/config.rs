use anyhow::Context;
use serde::Deserialize;

use crate::workflow::DEFAULT_MAX_BORROW_LIMIT;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_port: u16,
    pub max_borrow_limit: i64,
}

impl Config {
    /// Load configuration from environment variables, applying defaults where appropriate.
    ///
    /// # Errors
    /// Returns an error if mandatory variables (`DATABASE_URL`, `JWT_SECRET`) are missing or invalid,
    /// or if numeric parsing fails.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let server_port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        let max_borrow_limit = std::env::var("MAX_BORROW_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_BORROW_LIMIT);

        Ok(Self {
            database_url,
            jwt_secret,
            server_port,
            max_borrow_limit,
        })
    }
}
