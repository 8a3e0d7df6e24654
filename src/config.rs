//! Application configuration loaded from environment variables.
//!
//! Secrets (API keys, JWT signing key) are read once at startup and cached
//! in memory for the lifetime of the process.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Auth provider REST endpoint (Identity Toolkit style)
    pub identity_api_url: String,
    /// External food database endpoint
    pub food_api_url: String,
    /// Vision inference endpoint (OpenAI-compatible)
    pub vision_api_url: String,
    /// Vision model identifier
    pub vision_model: String,
    /// Minutes east of UTC used for calendar-day bucketing
    pub day_offset_minutes: i32,
    /// Dashboard cache TTL in seconds
    pub dashboard_cache_ttl_secs: u64,

    // --- Secrets ---
    /// Auth provider API key
    pub identity_api_key: String,
    /// Food database application ID
    pub food_api_app_id: String,
    /// Food database application key
    pub food_api_key: String,
    /// Vision API key
    pub vision_api_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            identity_api_url: env::var("IDENTITY_API_URL").unwrap_or_else(|_| {
                "https://identitytoolkit.googleapis.com/v1".to_string()
            }),
            food_api_url: env::var("FOOD_API_URL")
                .unwrap_or_else(|_| "https://api.edamam.com/api/food-database/v2".to_string()),
            vision_api_url: env::var("VISION_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            vision_model: env::var("VISION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            day_offset_minutes: env::var("DAY_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            dashboard_cache_ttl_secs: env::var("DASHBOARD_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),

            identity_api_key: env::var("IDENTITY_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_API_KEY"))?,
            food_api_app_id: env::var("FOOD_API_APP_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FOOD_API_APP_ID"))?,
            food_api_key: env::var("FOOD_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FOOD_API_KEY"))?,
            vision_api_key: env::var("VISION_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("VISION_API_KEY"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Default config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:8081".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            identity_api_url: "http://localhost:9099/v1".to_string(),
            food_api_url: "http://localhost:9098".to_string(),
            vision_api_url: "http://localhost:9097/v1".to_string(),
            vision_model: "test-model".to_string(),
            day_offset_minutes: 0,
            dashboard_cache_ttl_secs: 300,
            identity_api_key: "test_identity_key".to_string(),
            food_api_app_id: "test_app_id".to_string(),
            food_api_key: "test_app_key".to_string(),
            vision_api_key: "test_vision_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("IDENTITY_API_KEY", "id_key");
        env::set_var("FOOD_API_APP_ID", "app_id");
        env::set_var("FOOD_API_KEY", "app_key");
        env::set_var("VISION_API_KEY", "vision_key");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.identity_api_key, "id_key");
        assert_eq!(config.food_api_app_id, "app_id");
        assert_eq!(config.port, 8080);
        assert_eq!(config.day_offset_minutes, 0);
    }
}
