use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
}

/// Text-generation service configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Persisted-state configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path of the single per-project state document.
    pub state_path: PathBuf,
}

/// Session lifecycle configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Age after which a session is considered expired.
    pub timeout_hours: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let generation = GenerationConfig {
            api_key: env::var("GENERATION_API_KEY").map_err(|_| AppError::Config {
                message: "GENERATION_API_KEY is required".to_string(),
            })?,
            base_url: env::var("GENERATION_BASE_URL")
                .unwrap_or_else(|_| "https://api.generation.example.com".to_string()),
            model: env::var("GENERATION_MODEL").unwrap_or_else(|_| "general-v1".to_string()),
        };

        let storage = StorageConfig {
            state_path: PathBuf::from(
                env::var("STATE_PATH").unwrap_or_else(|_| "./data/discovery-state.json".to_string()),
            ),
        };

        let session = SessionConfig {
            timeout_hours: env::var("SESSION_TIMEOUT_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(72),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
        };

        Ok(Config {
            generation,
            storage,
            session,
            logging,
            request,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { timeout_hours: 72 }
    }
}
