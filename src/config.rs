// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup into an explicit [`Config`] that is
//! handed to the ingestor and the queue consumer at construction.

use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Default queue name; must match the queue created in Terraform.
pub const DEFAULT_QUEUE_NAME: &str = "activity-recommendations";
/// Default routing key: the consumer endpoint that queued messages are pushed to.
pub const DEFAULT_ROUTING_KEY: &str = "/tasks/generate-recommendation";

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StorageBackend::Firestore),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::Invalid("STORAGE_BACKEND", s.to_string())),
        }
    }
}

/// Which work-queue transport to publish on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    /// Google Cloud Tasks, push delivery to `exchange + routing_key`
    CloudTasks,
    /// In-process queue (local development)
    Local,
}

impl FromStr for QueueBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud-tasks" | "cloudtasks" => Ok(QueueBackend::CloudTasks),
            "local" => Ok(QueueBackend::Local),
            _ => Err(ConfigError::Invalid("QUEUE_BACKEND", s.to_string())),
        }
    }
}

/// Work queue wiring, fixed at process start.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    /// Cloud Tasks location (region)
    pub location: String,
    /// Durable queue the activity messages are bound to
    pub queue_name: String,
    /// Base URL of the service that receives pushed messages
    pub exchange: String,
    /// Path under `exchange` that handles the message
    pub routing_key: String,
    /// Delivery attempts before a message is dead-lettered
    pub max_attempts: u32,
    /// Service account used for the push OIDC token
    pub service_account_email: Option<String>,
    /// Concurrent consumers for the local queue
    pub local_workers: usize,
}

impl QueueConfig {
    /// Full URL that queued messages are delivered to.
    pub fn target_url(&self) -> String {
        format!(
            "{}{}",
            self.exchange.trim_end_matches('/'),
            self.routing_key
        )
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Frontend URL (CORS)
    pub frontend_url: String,
    pub storage_backend: StorageBackend,
    /// Base URL of the user service that validates user IDs
    pub user_service_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_url: String,
    /// Upper bound on a single model call
    pub model_timeout: Duration,
    /// How long tracking waits for the queue to accept a message
    pub publish_timeout: Duration,
    pub queue: QueueConfig,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            gcp_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            storage_backend: StorageBackend::Memory,
            user_service_url: "http://localhost:8081".to_string(),
            gemini_api_key: "test_key".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_url: "http://localhost:9999".to_string(),
            model_timeout: Duration::from_secs(5),
            publish_timeout: Duration::from_millis(500),
            queue: QueueConfig {
                backend: QueueBackend::Local,
                location: "us-west1".to_string(),
                queue_name: DEFAULT_QUEUE_NAME.to_string(),
                exchange: "http://localhost:8080".to_string(),
                routing_key: DEFAULT_ROUTING_KEY.to_string(),
                max_attempts: 3,
                service_account_email: None,
                local_workers: 2,
            },
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = parse_or("PORT", 8080u16)?;
        let queue = QueueConfig {
            backend: parse_or("QUEUE_BACKEND", QueueBackend::CloudTasks)?,
            location: env::var("QUEUE_LOCATION").unwrap_or_else(|_| "us-west1".to_string()),
            queue_name: env::var("QUEUE_NAME").unwrap_or_else(|_| DEFAULT_QUEUE_NAME.to_string()),
            exchange: env::var("QUEUE_EXCHANGE")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            routing_key: match env::var("QUEUE_ROUTING_KEY") {
                Ok(raw) => parse_routing_key(&raw)?,
                Err(_) => DEFAULT_ROUTING_KEY.to_string(),
            },
            max_attempts: parse_or("QUEUE_MAX_ATTEMPTS", 5u32)?.max(1),
            service_account_email: env::var("QUEUE_SERVICE_ACCOUNT").ok(),
            local_workers: parse_or("QUEUE_LOCAL_WORKERS", 4usize)?.max(1),
        };

        Ok(Self {
            port,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            storage_backend: parse_or("STORAGE_BACKEND", StorageBackend::Firestore)?,
            user_service_url: env::var("USER_SERVICE_URL")
                .map_err(|_| ConfigError::Missing("USER_SERVICE_URL"))?,
            gemini_api_key: env::var("GEMINI_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GEMINI_API_KEY"))?,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_url: env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_API_URL.to_string()),
            model_timeout: Duration::from_secs(parse_or("MODEL_TIMEOUT_SECS", 30u64)?.max(1)),
            publish_timeout: Duration::from_millis(parse_or("PUBLISH_TIMEOUT_MS", 2000u64)?),
            queue,
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Validate a routing key: an absolute path, served as-is by the consumer
/// and appended as-is to the exchange by the publisher.
fn parse_routing_key(raw: &str) -> Result<String, ConfigError> {
    let key = raw.trim();
    let valid = key.len() > 1
        && key.starts_with('/')
        && !key.contains(|c: char| c.is_whitespace() || c == '?' || c == '#');
    if !valid {
        return Err(ConfigError::Invalid("QUEUE_ROUTING_KEY", raw.to_string()));
    }
    Ok(key.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("USER_SERVICE_URL", "http://users.internal");
        env::set_var("GEMINI_API_KEY", " test_key ");
        env::set_var("QUEUE_NAME", "recs-test");
        env::set_var("QUEUE_EXCHANGE", "https://api.example.com/");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.user_service_url, "http://users.internal");
        assert_eq!(config.gemini_api_key, "test_key");
        assert_eq!(config.queue.queue_name, "recs-test");
        assert_eq!(
            config.queue.target_url(),
            "https://api.example.com/tasks/generate-recommendation"
        );
    }

    #[test]
    fn test_routing_key_must_be_absolute_path() {
        assert_eq!(parse_routing_key(" /tasks/recs ").unwrap(), "/tasks/recs");

        for bad in ["tasks/recs", "/", "", "/tasks recs", "/tasks?x=1"] {
            assert!(
                matches!(
                    parse_routing_key(bad),
                    Err(ConfigError::Invalid("QUEUE_ROUTING_KEY", _))
                ),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!(
            "memory".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert_eq!(
            "Cloud-Tasks".parse::<QueueBackend>().unwrap(),
            QueueBackend::CloudTasks
        );
        assert!(matches!(
            "redis".parse::<QueueBackend>(),
            Err(ConfigError::Invalid("QUEUE_BACKEND", _))
        ));
    }
}
