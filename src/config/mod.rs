//! Configuration module for the voice bridge server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//! The configuration is split into logical submodules for maintainability.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use voice_bridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Default values shared by the environment and YAML loaders.
pub mod defaults {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 8005;
    pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";
    pub const OPENAI_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";
    pub const OPENAI_REALTIME_VOICE: &str = "alloy";
    pub const OPENAI_REALTIME_TEMPERATURE: f32 = 0.8;
    pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
    pub const KNOWLEDGE_BASE_ASSISTANT_ID: &str = "asst_6k8qTQnQx8aWS0RdPC8JX609";
    pub const KNOWLEDGE_BASE_POLL_INTERVAL_MS: u64 = 1000;
    pub const KNOWLEDGE_BASE_MAX_POLLS: u32 = 30;
    pub const ZOHO_TOKEN_URL: &str = "https://accounts.zoho.com/oauth/v2/token";
    pub const ZOHO_API_BASE: &str = "https://www.zohoapis.com/crm/v2";
    pub const LOOKUP_TIMEOUT_SECONDS: u64 = 10;
    pub const PREFETCH_TIMEOUT_SECONDS: u64 = 10;
    pub const CALL_CONTEXT_TTL_SECONDS: u64 = 600;
    pub const ASSISTANT_NAME: &str = "Angela";
    pub const COMPANY_NAME: &str = "Alfa Systems";
    pub const CORS_ALLOWED_ORIGINS: &str = "*";
}

/// Server configuration
///
/// Contains all configuration needed to run the voice bridge, including:
/// - Server settings (host, port, public stream URL)
/// - OpenAI Realtime session settings
/// - Knowledge base (Assistants API) settings
/// - Zoho CRM credentials
/// - Call handling timeouts
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Public `wss://` URL Twilio should stream to. When unset the URL is
    /// derived from the webhook request's `Host` header.
    pub public_stream_url: Option<String>,

    // OpenAI Realtime
    /// OpenAI API key for the Realtime session and the knowledge base
    pub openai_api_key: Option<String>,
    pub openai_realtime_url: String,
    pub openai_realtime_model: String,
    pub openai_realtime_voice: String,
    pub openai_realtime_temperature: f32,

    // Knowledge base (OpenAI Assistants)
    pub openai_api_base: String,
    pub knowledge_base_assistant_id: String,
    pub knowledge_base_poll_interval_ms: u64,
    pub knowledge_base_max_polls: u32,

    // Zoho CRM
    pub zoho_client_id: Option<String>,
    pub zoho_client_secret: Option<String>,
    pub zoho_refresh_token: Option<String>,
    pub zoho_token_url: String,
    pub zoho_api_base: String,

    // Call handling
    /// Per-request timeout for CRM and knowledge-base HTTP calls
    pub lookup_timeout_seconds: u64,
    /// Upper bound on the caller prefetch performed by the call-setup webhook
    pub prefetch_timeout_seconds: u64,
    /// Age after which an unconsumed call context is discarded (0 keeps entries forever)
    pub call_context_ttl_seconds: u64,

    // Assistant persona
    pub assistant_name: String,
    pub company_name: String,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,

    /// Log raw webhook requests at debug level
    pub debug_requests: bool,
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.zoho_client_secret {
            secret.zeroize();
        }
        if let Some(ref mut token) = self.zoho_refresh_token {
            token.zeroize();
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            public_stream_url: None,
            openai_api_key: None,
            openai_realtime_url: defaults::OPENAI_REALTIME_URL.to_string(),
            openai_realtime_model: defaults::OPENAI_REALTIME_MODEL.to_string(),
            openai_realtime_voice: defaults::OPENAI_REALTIME_VOICE.to_string(),
            openai_realtime_temperature: defaults::OPENAI_REALTIME_TEMPERATURE,
            openai_api_base: defaults::OPENAI_API_BASE.to_string(),
            knowledge_base_assistant_id: defaults::KNOWLEDGE_BASE_ASSISTANT_ID.to_string(),
            knowledge_base_poll_interval_ms: defaults::KNOWLEDGE_BASE_POLL_INTERVAL_MS,
            knowledge_base_max_polls: defaults::KNOWLEDGE_BASE_MAX_POLLS,
            zoho_client_id: None,
            zoho_client_secret: None,
            zoho_refresh_token: None,
            zoho_token_url: defaults::ZOHO_TOKEN_URL.to_string(),
            zoho_api_base: defaults::ZOHO_API_BASE.to_string(),
            lookup_timeout_seconds: defaults::LOOKUP_TIMEOUT_SECONDS,
            prefetch_timeout_seconds: defaults::PREFETCH_TIMEOUT_SECONDS,
            call_context_ttl_seconds: defaults::CALL_CONTEXT_TTL_SECONDS,
            assistant_name: defaults::ASSISTANT_NAME.to_string(),
            company_name: defaults::COMPANY_NAME.to_string(),
            cors_allowed_origins: Some(defaults::CORS_ALLOWED_ORIGINS.to_string()),
            debug_requests: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // .env is loaded in main.rs, so by this point it is already part of the environment
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Stream URL handed to Twilio for the given webhook `Host` header.
    pub fn stream_url_for_host(&self, host: &str) -> String {
        match &self.public_stream_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("wss://{host}/media-stream"),
        }
    }

    /// True when all three Zoho OAuth values are present
    pub fn has_zoho_credentials(&self) -> bool {
        [
            &self.zoho_client_id,
            &self.zoho_client_secret,
            &self.zoho_refresh_token,
        ]
        .iter()
        .all(|value| value.as_deref().is_some_and(|v| !v.is_empty()))
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_seconds)
    }

    pub fn prefetch_timeout(&self) -> Duration {
        Duration::from_secs(self.prefetch_timeout_seconds)
    }

    pub fn knowledge_base_poll_interval(&self) -> Duration {
        Duration::from_millis(self.knowledge_base_poll_interval_ms)
    }

    /// Context expiry, or `None` when unconsumed contexts are kept until taken
    pub fn call_context_ttl(&self) -> Option<Duration> {
        (self.call_context_ttl_seconds > 0).then(|| Duration::from_secs(self.call_context_ttl_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    fn cleanup_env_vars() {
        unsafe {
            for key in super::env::ENV_KEYS {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_address() {
        let mut config = ServerConfig::default();
        config.host = "127.0.0.1".to_string();
        config.port = 9000;
        assert_eq!(config.address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_stream_url_derived_from_host() {
        let config = ServerConfig::default();
        assert_eq!(
            config.stream_url_for_host("abc.ngrok.app"),
            "wss://abc.ngrok.app/media-stream"
        );
    }

    #[test]
    fn test_stream_url_prefers_public_url() {
        let mut config = ServerConfig::default();
        config.public_stream_url = Some("wss://voice.example.com/media-stream".to_string());
        assert_eq!(
            config.stream_url_for_host("ignored.example.com"),
            "wss://voice.example.com/media-stream"
        );
    }

    #[test]
    fn test_has_zoho_credentials() {
        let mut config = ServerConfig::default();
        assert!(!config.has_zoho_credentials());

        config.zoho_client_id = Some("id".to_string());
        config.zoho_client_secret = Some("secret".to_string());
        assert!(!config.has_zoho_credentials());

        config.zoho_refresh_token = Some(String::new());
        assert!(!config.has_zoho_credentials());

        config.zoho_refresh_token = Some("refresh".to_string());
        assert!(config.has_zoho_credentials());
    }

    #[test]
    fn test_call_context_ttl_zero_disables_expiry() {
        let mut config = ServerConfig::default();
        assert_eq!(config.call_context_ttl(), Some(Duration::from_secs(600)));

        config.call_context_ttl_seconds = 0;
        assert_eq!(config.call_context_ttl(), None);
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_only() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080
  public_stream_url: "wss://voice.example.com/media-stream"

openai:
  api_key: "yaml-openai-key"
  voice: "shimmer"

knowledge_base:
  poll_interval_ms: 250
  max_polls: 10
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.public_stream_url.as_deref(),
            Some("wss://voice.example.com/media-stream")
        );
        assert_eq!(config.openai_api_key.as_deref(), Some("yaml-openai-key"));
        assert_eq!(config.openai_realtime_voice, "shimmer");
        assert_eq!(config.knowledge_base_poll_interval_ms, 250);
        assert_eq!(config.knowledge_base_max_polls, 10);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"

zoho:
  client_id: "yaml-client"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("HOST", "10.0.0.1");
            env::set_var("PORT", "9100");
            env::set_var("ZOHO_CLIENT_ID", "env-client");
            env::set_var("ZOHO_CLIENT_SECRET", "env-secret");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.zoho_client_id.as_deref(), Some("yaml-client"));
        // ENV values survive where YAML is silent
        assert_eq!(config.port, 9100);
        assert_eq!(config.zoho_client_secret.as_deref(), Some("env-secret"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_yaml() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }

    #[test]
    #[serial]
    fn test_from_file_rejects_invalid_values() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(
            &config_path,
            r#"
openai:
  temperature: 2.5
"#,
        )
        .unwrap();

        let result = ServerConfig::from_file(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("temperature"));
    }

    #[test]
    #[serial]
    fn test_from_file_partial_config_uses_defaults() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(
            &config_path,
            r#"
server:
  port: 9000
"#,
        )
        .unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.openai_realtime_model, defaults::OPENAI_REALTIME_MODEL);
        assert_eq!(config.knowledge_base_max_polls, 30);
        assert_eq!(config.call_context_ttl_seconds, 600);
        assert!(!config.debug_requests);
    }
}
