use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8005
///   public_stream_url: "wss://voice.example.com/media-stream"
///
/// openai:
///   api_key: "sk-..."
///   realtime_url: "wss://api.openai.com/v1/realtime"
///   model: "gpt-4o-realtime-preview-2024-12-17"
///   voice: "alloy"
///   temperature: 0.8
///
/// knowledge_base:
///   api_base: "https://api.openai.com/v1"
///   assistant_id: "asst_..."
///   poll_interval_ms: 1000
///   max_polls: 30
///
/// zoho:
///   client_id: "1000.XXXX"
///   client_secret: "secret"
///   refresh_token: "1000.refresh"
///
/// calls:
///   lookup_timeout_seconds: 10
///   prefetch_timeout_seconds: 10
///   context_ttl_seconds: 600
///
/// assistant:
///   name: "Angela"
///   company: "Alfa Systems"
///
/// security:
///   cors_allowed_origins: "*"
///
/// debug: false
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openai: Option<OpenAIYaml>,
    pub knowledge_base: Option<KnowledgeBaseYaml>,
    pub zoho: Option<ZohoYaml>,
    pub calls: Option<CallsYaml>,
    pub assistant: Option<AssistantYaml>,
    pub security: Option<SecurityYaml>,
    pub debug: Option<bool>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_stream_url: Option<String>,
}

/// OpenAI Realtime configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub realtime_url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub temperature: Option<f32>,
}

/// Knowledge base configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct KnowledgeBaseYaml {
    pub api_base: Option<String>,
    pub assistant_id: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub max_polls: Option<u32>,
}

/// Zoho CRM configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ZohoYaml {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub token_url: Option<String>,
    pub api_base: Option<String>,
}

/// Call handling timeouts from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CallsYaml {
    pub lookup_timeout_seconds: Option<u64>,
    pub prefetch_timeout_seconds: Option<u64>,
    pub context_ttl_seconds: Option<u64>,
}

/// Assistant persona from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AssistantYaml {
    pub name: Option<String>,
    pub company: Option<String>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
