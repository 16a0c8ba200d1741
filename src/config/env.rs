use std::env;
use std::str::FromStr;

use super::{ServerConfig, defaults, validation};

/// Every environment variable the loader reads.
pub(crate) const ENV_KEYS: &[&str] = &[
    "HOST",
    "PORT",
    "PUBLIC_STREAM_URL",
    "OPENAI_API_KEY",
    "OPENAI_REALTIME_URL",
    "OPENAI_REALTIME_MODEL",
    "OPENAI_REALTIME_VOICE",
    "OPENAI_REALTIME_TEMPERATURE",
    "OPENAI_API_BASE",
    "OPENAI_ASSISTANT_ID",
    "KB_POLL_INTERVAL_MS",
    "KB_MAX_POLLS",
    "ZOHO_CLIENT_ID",
    "ZOHO_CLIENT_SECRET",
    "ZOHO_REFRESH_TOKEN",
    "ZOHO_TOKEN_URL",
    "ZOHO_API_BASE",
    "LOOKUP_TIMEOUT_SECONDS",
    "PREFETCH_TIMEOUT_SECONDS",
    "CALL_CONTEXT_TTL_SECONDS",
    "ASSISTANT_NAME",
    "COMPANY_NAME",
    "CORS_ALLOWED_ORIGINS",
    "DEBUG",
];

/// Read a non-empty environment variable.
fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when it is unset.
fn parse_env<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| format!("Invalid value for {key} ('{raw}'): {e}").into()),
        None => Ok(default),
    }
}

fn parse_bool(key: &str) -> bool {
    env_var(key).is_some_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        )
    })
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to the values in [`defaults`]. The resulting
    /// configuration is validated before it is returned.
    ///
    /// # Errors
    /// Returns an error if a numeric variable cannot be parsed or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = load_from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }
}

/// Build a configuration from the environment without validating it.
pub(crate) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    Ok(ServerConfig {
        host: env_or("HOST", defaults::HOST),
        port: parse_env("PORT", defaults::PORT)?,
        public_stream_url: env_var("PUBLIC_STREAM_URL"),

        openai_api_key: env_var("OPENAI_API_KEY"),
        openai_realtime_url: env_or("OPENAI_REALTIME_URL", defaults::OPENAI_REALTIME_URL),
        openai_realtime_model: env_or("OPENAI_REALTIME_MODEL", defaults::OPENAI_REALTIME_MODEL),
        openai_realtime_voice: env_or("OPENAI_REALTIME_VOICE", defaults::OPENAI_REALTIME_VOICE),
        openai_realtime_temperature: parse_env(
            "OPENAI_REALTIME_TEMPERATURE",
            defaults::OPENAI_REALTIME_TEMPERATURE,
        )?,

        openai_api_base: env_or("OPENAI_API_BASE", defaults::OPENAI_API_BASE),
        knowledge_base_assistant_id: env_or(
            "OPENAI_ASSISTANT_ID",
            defaults::KNOWLEDGE_BASE_ASSISTANT_ID,
        ),
        knowledge_base_poll_interval_ms: parse_env(
            "KB_POLL_INTERVAL_MS",
            defaults::KNOWLEDGE_BASE_POLL_INTERVAL_MS,
        )?,
        knowledge_base_max_polls: parse_env("KB_MAX_POLLS", defaults::KNOWLEDGE_BASE_MAX_POLLS)?,

        zoho_client_id: env_var("ZOHO_CLIENT_ID"),
        zoho_client_secret: env_var("ZOHO_CLIENT_SECRET"),
        zoho_refresh_token: env_var("ZOHO_REFRESH_TOKEN"),
        zoho_token_url: env_or("ZOHO_TOKEN_URL", defaults::ZOHO_TOKEN_URL),
        zoho_api_base: env_or("ZOHO_API_BASE", defaults::ZOHO_API_BASE),

        lookup_timeout_seconds: parse_env(
            "LOOKUP_TIMEOUT_SECONDS",
            defaults::LOOKUP_TIMEOUT_SECONDS,
        )?,
        prefetch_timeout_seconds: parse_env(
            "PREFETCH_TIMEOUT_SECONDS",
            defaults::PREFETCH_TIMEOUT_SECONDS,
        )?,
        call_context_ttl_seconds: parse_env(
            "CALL_CONTEXT_TTL_SECONDS",
            defaults::CALL_CONTEXT_TTL_SECONDS,
        )?,

        assistant_name: env_or("ASSISTANT_NAME", defaults::ASSISTANT_NAME),
        company_name: env_or("COMPANY_NAME", defaults::COMPANY_NAME),

        cors_allowed_origins: Some(env_or(
            "CORS_ALLOWED_ORIGINS",
            defaults::CORS_ALLOWED_ORIGINS,
        )),
        debug_requests: parse_bool("DEBUG"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cleanup_env_vars() {
        unsafe {
            for key in ENV_KEYS {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8005);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.openai_realtime_voice, "alloy");
        assert_eq!(config.openai_realtime_temperature, 0.8);
        assert_eq!(config.knowledge_base_poll_interval_ms, 1000);
        assert_eq!(config.knowledge_base_max_polls, 30);
        assert_eq!(config.zoho_token_url, defaults::ZOHO_TOKEN_URL);
        assert_eq!(config.cors_allowed_origins.as_deref(), Some("*"));
        assert!(!config.debug_requests);
    }

    #[test]
    #[serial]
    fn test_from_env_reads_values() {
        cleanup_env_vars();

        unsafe {
            env::set_var("PORT", "9001");
            env::set_var("OPENAI_API_KEY", "sk-test");
            env::set_var("OPENAI_ASSISTANT_ID", "asst_custom");
            env::set_var("KB_MAX_POLLS", "5");
            env::set_var("ZOHO_REFRESH_TOKEN", "refresh");
            env::set_var("CALL_CONTEXT_TTL_SECONDS", "0");
            env::set_var("DEBUG", "TRUE");
        }

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.port, 9001);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.knowledge_base_assistant_id, "asst_custom");
        assert_eq!(config.knowledge_base_max_polls, 5);
        assert_eq!(config.zoho_refresh_token.as_deref(), Some("refresh"));
        assert_eq!(config.call_context_ttl(), None);
        assert!(config.debug_requests);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_empty_values_are_unset() {
        cleanup_env_vars();

        unsafe {
            env::set_var("OPENAI_API_KEY", "   ");
            env::set_var("HOST", "");
        }

        let config = ServerConfig::from_env().unwrap();
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.host, "0.0.0.0");

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_number() {
        cleanup_env_vars();

        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let result = ServerConfig::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_validation_failure() {
        cleanup_env_vars();

        unsafe {
            env::set_var("KB_POLL_INTERVAL_MS", "0");
        }

        let result = ServerConfig::from_env();
        assert!(result.is_err());

        cleanup_env_vars();
    }
}
