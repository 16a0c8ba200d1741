use super::ServerConfig;
use super::env::load_from_env;
use super::yaml::YamlConfig;

/// Overwrite `target` when the YAML value is present.
fn overlay<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Overwrite an optional `target` when the YAML value is present.
fn overlay_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

/// Merge environment configuration (base) with YAML overrides.
///
/// Environment variables and defaults are loaded first; any value present in
/// the YAML document replaces the corresponding field.
pub(crate) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        overlay(&mut config.host, server.host);
        overlay(&mut config.port, server.port);
        overlay_opt(&mut config.public_stream_url, server.public_stream_url);
    }

    if let Some(openai) = yaml.openai {
        overlay_opt(&mut config.openai_api_key, openai.api_key);
        overlay(&mut config.openai_realtime_url, openai.realtime_url);
        overlay(&mut config.openai_realtime_model, openai.model);
        overlay(&mut config.openai_realtime_voice, openai.voice);
        overlay(&mut config.openai_realtime_temperature, openai.temperature);
    }

    if let Some(kb) = yaml.knowledge_base {
        overlay(&mut config.openai_api_base, kb.api_base);
        overlay(&mut config.knowledge_base_assistant_id, kb.assistant_id);
        overlay(
            &mut config.knowledge_base_poll_interval_ms,
            kb.poll_interval_ms,
        );
        overlay(&mut config.knowledge_base_max_polls, kb.max_polls);
    }

    if let Some(zoho) = yaml.zoho {
        overlay_opt(&mut config.zoho_client_id, zoho.client_id);
        overlay_opt(&mut config.zoho_client_secret, zoho.client_secret);
        overlay_opt(&mut config.zoho_refresh_token, zoho.refresh_token);
        overlay(&mut config.zoho_token_url, zoho.token_url);
        overlay(&mut config.zoho_api_base, zoho.api_base);
    }

    if let Some(calls) = yaml.calls {
        overlay(
            &mut config.lookup_timeout_seconds,
            calls.lookup_timeout_seconds,
        );
        overlay(
            &mut config.prefetch_timeout_seconds,
            calls.prefetch_timeout_seconds,
        );
        overlay(
            &mut config.call_context_ttl_seconds,
            calls.context_ttl_seconds,
        );
    }

    if let Some(assistant) = yaml.assistant {
        overlay(&mut config.assistant_name, assistant.name);
        overlay(&mut config.company_name, assistant.company);
    }

    if let Some(security) = yaml.security {
        overlay_opt(
            &mut config.cors_allowed_origins,
            security.cors_allowed_origins,
        );
    }

    overlay(&mut config.debug_requests, yaml.debug);

    Ok(config)
}
