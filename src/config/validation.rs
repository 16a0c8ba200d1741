use super::ServerConfig;

/// Temperatures accepted by the OpenAI Realtime API.
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.6..=1.2;

/// Validate a fully merged configuration.
pub(crate) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_port(config.port)?;
    validate_temperature(config.openai_realtime_temperature)?;
    validate_knowledge_base_polling(
        config.knowledge_base_poll_interval_ms,
        config.knowledge_base_max_polls,
    )?;
    validate_stream_url(config.public_stream_url.as_deref())?;
    Ok(())
}

fn validate_port(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    if port == 0 {
        return Err("PORT must be greater than 0".into());
    }
    Ok(())
}

fn validate_temperature(temperature: f32) -> Result<(), Box<dyn std::error::Error>> {
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(format!(
            "OpenAI realtime temperature must be between {} and {}, got {temperature}",
            TEMPERATURE_RANGE.start(),
            TEMPERATURE_RANGE.end()
        )
        .into());
    }
    Ok(())
}

fn validate_knowledge_base_polling(
    interval_ms: u64,
    max_polls: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if interval_ms == 0 {
        return Err("Knowledge base poll interval must be greater than 0 ms".into());
    }
    if max_polls == 0 {
        return Err("Knowledge base max polls must be greater than 0".into());
    }
    Ok(())
}

fn validate_stream_url(url: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(url) = url else {
        return Ok(());
    };

    let parsed =
        url::Url::parse(url).map_err(|e| format!("Invalid public stream URL '{url}': {e}"))?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(format!(
            "Public stream URL must use ws:// or wss://, got '{}'",
            parsed.scheme()
        )
        .into());
    }
    Ok(())
}
