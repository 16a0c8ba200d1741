//! Per-call `session.update` payload.

use crate::config::ServerConfig;
use crate::core::context_store::CallerContext;
use crate::core::prompt::PromptTemplate;
use crate::core::realtime::openai::{
    InputAudioTranscription, OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, ResponseConfig,
    SessionConfig, TRANSCRIPTION_MODEL, ToolDef, TurnDetection,
};
use crate::core::tools::tool_definitions;

const MODALITIES: [&str; 2] = ["text", "audio"];

fn modalities() -> Vec<String> {
    MODALITIES.iter().map(|m| m.to_string()).collect()
}

/// Everything in the session configuration that does not depend on the call.
#[derive(Debug, Clone)]
pub struct SessionTemplate {
    pub prompt: PromptTemplate,
    pub voice: OpenAIRealtimeVoice,
    pub temperature: f32,
    pub tools: Vec<ToolDef>,
}

impl SessionTemplate {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            prompt: PromptTemplate::from_config(config),
            voice: OpenAIRealtimeVoice::from_str_or_default(&config.openai_realtime_voice),
            temperature: config.openai_realtime_temperature,
            tools: tool_definitions(&config.company_name),
        }
    }

    /// Session configuration for one call.
    pub fn render(&self, context: Option<&CallerContext>) -> SessionConfig {
        SessionConfig {
            modalities: Some(modalities()),
            instructions: Some(self.prompt.render(context)),
            voice: Some(self.voice),
            input_audio_format: Some(OpenAIRealtimeAudioFormat::G711Ulaw),
            output_audio_format: Some(OpenAIRealtimeAudioFormat::G711Ulaw),
            input_audio_transcription: Some(InputAudioTranscription {
                model: TRANSCRIPTION_MODEL.to_string(),
            }),
            turn_detection: Some(TurnDetection::server_vad()),
            tools: Some(self.tools.clone()),
            temperature: Some(self.temperature),
        }
    }

    /// Response options for the opening greeting.
    pub fn greeting(&self) -> ResponseConfig {
        ResponseConfig {
            modalities: Some(modalities()),
        }
    }
}

impl Default for SessionTemplate {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}
