//! OpenAI Realtime API module.
//!
//! Speech-to-speech sessions over OpenAI's Realtime WebSocket API.
//!
//! # Features
//!
//! - Bidirectional audio streaming
//! - Server-side Voice Activity Detection (VAD)
//! - Input transcription
//! - Function calling support
//!
//! # Supported Voices
//!
//! alloy, ash, ballad, coral, echo, sage, shimmer, verse
//!
//! # Audio Format
//!
//! Sessions are configured for G.711 u-law at 8kHz in both directions, the
//! native format of telephony media streams.

mod client;
mod config;
mod messages;

pub use client::{OpenAIRealtime, OpenAIRealtimeConnector};
pub use config::{
    OPENAI_REALTIME_BETA, OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, TRANSCRIPTION_MODEL,
};
pub use messages::{
    ApiError, ClientEvent, ConversationItem, FunctionCallTracker, InputAudioTranscription,
    ResponseConfig, ResponseInfo, ServerEvent, SessionConfig, SessionInfo, ToolDef, TurnDetection,
};
