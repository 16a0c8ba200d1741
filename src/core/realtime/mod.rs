//! Realtime speech-to-speech provider module.
//!
//! # Architecture
//!
//! - [`RealtimeConnector`] opens one session per call
//! - [`BaseRealtime`] is the shared sending half of a session
//! - server events arrive on the receiver in [`RealtimeConnection`]
//!
//! The media bridge depends only on these traits, so tests can substitute a
//! scripted session for the OpenAI client.

mod base;
pub mod openai;

pub use base::{
    BaseRealtime, ConnectionState, RealtimeConfig, RealtimeConnection, RealtimeConnector,
    RealtimeError, RealtimeResult,
};
pub use openai::{
    ClientEvent, ConversationItem, OpenAIRealtime, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeConnector, OpenAIRealtimeVoice, ResponseConfig, ServerEvent, SessionConfig,
    ToolDef, TurnDetection,
};
