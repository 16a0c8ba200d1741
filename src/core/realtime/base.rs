//! Base traits and types for the realtime AI session.
//!
//! A [`RealtimeConnector`] opens a session and hands back a
//! [`RealtimeConnection`]: a shared [`BaseRealtime`] handle for sending
//! client events plus the receiving half of the server event stream. The
//! media bridge owns the receiver in its AI→transport loop and shares the
//! handle with the transport→AI loop.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::openai::{ClientEvent, ConversationItem, ResponseConfig, ServerEvent, SessionConfig};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed or no credential is configured
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Connection settings for a realtime session.
#[derive(Clone, Default)]
pub struct RealtimeConfig {
    /// API key; `None` aborts before any connection attempt
    pub api_key: Option<String>,
    /// WebSocket endpoint without query string
    pub endpoint: String,
    /// Model passed as the `model` query parameter
    pub model: String,
}

impl fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection state for realtime providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the provider
    #[default]
    Disconnected,
    /// Connected and ready
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

// =============================================================================
// Base Trait
// =============================================================================

/// Sending half of an open realtime session.
///
/// Implementations must be safe to share between the two relay loops of a
/// call. [`BaseRealtime::disconnect`] must be idempotent.
#[async_trait]
pub trait BaseRealtime: Send + Sync {
    /// Send one client event. Events are delivered in call order.
    async fn send_event(&self, event: ClientEvent) -> RealtimeResult<()>;

    /// Close the session.
    async fn disconnect(&self) -> RealtimeResult<()>;

    /// Check if the session is connected and ready.
    fn is_ready(&self) -> bool;

    /// Get the current connection state.
    fn get_connection_state(&self) -> ConnectionState;

    // -------------------------------------------------------------------------
    // Session Control
    // -------------------------------------------------------------------------

    /// Replace the session configuration.
    async fn update_session(&self, session: SessionConfig) -> RealtimeResult<()> {
        self.send_event(ClientEvent::SessionUpdate { session }).await
    }

    /// Append a base64 audio payload to the input buffer.
    async fn append_audio(&self, audio: String) -> RealtimeResult<()> {
        self.send_event(ClientEvent::InputAudioBufferAppend { audio })
            .await
    }

    /// Request the model to generate a response.
    async fn create_response(&self, response: Option<ResponseConfig>) -> RealtimeResult<()> {
        self.send_event(ClientEvent::ResponseCreate { response }).await
    }

    /// Submit a function call result.
    async fn submit_function_result(&self, call_id: &str, output: &str) -> RealtimeResult<()> {
        self.send_event(ClientEvent::ConversationItemCreate {
            item: ConversationItem::function_call_output(call_id, output),
            previous_item_id: None,
        })
        .await
    }
}

// =============================================================================
// Connector
// =============================================================================

/// An open session: the shared send handle and the server event stream.
pub struct RealtimeConnection {
    pub handle: Arc<dyn BaseRealtime>,
    /// Ends when the provider closes the session
    pub events: mpsc::Receiver<ServerEvent>,
}

/// Opens realtime sessions, one per call.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(&self) -> RealtimeResult<RealtimeConnection>;
}
