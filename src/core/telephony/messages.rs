//! Twilio Media Streams WebSocket message types.
//!
//! Every frame is a JSON text message tagged by its `event` field. Audio
//! payloads are base64 G.711 u-law and are relayed without decoding.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Custom stream parameter carrying the call identifier from the TwiML reply.
pub const CALL_SID_PARAMETER: &str = "callSid";

// =============================================================================
// Incoming Messages (Twilio -> Server)
// =============================================================================

/// Events received on the media stream WebSocket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TwilioInboundEvent {
    /// Socket connected; informational only
    Connected,

    /// Stream metadata, sent once before any media
    Start { start: StreamStart },

    /// One audio frame from the caller
    Media { media: MediaPayload },

    /// Caller hung up or the stream was stopped
    Stop,

    /// `mark`, `dtmf` and anything else the bridge does not act on
    #[serde(other)]
    Unknown,
}

/// Body of a `start` event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    #[serde(default)]
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
}

impl StreamStart {
    /// Call identifier passed through the TwiML `<Parameter>`, falling back to
    /// the stream's own `callSid`.
    pub fn call_id(&self) -> Option<&str> {
        self.custom_parameters
            .get(CALL_SID_PARAMETER)
            .map(String::as_str)
            .or(self.call_sid.as_deref())
            .filter(|sid| !sid.is_empty())
    }
}

/// Audio frame payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Base64 audio, forwarded untouched
    #[serde(default)]
    pub payload: String,
}

// =============================================================================
// Outgoing Messages (Server -> Twilio)
// =============================================================================

/// Events sent on the media stream WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TwilioOutboundEvent {
    /// Audio to play to the caller
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaPayload,
    },
}

impl TwilioOutboundEvent {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        TwilioOutboundEvent::Media {
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload: payload.into(),
            },
        }
    }
}

/// Routes for the transport sender task.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportRoute {
    /// Serialize and send as a text frame
    Outgoing(TwilioOutboundEvent),
    /// Send a close frame and stop the sender
    Close,
}
