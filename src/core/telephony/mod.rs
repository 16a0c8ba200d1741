//! Telephony transport protocol.
//!
//! - [`messages`]: Twilio Media Streams WebSocket events
//! - [`twiml`]: TwiML reply that connects a call to the media stream

pub mod messages;
pub mod twiml;

pub use messages::{
    CALL_SID_PARAMETER, MediaPayload, StreamStart, TransportRoute, TwilioInboundEvent,
    TwilioOutboundEvent,
};
pub use twiml::connect_stream;
