//! HTTP and WebSocket request handlers
//!
//! - `api` - Service banner and health check
//! - `incoming_call` - Call-setup webhook returning TwiML
//! - `media_stream` - Media stream WebSocket bridged to the realtime session

pub mod api;
pub mod incoming_call;
pub mod media_stream;

pub use incoming_call::incoming_call;
pub use media_stream::media_stream_handler;
