//! OpenAI Realtime API client implementation.
//!
//! [`OpenAIRealtimeConnector`] opens one WebSocket session per call and
//! spawns a connection task that owns the socket. Client events reach the
//! task through a bounded channel held by [`OpenAIRealtime`]; server events
//! leave it through the receiver returned in the
//! [`RealtimeConnection`](crate::core::realtime::RealtimeConnection).
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Audio: G.711 u-law, base64 encoded, relayed unchanged

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;

use super::config::OPENAI_REALTIME_BETA;
use super::messages::{ClientEvent, FunctionCallTracker, ServerEvent};
use crate::core::realtime::base::{
    BaseRealtime, ConnectionState, RealtimeConfig, RealtimeConnection, RealtimeConnector,
    RealtimeError, RealtimeResult,
};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for server events awaiting the bridge.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Connector
// =============================================================================

/// Opens OpenAI Realtime sessions.
#[derive(Debug, Clone)]
pub struct OpenAIRealtimeConnector {
    config: RealtimeConfig,
}

impl OpenAIRealtimeConnector {
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }

    /// Build the WebSocket URL with query parameters.
    pub fn build_ws_url(&self) -> String {
        format!("{}?model={}", self.config.endpoint, self.config.model)
    }

    fn api_key(&self) -> RealtimeResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                RealtimeError::AuthenticationFailed("OpenAI API key is not configured".to_string())
            })
    }
}

#[async_trait]
impl RealtimeConnector for OpenAIRealtimeConnector {
    async fn connect(&self) -> RealtimeResult<RealtimeConnection> {
        let api_key = self.api_key()?;
        let url = self.build_ws_url();

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?,
        );
        headers.insert("OpenAI-Beta", HeaderValue::from_static(OPENAI_REALTIME_BETA));

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        tracing::info!(model = %self.config.model, "Connected to OpenAI Realtime API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (tx, mut rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(EVENT_CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));
        let task_connected = connected.clone();

        tokio::spawn(async move {
            let mut tracker = FunctionCallTracker::default();

            loop {
                tokio::select! {
                    outgoing = rx.recv() => {
                        let Some(event) = outgoing else {
                            // Every sender dropped or disconnect() was called
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        };

                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send WebSocket message: {}", e);
                            break;
                        }
                    }

                    incoming = ws_stream.next() => {
                        match incoming {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerEvent>(&text) {
                                    Ok(event) => {
                                        let event = tracker.observe(event);
                                        if event_tx.send(event).await.is_err() {
                                            tracing::debug!("Event receiver dropped, closing session");
                                            let _ = ws_sink.send(Message::Close(None)).await;
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        tracing::warn!("Failed to parse server event: {} - {}", e, text.as_str());
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!("WebSocket closed by server");
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::error!("WebSocket error: {}", e);
                                break;
                            }
                            Some(Ok(_)) => {}
                        }
                    }
                }
            }

            task_connected.store(false, Ordering::SeqCst);
            tracing::debug!("Realtime connection task finished");
        });

        let handle = OpenAIRealtime {
            sender: Mutex::new(Some(tx)),
            connected,
        };

        Ok(RealtimeConnection {
            handle: Arc::new(handle),
            events: event_rx,
        })
    }
}

// =============================================================================
// Session Handle
// =============================================================================

/// Sending half of an OpenAI Realtime session.
pub struct OpenAIRealtime {
    sender: Mutex<Option<mpsc::Sender<ClientEvent>>>,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl BaseRealtime for OpenAIRealtime {
    async fn send_event(&self, event: ClientEvent) -> RealtimeResult<()> {
        let sender = self.sender.lock().clone();
        let Some(sender) = sender else {
            return Err(RealtimeError::NotConnected);
        };

        sender
            .send(event)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }

    async fn disconnect(&self) -> RealtimeResult<()> {
        // Dropping the last sender makes the connection task close the socket
        if self.sender.lock().take().is_some() {
            tracing::debug!("Disconnecting from OpenAI Realtime API");
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.sender.lock().is_some()
    }

    fn get_connection_state(&self) -> ConnectionState {
        if self.is_ready() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}
