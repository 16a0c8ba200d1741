//! Media stream WebSocket.
//!
//! Twilio opens this socket after the TwiML reply. Each connection is one
//! call: text frames feed the media bridge, and a sender task writes the
//! bridge's outgoing events back to the socket.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt, future};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::bridge::MediaBridge;
use crate::core::telephony::TransportRoute;
use crate::state::AppState;

/// Outgoing buffer; audio deltas arrive faster than real time.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// `GET /media-stream`
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Media stream connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_socket(socket, state))
}

async fn handle_media_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("Media stream connected");

    let (mut sender, receiver) = socket.split();
    let (route_tx, mut route_rx) = mpsc::channel::<TransportRoute>(CHANNEL_BUFFER_SIZE);

    let sender_task = tokio::spawn(async move {
        while let Some(route) = route_rx.recv().await {
            let result = match route {
                TransportRoute::Outgoing(event) => match serde_json::to_string(&event) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                TransportRoute::Close => {
                    debug!("Closing media stream connection");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                warn!("Failed to send media stream message: {}", e);
                break;
            }
        }
    });

    let inbound = receiver
        .take_while(|msg| {
            let keep = match msg {
                Ok(Message::Close(_)) => {
                    info!("Media stream closed by peer");
                    false
                }
                Ok(_) => true,
                Err(e) => {
                    warn!("Media stream WebSocket error: {}", e);
                    false
                }
            };
            future::ready(keep)
        })
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(text.as_str().to_owned()),
                _ => None,
            })
        });

    let final_state = MediaBridge::serve(state.services.clone(), Box::pin(inbound), route_tx).await;

    if let Err(e) = sender_task.await {
        warn!("Media stream sender task failed: {}", e);
    }
    info!(state = %final_state, "Media stream finished");
}
