//! Call-scoped state shared by the two relay loops.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::BridgeState;
use crate::core::realtime::BaseRealtime;
use crate::core::telephony::{TransportRoute, TwilioOutboundEvent};

/// Identifiers learned from the transport `start` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamBinding {
    pub stream_sid: String,
    pub call_sid: Option<String>,
}

/// One call's bridge: the realtime handle, the transport sender and the
/// stream binding written once on `start`.
pub struct BridgeSession {
    id: String,
    realtime: Arc<dyn BaseRealtime>,
    transport: mpsc::Sender<TransportRoute>,
    stream: OnceLock<StreamBinding>,
    state: Mutex<BridgeState>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl BridgeSession {
    pub fn new(realtime: Arc<dyn BaseRealtime>, transport: mpsc::Sender<TransportRoute>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            realtime,
            transport,
            stream: OnceLock::new(),
            state: Mutex::new(BridgeState::Connecting),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn realtime(&self) -> &Arc<dyn BaseRealtime> {
        &self.realtime
    }

    pub fn state(&self) -> BridgeState {
        *self.state.lock()
    }

    pub(super) fn set_state(&self, next: BridgeState) {
        let mut state = self.state.lock();
        let previous = *state;
        if previous != next {
            tracing::debug!(session_id = %self.id, from = %previous, to = %next, "Bridge state change");
            *state = next;
        }
    }

    /// Record the stream binding. Returns `false` if one was already set.
    pub fn bind(&self, binding: StreamBinding) -> bool {
        self.stream.set(binding).is_ok()
    }

    pub fn stream(&self) -> Option<&StreamBinding> {
        self.stream.get()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Queue audio for the caller. Dropped when no stream is bound yet.
    /// Returns `false` once the transport sender is gone.
    pub async fn send_audio(&self, payload: String) -> bool {
        let Some(binding) = self.stream() else {
            tracing::trace!(session_id = %self.id, "Dropping audio before stream start");
            return true;
        };

        let event = TwilioOutboundEvent::media(binding.stream_sid.clone(), payload);
        self.transport
            .send(TransportRoute::Outgoing(event))
            .await
            .is_ok()
    }

    /// Close the realtime session, stop both loops and close the transport.
    /// Only the first call does anything.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.set_state(BridgeState::Closing);
        self.cancel.cancel();

        if let Err(e) = self.realtime.disconnect().await {
            tracing::warn!(session_id = %self.id, error = %e, "Failed to disconnect realtime session");
        }
        let _ = self.transport.send(TransportRoute::Close).await;

        self.set_state(BridgeState::Closed);
        tracing::info!(
            session_id = %self.id,
            stream_sid = self.stream().map(|b| b.stream_sid.as_str()).unwrap_or_default(),
            "Bridge session closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for BridgeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSession")
            .field("id", &self.id)
            .field("stream", &self.stream.get())
            .field("state", &self.state())
            .finish()
    }
}
