//! Per-call media bridge between the telephony stream and the realtime session.
//!
//! ```text
//! Connecting ─► Configuring ─► Active ─► Closing ─► Closed
//!      └──────────── connection failure ───────────────┘
//! ```
//!
//! [`MediaBridge::connect`] opens the realtime session. [`MediaBridge::run`]
//! drives the two relay loops until either side ends the call:
//!
//! - transport → AI: `start` configures the session once, `media` frames are
//!   appended to the input buffer in arrival order, `stop` ends the call
//! - AI → transport: audio deltas go back to the caller, tool calls are
//!   dispatched and their results fed back into the conversation

mod relay;
mod session;
mod session_config;

use std::fmt;
use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;

use super::context_store::CallContextStore;
use super::realtime::{RealtimeConnector, RealtimeResult, ServerEvent};
use super::telephony::TransportRoute;
use super::tools::ToolDispatcher;

pub use session::{BridgeSession, StreamBinding};
pub use session_config::SessionTemplate;

/// Lifecycle of one bridged call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Connecting,
    Configuring,
    Active,
    Closing,
    Closed,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeState::Connecting => write!(f, "connecting"),
            BridgeState::Configuring => write!(f, "configuring"),
            BridgeState::Active => write!(f, "active"),
            BridgeState::Closing => write!(f, "closing"),
            BridgeState::Closed => write!(f, "closed"),
        }
    }
}

/// Process-wide collaborators shared by every call.
pub struct BridgeServices {
    pub connector: Arc<dyn RealtimeConnector>,
    pub contexts: Arc<CallContextStore>,
    pub tools: ToolDispatcher,
    pub session_template: SessionTemplate,
}

/// A connected bridge, ready to run.
pub struct MediaBridge {
    session: Arc<BridgeSession>,
    services: Arc<BridgeServices>,
    events: mpsc::Receiver<ServerEvent>,
}

impl MediaBridge {
    /// Open the realtime session for a new call.
    pub async fn connect(
        services: Arc<BridgeServices>,
        transport: mpsc::Sender<TransportRoute>,
    ) -> RealtimeResult<Self> {
        let connection = services.connector.connect().await?;
        let session = Arc::new(BridgeSession::new(connection.handle, transport));
        tracing::info!(session_id = %session.id(), "Realtime session connected");

        Ok(Self {
            session,
            services,
            events: connection.events,
        })
    }

    pub fn session(&self) -> &Arc<BridgeSession> {
        &self.session
    }

    /// Run both relay loops to completion. `inbound` yields the transport's
    /// text frames and ends when the transport closes.
    pub async fn run<S>(self, inbound: S) -> BridgeState
    where
        S: Stream<Item = String> + Unpin + Send,
    {
        let MediaBridge {
            session,
            services,
            events,
        } = self;

        tokio::join!(
            relay::transport_to_ai(session.clone(), services.clone(), inbound),
            relay::ai_to_transport(session.clone(), services, events),
        );

        session.close().await;
        session.state()
    }

    /// Connect and run, closing the transport if the realtime session cannot
    /// be opened.
    pub async fn serve<S>(
        services: Arc<BridgeServices>,
        inbound: S,
        transport: mpsc::Sender<TransportRoute>,
    ) -> BridgeState
    where
        S: Stream<Item = String> + Unpin + Send,
    {
        match Self::connect(services, transport.clone()).await {
            Ok(bridge) => bridge.run(inbound).await,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open realtime session, ending call");
                let _ = transport.send(TransportRoute::Close).await;
                BridgeState::Closed
            }
        }
    }
}
