//! In-process doubles for the realtime session and lookup providers.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use voice_bridge::ServerConfig;
use voice_bridge::core::bridge::{BridgeServices, SessionTemplate};
use voice_bridge::core::context_store::CallContextStore;
use voice_bridge::core::lookup::{
    CrmProvider, CrmResult, KnowledgeAnswer, KnowledgeBase, LeadRecord, NameMatch,
};
use voice_bridge::core::realtime::{
    BaseRealtime, ClientEvent, ConnectionState, RealtimeConnection, RealtimeConnector,
    RealtimeError, RealtimeResult, ServerEvent,
};
use voice_bridge::core::tools::ToolDispatcher;

// =============================================================================
// Realtime
// =============================================================================

/// Records every client event as JSON.
#[derive(Default)]
pub struct MockRealtime {
    sent: Mutex<Vec<Value>>,
    disconnects: AtomicUsize,
    closed: AtomicBool,
}

impl MockRealtime {
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }

    pub fn sent_types(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .map(|event| event["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn appended_audio(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|event| event["type"] == "input_audio_buffer.append")
            .map(|event| event["audio"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Wait until `count` events of `event_type` have been sent.
    pub async fn wait_for(&self, event_type: &str, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let seen = self
                .sent_types()
                .iter()
                .filter(|t| t.as_str() == event_type)
                .count();
            if seen >= count {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {count} x {event_type}, sent: {:?}",
                self.sent_types()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl BaseRealtime for MockRealtime {
    async fn send_event(&self, event: ClientEvent) -> RealtimeResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RealtimeError::NotConnected);
        }
        let json = serde_json::to_value(&event)
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
        self.sent.lock().push(json);
        Ok(())
    }

    async fn disconnect(&self) -> RealtimeResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn get_connection_state(&self) -> ConnectionState {
        if self.is_ready() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}

/// Hands out a single scripted session.
pub struct MockConnector {
    pub realtime: Arc<MockRealtime>,
    events: Mutex<Option<mpsc::Receiver<ServerEvent>>>,
    fail: bool,
}

impl MockConnector {
    /// Connector plus the sender used to script server events.
    pub fn new() -> (Arc<Self>, mpsc::Sender<ServerEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let connector = Arc::new(Self {
            realtime: Arc::new(MockRealtime::default()),
            events: Mutex::new(Some(rx)),
            fail: false,
        });
        (connector, tx)
    }

    /// Connector whose session never opens.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            realtime: Arc::new(MockRealtime::default()),
            events: Mutex::new(None),
            fail: true,
        })
    }
}

#[async_trait]
impl RealtimeConnector for MockConnector {
    async fn connect(&self) -> RealtimeResult<RealtimeConnection> {
        if self.fail {
            return Err(RealtimeError::AuthenticationFailed(
                "OpenAI API key is not configured".to_string(),
            ));
        }
        let events = self
            .events
            .lock()
            .take()
            .ok_or_else(|| RealtimeError::ConnectionFailed("already connected".to_string()))?;
        Ok(RealtimeConnection {
            handle: self.realtime.clone(),
            events,
        })
    }
}

// =============================================================================
// Lookups
// =============================================================================

pub fn lead(first: &str, last: &str, status: &str, language: &str) -> LeadRecord {
    LeadRecord {
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        lead_status: Some(status.to_string()),
        language: Some(language.to_string()),
        ..Default::default()
    }
}

/// CRM keyed by the last ten digits of a phone number.
#[derive(Default)]
pub struct MockCrm {
    pub phones: Vec<(String, LeadRecord)>,
    pub delay: Option<Duration>,
    pub phone_queries: Mutex<Vec<String>>,
}

impl MockCrm {
    pub fn with_phone(phone: &str, lead: LeadRecord) -> Self {
        Self {
            phones: vec![(phone.to_string(), lead)],
            ..Default::default()
        }
    }
}

#[async_trait]
impl CrmProvider for MockCrm {
    async fn find_by_phone(&self, phone: &str) -> CrmResult<Option<LeadRecord>> {
        self.phone_queries.lock().push(phone.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        Ok(self
            .phones
            .iter()
            .find(|(known, _)| digits.ends_with(known.as_str()))
            .map(|(_, lead)| lead.clone()))
    }

    async fn find_by_email(&self, _email: &str) -> CrmResult<Option<LeadRecord>> {
        Ok(None)
    }

    async fn find_by_name(&self, _first_name: &str, _last_name: &str) -> CrmResult<NameMatch> {
        Ok(NameMatch::None)
    }
}

/// Knowledge base with a fixed answer.
pub struct MockKnowledgeBase {
    pub answer: String,
}

impl Default for MockKnowledgeBase {
    fn default() -> Self {
        Self {
            answer: "Interpreters are paid weekly.".to_string(),
        }
    }
}

#[async_trait]
impl KnowledgeBase for MockKnowledgeBase {
    async fn search(&self, _question: &str) -> KnowledgeAnswer {
        KnowledgeAnswer::found(self.answer.clone())
    }
}

/// Knowledge base that takes `delay` to answer and counts searches started.
pub struct SlowKnowledgeBase {
    pub delay: Duration,
    pub searches: AtomicUsize,
}

impl SlowKnowledgeBase {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            searches: AtomicUsize::new(0),
        }
    }

    /// Wait until at least one search has started.
    pub async fn wait_for_search(&self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.searches.load(Ordering::SeqCst) == 0 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for a knowledge-base search"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl KnowledgeBase for SlowKnowledgeBase {
    async fn search(&self, _question: &str) -> KnowledgeAnswer {
        self.searches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        KnowledgeAnswer::found("Training lasts two weeks.")
    }
}

// =============================================================================
// Assembly
// =============================================================================

pub fn services(
    connector: Arc<dyn RealtimeConnector>,
    contexts: Arc<CallContextStore>,
    crm: Arc<dyn CrmProvider>,
) -> BridgeServices {
    services_with_knowledge_base(
        connector,
        contexts,
        crm,
        Arc::new(MockKnowledgeBase::default()),
    )
}

pub fn services_with_knowledge_base(
    connector: Arc<dyn RealtimeConnector>,
    contexts: Arc<CallContextStore>,
    crm: Arc<dyn CrmProvider>,
    knowledge_base: Arc<dyn KnowledgeBase>,
) -> BridgeServices {
    BridgeServices {
        connector,
        contexts,
        tools: ToolDispatcher::new(crm, knowledge_base),
        session_template: SessionTemplate::from_config(&ServerConfig::default()),
    }
}

// =============================================================================
// Twilio frames
// =============================================================================

pub fn connected_frame() -> String {
    r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#.to_string()
}

pub fn start_frame(stream_sid: &str, call_sid: &str) -> String {
    serde_json::json!({
        "event": "start",
        "sequenceNumber": "1",
        "start": {
            "accountSid": "AC1",
            "streamSid": stream_sid,
            "callSid": call_sid,
            "tracks": ["inbound"],
            "customParameters": {"callSid": call_sid},
            "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
        },
        "streamSid": stream_sid
    })
    .to_string()
}

pub fn media_frame(payload: &str) -> String {
    serde_json::json!({
        "event": "media",
        "media": {"track": "inbound", "chunk": "1", "timestamp": "0", "payload": payload},
        "streamSid": "MZ1"
    })
    .to_string()
}

pub fn stop_frame() -> String {
    r#"{"event":"stop","sequenceNumber":"9","stop":{"accountSid":"AC1","callSid":"CA1"},"streamSid":"MZ1"}"#
        .to_string()
}
