//! Call-setup webhook.
//!
//! Twilio calls this when a call arrives. The handler prefetches the caller's
//! CRM record, stores it for the media stream and replies with TwiML that
//! connects the call to `/media-stream`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};

use crate::core::context_store::CallerContext;
use crate::core::lookup::{StatusLookup, StatusQuery};
use crate::core::telephony::connect_stream;
use crate::state::AppState;

const FROM_FIELD: &str = "From";
const CALL_SID_FIELD: &str = "CallSid";
const DEFAULT_HOST: &str = "localhost";

/// Caller identity carried by the webhook. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSetup {
    pub caller_phone: String,
    pub call_sid: String,
}

impl CallSetup {
    /// Read fields from the form body, falling back to the query string when
    /// the body field is missing or empty.
    pub fn from_request(body: &[u8], query: Option<&str>) -> Self {
        let field = |name: &str| {
            form_value(body, name)
                .filter(|value| !value.is_empty())
                .or_else(|| query.and_then(|q| form_value(q.as_bytes(), name)))
                .unwrap_or_default()
        };

        Self {
            caller_phone: field(FROM_FIELD),
            call_sid: field(CALL_SID_FIELD),
        }
    }
}

fn form_value(input: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(input)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// `GET|POST /incoming-call`
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response {
    if state.config.debug_requests {
        debug!(
            body = %String::from_utf8_lossy(&body),
            query = uri.query().unwrap_or_default(),
            "Incoming call webhook payload"
        );
    }

    let setup = CallSetup::from_request(&body, uri.query());
    info!(call_sid = %setup.call_sid, caller = %setup.caller_phone, "Incoming call");

    let prefetch = if setup.caller_phone.is_empty() {
        None
    } else {
        prefetch(&state, &setup.caller_phone).await
    };

    if setup.call_sid.is_empty() {
        warn!("Incoming call without CallSid, caller context not stored");
    } else {
        state.contexts().put(
            setup.call_sid.clone(),
            CallerContext::new(setup.caller_phone.clone(), prefetch),
        );
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_HOST);
    let stream_url = state.config.stream_url_for_host(host);

    (
        [(header::CONTENT_TYPE, "application/xml")],
        connect_stream(&stream_url, &setup.call_sid),
    )
        .into_response()
}

/// Phone lookup bounded by the prefetch timeout.
async fn prefetch(state: &AppState, caller_phone: &str) -> Option<StatusLookup> {
    let query = StatusQuery::phone(caller_phone);
    let timeout = state.config.prefetch_timeout();

    match tokio::time::timeout(timeout, state.status_lookup().lookup(&query)).await {
        Ok(result) => {
            match result.first_name() {
                Some(name) => info!(caller = %caller_phone, first_name = %name, "Prefetch found caller"),
                None => info!(caller = %caller_phone, "Prefetch found no record"),
            }
            Some(result)
        }
        Err(_) => {
            warn!(caller = %caller_phone, timeout_secs = timeout.as_secs(), "Prefetch lookup timed out");
            None
        }
    }
}
