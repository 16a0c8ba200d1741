//! The two relay loops of a call.
//!
//! Both loops exit on cancellation and close the session on the way out, so
//! whichever ends first stops its sibling.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use super::session::{BridgeSession, StreamBinding};
use super::{BridgeServices, BridgeState};
use crate::core::realtime::ServerEvent;
use crate::core::telephony::TwilioInboundEvent;

/// Transport → AI: parse Twilio events and forward audio.
pub(super) async fn transport_to_ai<S>(
    session: Arc<BridgeSession>,
    services: Arc<BridgeServices>,
    mut inbound: S,
) where
    S: Stream<Item = String> + Unpin + Send,
{
    let cancel = session.cancellation().clone();

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = inbound.next() => frame,
        };
        let Some(text) = frame else {
            tracing::info!(session_id = %session.id(), "Transport connection closed");
            break;
        };

        let event = match serde_json::from_str::<TwilioInboundEvent>(&text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, "Skipping malformed transport message");
                continue;
            }
        };

        match event {
            TwilioInboundEvent::Connected => {
                tracing::debug!(session_id = %session.id(), "Transport connected");
            }
            TwilioInboundEvent::Start { start } => {
                let binding = StreamBinding {
                    stream_sid: start.stream_sid.clone(),
                    call_sid: start.call_id().map(str::to_string),
                };
                if !session.bind(binding.clone()) {
                    tracing::debug!(session_id = %session.id(), "Ignoring repeated start event");
                    continue;
                }
                if !configure(&session, &services, &binding).await {
                    break;
                }
            }
            TwilioInboundEvent::Media { media } => {
                if session.state() != BridgeState::Active {
                    tracing::trace!(session_id = %session.id(), "Dropping media before configuration");
                    continue;
                }
                if let Err(e) = session.realtime().append_audio(media.payload).await {
                    tracing::warn!(session_id = %session.id(), error = %e, "Failed to forward audio");
                    break;
                }
            }
            TwilioInboundEvent::Stop => {
                tracing::info!(session_id = %session.id(), "Stream stopped");
                break;
            }
            TwilioInboundEvent::Unknown => {
                tracing::debug!(session_id = %session.id(), "Ignoring transport event");
            }
        }
    }

    session.close().await;
}

/// Take the stored caller context, send `session.update` and the greeting.
/// Returns `false` when the realtime session is gone.
async fn configure(
    session: &BridgeSession,
    services: &BridgeServices,
    binding: &StreamBinding,
) -> bool {
    session.set_state(BridgeState::Configuring);

    let context = binding
        .call_sid
        .as_deref()
        .and_then(|call_sid| services.contexts.take(call_sid));

    tracing::info!(
        session_id = %session.id(),
        stream_sid = %binding.stream_sid,
        call_sid = binding.call_sid.as_deref().unwrap_or_default(),
        has_context = context.is_some(),
        caller = context.as_ref().and_then(|c| c.found_status()).map(|s| s.first_name.as_str()).unwrap_or_default(),
        "Stream started"
    );

    let config = services.session_template.render(context.as_ref());
    let realtime = session.realtime();

    if let Err(e) = realtime.update_session(config).await {
        tracing::error!(session_id = %session.id(), error = %e, "Failed to configure realtime session");
        return false;
    }
    if let Err(e) = realtime
        .create_response(Some(services.session_template.greeting()))
        .await
    {
        tracing::error!(session_id = %session.id(), error = %e, "Failed to request greeting");
        return false;
    }

    session.set_state(BridgeState::Active);
    true
}

/// AI → Transport: relay audio and run tool calls.
pub(super) async fn ai_to_transport(
    session: Arc<BridgeSession>,
    services: Arc<BridgeServices>,
    mut events: mpsc::Receiver<ServerEvent>,
) {
    let cancel = session.cancellation().clone();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(event) = event else {
            tracing::info!(session_id = %session.id(), "Realtime session ended");
            break;
        };

        let keep_going = tokio::select! {
            _ = cancel.cancelled() => false,
            keep_going = handle_server_event(&session, &services, event) => keep_going,
        };
        if !keep_going {
            break;
        }
    }

    session.close().await;
}

async fn handle_server_event(
    session: &BridgeSession,
    services: &BridgeServices,
    event: ServerEvent,
) -> bool {
    let session_id = session.id();

    match event {
        ServerEvent::AudioDelta { delta, .. } => {
            if !session.send_audio(delta).await {
                tracing::info!(session_id = %session_id, "Transport sender closed");
                return false;
            }
        }
        ServerEvent::FunctionCallArgumentsDone {
            call_id,
            name,
            arguments,
        } => {
            let name = name.unwrap_or_default();
            tracing::info!(session_id = %session_id, call_id = %call_id, function = %name, "Tool call");

            let output = services.tools.dispatch(&name, &arguments).await;
            let realtime = session.realtime();

            if let Err(e) = realtime
                .submit_function_result(&call_id, &output.to_string())
                .await
            {
                tracing::error!(session_id = %session_id, error = %e, "Failed to submit tool result");
                return false;
            }
            if let Err(e) = realtime.create_response(None).await {
                tracing::error!(session_id = %session_id, error = %e, "Failed to request response");
                return false;
            }
        }
        ServerEvent::Error { error } => {
            tracing::error!(
                session_id = %session_id,
                error_type = %error.error_type,
                code = error.code.as_deref().unwrap_or_default(),
                "Realtime error: {}",
                error.message
            );
        }
        ServerEvent::SessionCreated { session: info } => {
            tracing::info!(session_id = %session_id, realtime_session = %info.id, "Realtime session created");
        }
        ServerEvent::SessionUpdated { .. } => {
            tracing::debug!(session_id = %session_id, "Realtime session updated");
        }
        ServerEvent::SpeechStarted { .. } => {
            tracing::debug!(session_id = %session_id, "Caller started speaking");
        }
        ServerEvent::SpeechStopped { .. } => {
            tracing::debug!(session_id = %session_id, "Caller stopped speaking");
        }
        ServerEvent::TranscriptionCompleted { transcript, .. } => {
            tracing::info!(session_id = %session_id, "Caller: {}", transcript.trim());
        }
        ServerEvent::AudioTranscriptDelta { .. } => {}
        ServerEvent::AudioTranscriptDone { transcript } => {
            tracing::info!(session_id = %session_id, "Assistant: {}", transcript.trim());
        }
        ServerEvent::OutputItemAdded { item } => {
            tracing::debug!(session_id = %session_id, item_type = %item.item_type, "Output item added");
        }
        ServerEvent::ResponseDone { response } => {
            tracing::debug!(
                session_id = %session_id,
                response_id = %response.id,
                status = response.status.as_deref().unwrap_or_default(),
                "Response done"
            );
        }
        ServerEvent::Unknown => {}
    }

    true
}
