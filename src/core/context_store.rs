//! Process-wide handoff of caller context from call setup to the media stream.
//!
//! The call-setup webhook stores a [`CallerContext`] under the call's
//! identifier. The media bridge takes it when the stream starts. A take
//! removes the entry, so each context is consumed at most once. Entries that
//! are never taken (the caller hung up before streaming) are swept after the
//! configured TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::lookup::StatusLookup;

/// Caller details captured when the call was set up.
#[derive(Debug, Clone, PartialEq)]
pub struct CallerContext {
    pub caller_phone: String,
    /// Result of the CRM lookup performed during call setup, if one ran
    pub prefetch: Option<StatusLookup>,
}

impl CallerContext {
    pub fn new(caller_phone: impl Into<String>, prefetch: Option<StatusLookup>) -> Self {
        Self {
            caller_phone: caller_phone.into(),
            prefetch,
        }
    }

    /// Prefetch result, only when it found a record.
    pub fn found_status(&self) -> Option<&super::lookup::ApplicationStatus> {
        match &self.prefetch {
            Some(StatusLookup::Found(status)) => Some(status),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct StoredContext {
    context: CallerContext,
    inserted_at: Instant,
}

/// Concurrent call-id → context map with take-once semantics.
#[derive(Debug)]
pub struct CallContextStore {
    entries: DashMap<String, StoredContext>,
    ttl: Option<Duration>,
}

impl Default for CallContextStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CallContextStore {
    /// `ttl` of `None` keeps entries until they are taken.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Insert or overwrite the context for `call_id`.
    pub fn put(&self, call_id: impl Into<String>, context: CallerContext) {
        self.entries.insert(
            call_id.into(),
            StoredContext {
                context,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove and return the context for `call_id`. Expired entries are
    /// removed but not returned.
    pub fn take(&self, call_id: &str) -> Option<CallerContext> {
        let (_, stored) = self.entries.remove(call_id)?;
        if self.is_expired(&stored, Instant::now()) {
            tracing::debug!(call_sid = %call_id, "Discarding expired caller context");
            return None;
        }
        Some(stored.context)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, stored: &StoredContext, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(stored.inserted_at) >= ttl)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }

        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, stored| !self.is_expired(stored, now));
        before.saturating_sub(self.entries.len())
    }

    /// Periodically sweep expired entries until `cancel` fires.
    ///
    /// Returns `None` when no TTL is configured.
    pub fn spawn_sweeper(self: &Arc<Self>, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let ttl = self.ttl?;
        let period = (ttl / 2).max(Duration::from_secs(1));
        let store = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let removed = store.sweep_expired();
                        if removed > 0 {
                            tracing::info!(removed, "Swept unconsumed caller contexts");
                        }
                    }
                }
            }
        }))
    }
}
