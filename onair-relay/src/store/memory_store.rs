use crate::store::{SignalStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use onair_core::{Clock, NewSignal, ParticipantId, SessionId, Signal, SignalId, SystemClock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Default)]
struct SessionLog {
    signals: Vec<Signal>,
    last_timestamp: u64,
}

/// In-process signal store. Timestamps are strictly increasing per session, so
/// two signals from one sender never share a `(from, kind, timestamp)` key.
pub struct MemorySignalStore {
    sessions: DashMap<SessionId, SessionLog>,
    next_id: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl MemorySignalStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
            clock,
        }
    }

    pub fn signal_count(&self, session_id: &SessionId) -> usize {
        self.sessions
            .get(session_id)
            .map(|log| log.signals.len())
            .unwrap_or(0)
    }

    /// Every stored signal of the session, oldest first.
    pub fn all_signals(&self, session_id: &SessionId) -> Vec<Signal> {
        self.sessions
            .get(session_id)
            .map(|log| log.signals.clone())
            .unwrap_or_default()
    }

    /// Purge every session at once. Empty sessions are dropped.
    pub fn purge_all_older_than(&self, cutoff: u64) -> usize {
        let mut deleted = 0;
        self.sessions.retain(|_, log| {
            let before = log.signals.len();
            log.signals.retain(|s| s.timestamp >= cutoff);
            deleted += before - log.signals.len();
            !log.signals.is_empty()
        });
        deleted
    }
}

impl Default for MemorySignalStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn append_signal(&self, signal: NewSignal) -> Result<Signal, StoreError> {
        let mut log = self.sessions.entry(signal.session_id).or_default();

        let timestamp = self.clock.now_millis().max(log.last_timestamp + 1);
        log.last_timestamp = timestamp;

        let stored = Signal {
            id: SignalId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            session_id: signal.session_id,
            from: signal.from,
            to: signal.to,
            kind: signal.kind,
            payload: signal.payload,
            epoch: signal.epoch,
            timestamp,
        };
        log.signals.push(stored.clone());

        debug!(
            "Stored {} {} -> {} at {}",
            stored.kind, stored.from, stored.to, stored.timestamp
        );
        Ok(stored)
    }

    async fn query_signals_to(
        &self,
        session_id: &SessionId,
        recipient: &ParticipantId,
        since: u64,
    ) -> Result<Vec<Signal>, StoreError> {
        let Some(log) = self.sessions.get(session_id) else {
            return Ok(Vec::new());
        };

        // Appends happen in timestamp order, so the log is already sorted.
        Ok(log
            .signals
            .iter()
            .filter(|s| s.to == *recipient && s.timestamp >= since)
            .cloned()
            .collect())
    }

    async fn purge_signals_older_than(
        &self,
        session_id: &SessionId,
        cutoff: u64,
    ) -> Result<usize, StoreError> {
        let Some(mut log) = self.sessions.get_mut(session_id) else {
            return Ok(0);
        };

        let before = log.signals.len();
        log.signals.retain(|s| s.timestamp >= cutoff);
        Ok(before - log.signals.len())
    }
}
