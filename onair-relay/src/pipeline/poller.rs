use crate::store::{SignalStore, StoreError};
use onair_core::{Clock, ParticipantId, SessionId, Signal};
use std::sync::Arc;
use std::time::Duration;

/// Reads the signals addressed to one participant that are still inside the
/// poll window.
pub struct SignalPoller {
    store: Arc<dyn SignalStore>,
    session_id: SessionId,
    local_id: ParticipantId,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl SignalPoller {
    pub fn new(
        store: Arc<dyn SignalStore>,
        session_id: SessionId,
        local_id: ParticipantId,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            session_id,
            local_id,
            window,
            clock,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Oldest timestamp the next poll will ask for.
    pub fn window_start(&self) -> u64 {
        self.clock
            .now_millis()
            .saturating_sub(self.window.as_millis() as u64)
    }

    /// One range query. The result only holds signals for the local
    /// participant, in ascending timestamp order.
    pub async fn poll(&self) -> Result<Vec<Signal>, StoreError> {
        let since = self.window_start();
        let mut signals = self
            .store
            .query_signals_to(&self.session_id, &self.local_id, since)
            .await?;

        signals.retain(|s| s.to == self.local_id && s.session_id == self.session_id);
        // Stable, so equal timestamps keep store order.
        signals.sort_by_key(|s| s.timestamp);
        Ok(signals)
    }
}
