use crate::store::{SignalStore, StoreError};
use onair_core::{Clock, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Deletes signals that are past the retention cutoff.
#[derive(Clone)]
pub struct RetentionSweeper {
    store: Arc<dyn SignalStore>,
    session_id: SessionId,
    cutoff: Duration,
    clock: Arc<dyn Clock>,
}

impl RetentionSweeper {
    pub fn new(
        store: Arc<dyn SignalStore>,
        session_id: SessionId,
        cutoff: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            session_id,
            cutoff,
            clock,
        }
    }

    /// Purge once and return how many signals were deleted.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let cutoff = self
            .clock
            .now_millis()
            .saturating_sub(self.cutoff.as_millis() as u64);

        let deleted = self
            .store
            .purge_signals_older_than(&self.session_id, cutoff)
            .await?;
        debug!("Swept {} signals older than {}", deleted, cutoff);
        Ok(deleted)
    }
}
