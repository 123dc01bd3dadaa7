use async_trait::async_trait;
use onair_core::{NewSignal, ParticipantId, SessionId, Signal};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("signal store unavailable: {0}")]
    Unavailable(String),
    #[error("signal store rejected request: {0}")]
    Rejected(String),
    #[error("malformed signal store response: {0}")]
    Decode(String),
}

/// Durable, per-session store of addressed signals. Append-only apart from the
/// retention purge, so callers never coordinate beyond what the store provides.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Append a signal; the store assigns its id and timestamp.
    async fn append_signal(&self, signal: NewSignal) -> Result<Signal, StoreError>;

    /// All signals addressed to `recipient` with `timestamp >= since`, ascending.
    async fn query_signals_to(
        &self,
        session_id: &SessionId,
        recipient: &ParticipantId,
        since: u64,
    ) -> Result<Vec<Signal>, StoreError>;

    /// Delete every signal of the session with `timestamp < cutoff`.
    async fn purge_signals_older_than(
        &self,
        session_id: &SessionId,
        cutoff: u64,
    ) -> Result<usize, StoreError>;
}

#[async_trait]
impl<T: SignalStore + ?Sized> SignalStore for Arc<T> {
    async fn append_signal(&self, signal: NewSignal) -> Result<Signal, StoreError> {
        (**self).append_signal(signal).await
    }

    async fn query_signals_to(
        &self,
        session_id: &SessionId,
        recipient: &ParticipantId,
        since: u64,
    ) -> Result<Vec<Signal>, StoreError> {
        (**self).query_signals_to(session_id, recipient, since).await
    }

    async fn purge_signals_older_than(
        &self,
        session_id: &SessionId,
        cutoff: u64,
    ) -> Result<usize, StoreError> {
        (**self).purge_signals_older_than(session_id, cutoff).await
    }
}
