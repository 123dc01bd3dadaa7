use async_trait::async_trait;
use onair_core::{NewSignal, ParticipantId, SessionId, Signal, SignalKind};
use onair_relay::{MemorySignalStore, SignalStore, StoreError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Store wrapper that can be switched into an outage.
#[derive(Clone)]
pub struct FlakyStore {
    inner: Arc<MemorySignalStore>,
    down: Arc<AtomicBool>,
    rejected_kind: Arc<Mutex<Option<SignalKind>>>,
    failures: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemorySignalStore>) -> Self {
        Self {
            inner,
            down: Arc::new(AtomicBool::new(false)),
            rejected_kind: Arc::new(Mutex::new(None)),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Reject only appends of `kind`, everything else goes through.
    pub fn reject_appends_of(&self, kind: Option<SignalKind>) {
        *self.rejected_kind.lock().unwrap() = kind;
    }

    /// Requests rejected so far.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("store is down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SignalStore for FlakyStore {
    async fn append_signal(&self, signal: NewSignal) -> Result<Signal, StoreError> {
        self.check()?;
        if *self.rejected_kind.lock().unwrap() == Some(signal.kind) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Unavailable(format!("{} rejected", signal.kind)));
        }
        self.inner.append_signal(signal).await
    }

    async fn query_signals_to(
        &self,
        session_id: &SessionId,
        recipient: &ParticipantId,
        since: u64,
    ) -> Result<Vec<Signal>, StoreError> {
        self.check()?;
        self.inner.query_signals_to(session_id, recipient, since).await
    }

    async fn purge_signals_older_than(
        &self,
        session_id: &SessionId,
        cutoff: u64,
    ) -> Result<usize, StoreError> {
        self.check()?;
        self.inner.purge_signals_older_than(session_id, cutoff).await
    }
}
