use onair_core::{ProcessedSignalKey, Signal};
use std::collections::HashSet;

/// Remembers which signals were already applied. Polls overlap by design of
/// the window, so the same signal is returned many times.
#[derive(Debug, Default)]
pub struct SignalDeduplicator {
    seen: HashSet<ProcessedSignalKey>,
}

impl SignalDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time a key is seen.
    pub fn admit(&mut self, signal: &Signal) -> bool {
        self.seen.insert(signal.key())
    }

    /// Forget keys older than `cutoff`. Those signals can no longer be
    /// returned by a poll.
    pub fn evict_older_than(&mut self, cutoff: u64) -> usize {
        let before = self.seen.len();
        self.seen.retain(|key| key.timestamp >= cutoff);
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
