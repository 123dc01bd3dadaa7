use dashmap::DashMap;
use onair_core::{LinkStatus, ParticipantId};
use std::sync::Arc;
use tokio::sync::watch;

/// Read-only view of the local links, keyed by remote participant. The
/// version channel ticks on every change.
#[derive(Clone)]
pub struct LinkStatusView {
    links: Arc<DashMap<ParticipantId, LinkStatus>>,
    version: Arc<watch::Sender<u64>>,
}

impl LinkStatusView {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            links: Arc::new(DashMap::new()),
            version: Arc::new(version),
        }
    }

    pub fn get(&self, remote: &ParticipantId) -> Option<LinkStatus> {
        self.links.get(remote).map(|s| *s)
    }

    pub fn snapshot(&self) -> Vec<(ParticipantId, LinkStatus)> {
        self.links.iter().map(|e| (*e.key(), *e.value())).collect()
    }

    pub fn receiving_audio_from(&self, remote: &ParticipantId) -> bool {
        self.get(remote).is_some_and(|s| s.receiving_audio)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub(crate) fn publish(&self, remote: ParticipantId, status: LinkStatus) {
        if self.links.insert(remote, status) != Some(status) {
            self.bump();
        }
    }

    pub(crate) fn remove(&self, remote: &ParticipantId) {
        if self.links.remove(remote).is_some() {
            self.bump();
        }
    }

    pub(crate) fn clear(&self) {
        if !self.links.is_empty() {
            self.links.clear();
            self.bump();
        }
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for LinkStatusView {
    fn default() -> Self {
        Self::new()
    }
}
