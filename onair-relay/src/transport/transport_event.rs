use onair_core::LinkId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events a transport reports for the link it was created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A local network candidate was discovered and must reach the remote.
    CandidateGenerated(LinkId, String),

    /// Connectivity of the underlying connection changed.
    StateChanged(LinkId, TransportState),

    /// Remote media started flowing on this link.
    TrackReceived(LinkId),
}

impl TransportEvent {
    pub fn link_id(&self) -> LinkId {
        match self {
            TransportEvent::CandidateGenerated(id, _)
            | TransportEvent::StateChanged(id, _)
            | TransportEvent::TrackReceived(id) => *id,
        }
    }
}
