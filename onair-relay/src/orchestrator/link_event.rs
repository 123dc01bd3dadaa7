use onair_core::{LinkId, ParticipantId};

/// Progress reported by a link worker to its orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub link_id: LinkId,
    pub remote: ParticipantId,
    pub kind: LinkEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEventKind {
    /// The offer is stored. `epoch` is its store timestamp.
    OfferSent { epoch: u64 },
    AnswerSent,
    RemoteDescriptionApplied,
    Connected,
    ReceivingAudio,
    AudioStopped,
    Failed(String),
    Closed,
}
