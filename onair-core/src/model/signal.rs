use crate::model::participant::ParticipantId;
use crate::model::session::SessionId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct SignalId(pub u64);

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub enum SignalKind {
    #[serde(rename = "offer")]
    Offer,
    #[serde(rename = "answer")]
    Answer,
    #[serde(rename = "ice-candidate")]
    Candidate,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::Candidate => "ice-candidate",
        };
        f.write_str(name)
    }
}

/// An addressed message before the store has stamped it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewSignal {
    pub session_id: SessionId,
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub kind: SignalKind,
    pub payload: String,
    /// Store timestamp of the offer an answer or candidate belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
}

/// A stored signal. Immutable once appended; `timestamp` is assigned by the
/// store in milliseconds since the Unix epoch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Signal {
    pub id: SignalId,
    pub session_id: SessionId,
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub kind: SignalKind,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
    pub timestamp: u64,
}

impl Signal {
    pub fn key(&self) -> ProcessedSignalKey {
        ProcessedSignalKey {
            from: self.from,
            kind: self.kind,
            timestamp: self.timestamp,
        }
    }

    /// Whether this answer or candidate belongs to the offer stored at
    /// `epoch`. Signals without an epoch only have to be newer than it.
    pub fn belongs_to(&self, epoch: u64) -> bool {
        match self.epoch {
            Some(own) => own == epoch,
            None => self.timestamp >= epoch,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct ProcessedSignalKey {
    pub from: ParticipantId,
    pub kind: SignalKind,
    pub timestamp: u64,
}
