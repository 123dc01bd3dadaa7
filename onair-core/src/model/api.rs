use crate::model::participant::{ParticipantId, Role};
use crate::model::signal::SignalKind;
use serde::{Deserialize, Serialize};

/// Body of `POST /sessions/{session_id}/signals`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SendSignalRequest {
    pub from: ParticipantId,
    pub to: ParticipantId,
    pub kind: SignalKind,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
}

/// Query of `GET /sessions/{session_id}/signals`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SignalQuery {
    pub to: ParticipantId,
    #[serde(default)]
    pub since: u64,
}

/// Query of `DELETE /sessions/{session_id}/signals`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PurgeQuery {
    pub before: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PurgeResponse {
    pub deleted: usize,
}

/// Body of `PUT /sessions/{session_id}/participants/{participant_id}`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantUpdate {
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
