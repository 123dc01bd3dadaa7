use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use onair_core::{Participant, ParticipantId, ParticipantUpdate, SessionId};

/// Every known participant of the session, active or not.
pub async fn list_participants(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Json<Vec<Participant>> {
    Json(state.directory.participants(&session_id))
}

pub async fn put_participant(
    State(state): State<AppState>,
    Path((session_id, participant_id)): Path<(SessionId, ParticipantId)>,
    Json(update): Json<ParticipantUpdate>,
) -> Json<Participant> {
    let participant = Participant {
        id: participant_id,
        role: update.role,
        active: update.active,
    };
    state.directory.upsert(session_id, participant.clone());
    Json(participant)
}
