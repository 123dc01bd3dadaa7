mod api_error;
mod participants;
mod signals;

pub use api_error::*;
pub use participants::*;
pub use signals::*;

use crate::state::AppState;
use axum::Router;
use axum::routing::{get, put};

/// All routes of the signal relay service.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/sessions/{session_id}/signals",
            get(query_signals).post(send_signal).delete(purge_signals),
        )
        .route("/sessions/{session_id}/participants", get(list_participants))
        .route(
            "/sessions/{session_id}/participants/{participant_id}",
            put(put_participant),
        )
        .with_state(state)
}
