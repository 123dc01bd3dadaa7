use crate::api::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use onair_core::{NewSignal, PurgeQuery, PurgeResponse, SendSignalRequest, SessionId, Signal, SignalQuery};
use onair_relay::SignalStore;
use tracing::info;

pub async fn send_signal(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<SendSignalRequest>,
) -> Result<Json<Signal>, ApiError> {
    if req.from == req.to {
        return Err(ApiError::BadRequest(
            "signal must not be addressed to its sender".to_string(),
        ));
    }

    let stored = state
        .store
        .append_signal(NewSignal {
            session_id,
            from: req.from,
            to: req.to,
            kind: req.kind,
            payload: req.payload,
            epoch: req.epoch,
        })
        .await?;
    Ok(Json(stored))
}

pub async fn query_signals(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Query(query): Query<SignalQuery>,
) -> Result<Json<Vec<Signal>>, ApiError> {
    let signals = state
        .store
        .query_signals_to(&session_id, &query.to, query.since)
        .await?;
    Ok(Json(signals))
}

pub async fn purge_signals(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Query(query): Query<PurgeQuery>,
) -> Result<Json<PurgeResponse>, ApiError> {
    let deleted = state
        .store
        .purge_signals_older_than(&session_id, query.before)
        .await?;
    if deleted > 0 {
        info!("Session {}: purged {} signals", session_id, deleted);
    }
    Ok(Json(PurgeResponse { deleted }))
}
