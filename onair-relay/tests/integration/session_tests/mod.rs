mod test_session_driver;
mod test_webrtc_loopback;

use onair_core::{Clock, ParticipantId, SessionId};
use onair_relay::{
    RelayConfig, RoleDirectory, SessionHandle, SessionParams, SignalStore, TransportConfig,
    TransportFactory, spawn_session,
};
use std::sync::Arc;
use std::time::Duration;

/// Timers short enough for tests; retention values stay at their defaults.
pub fn fast_config() -> RelayConfig {
    RelayConfig {
        poll_interval: Duration::from_millis(20),
        sweep_interval: Duration::from_millis(100),
        directory_refresh_interval: Duration::from_millis(100),
        disconnect_grace: Duration::from_secs(1),
        transport: TransportConfig::host_only(),
        ..RelayConfig::default()
    }
}

pub fn start(
    session_id: SessionId,
    local_id: ParticipantId,
    store: Arc<dyn SignalStore>,
    directory: Arc<dyn RoleDirectory>,
    transports: Arc<dyn TransportFactory>,
    clock: Arc<dyn Clock>,
) -> SessionHandle {
    spawn_session(SessionParams {
        session_id,
        local_id,
        config: fast_config(),
        store,
        directory,
        transports,
        clock,
    })
    .unwrap()
}
