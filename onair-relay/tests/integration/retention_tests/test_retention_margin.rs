use onair_core::{ParticipantId, Role, SignalKind};
use onair_relay::{
    ConfigError, RelayConfig, RetentionSweeper, SessionDriver, SessionParams, SignalPoller,
};
use std::sync::Arc;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{MockTransportFactory, TestEnv};

#[tokio::test]
async fn test_unpollable_signal_is_retained_until_cutoff() {
    init_tracing();

    let config = RelayConfig::default();
    assert!(config.purge_cutoff > config.poll_window);
    assert_eq!(config.poll_window, Duration::from_secs(60));
    assert_eq!(config.purge_cutoff, Duration::from_secs(120));

    let env = TestEnv::new();
    let (speaker, listener) = (ParticipantId::new(), ParticipantId::new());
    env.inject(speaker, listener, SignalKind::Candidate, "cand:x")
        .await;

    let poller = SignalPoller::new(
        env.store.clone(),
        env.session,
        listener,
        config.poll_window,
        env.clock(),
    );
    let sweeper = RetentionSweeper::new(
        env.store.clone(),
        env.session,
        config.purge_cutoff,
        env.clock(),
    );

    env.clock.advance(Duration::from_secs(90));
    assert!(poller.poll().await.unwrap().is_empty());
    assert_eq!(sweeper.sweep().await.unwrap(), 0);
    assert_eq!(env.store.signal_count(&env.session), 1);

    env.clock.advance(Duration::from_secs(30));
    assert_eq!(sweeper.sweep().await.unwrap(), 0);

    env.clock.advance(Duration::from_millis(1));
    assert_eq!(sweeper.sweep().await.unwrap(), 1);
    assert_eq!(env.store.signal_count(&env.session), 0);
}

#[tokio::test]
async fn test_session_rejects_cutoff_inside_window() {
    let env = TestEnv::new();
    let local_id = ParticipantId::new();
    env.directory.join(env.session, local_id, Role::Listener);

    let config = RelayConfig {
        purge_cutoff: Duration::from_secs(60),
        ..RelayConfig::default()
    };
    let result = SessionDriver::new(SessionParams {
        session_id: env.session,
        local_id,
        config,
        store: env.store.clone(),
        directory: env.directory.clone(),
        transports: Arc::new(MockTransportFactory::new()),
        clock: env.clock(),
    });

    assert!(matches!(
        result.err(),
        Some(ConfigError::RetentionTooShort { .. })
    ));
}
