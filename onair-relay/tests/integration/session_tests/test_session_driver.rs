use onair_core::{LinkState, ParticipantId, Role};
use onair_relay::SessionError;
use std::sync::Arc;

use crate::integration::session_tests::start;
use crate::integration::{TIMEOUT, eventually, init_tracing};
use crate::utils::{MockTransportFactory, TestEnv, wait_for_state};

#[tokio::test]
async fn test_sessions_connect_and_follow_the_directory() {
    init_tracing();

    let env = TestEnv::new();
    let (host_id, listener_id) = (ParticipantId::new(), ParticipantId::new());
    env.directory.join(env.session, host_id, Role::Host);
    env.directory.join(env.session, listener_id, Role::Listener);

    let host_transports = MockTransportFactory::new();
    let listener_transports = MockTransportFactory::new();
    let host = start(
        env.session,
        host_id,
        env.store.clone(),
        env.directory.clone(),
        Arc::new(host_transports.clone()),
        env.clock(),
    );
    let listener = start(
        env.session,
        listener_id,
        env.store.clone(),
        env.directory.clone(),
        Arc::new(listener_transports.clone()),
        env.clock(),
    );

    assert!(
        wait_for_state(listener.status(), &host_id, LinkState::Idle, TIMEOUT).await,
        "listener waits for the host's offer"
    );
    assert!(host.status().is_empty(), "no links while the mic is off");

    host.set_microphone(true).unwrap();
    assert!(wait_for_state(host.status(), &listener_id, LinkState::Connected, TIMEOUT).await);
    assert!(wait_for_state(listener.status(), &host_id, LinkState::Connected, TIMEOUT).await);
    assert!(eventually(TIMEOUT, || listener.status().receiving_audio_from(&host_id)).await);

    env.directory.leave(env.session, listener_id);
    assert!(eventually(TIMEOUT, || host.status().get(&listener_id).is_none()).await);
    assert!(eventually(TIMEOUT, || listener.status().is_empty()).await);

    host.shutdown().await.unwrap();
    listener.shutdown().await.unwrap();

    let all_closed = |f: &MockTransportFactory| f.created().iter().all(|t| t.is_closed());
    assert!(eventually(TIMEOUT, || all_closed(&host_transports)).await);
    assert!(eventually(TIMEOUT, || all_closed(&listener_transports)).await);
    assert!(!host.is_running());
    assert_eq!(host.set_microphone(false), Err(SessionError::Closed));
}

#[tokio::test]
async fn test_reconcile_now_picks_up_a_new_listener() {
    init_tracing();

    let env = TestEnv::new();
    let host_id = ParticipantId::new();
    env.directory.join(env.session, host_id, Role::Host);

    let host = start(
        env.session,
        host_id,
        env.store.clone(),
        env.directory.clone(),
        Arc::new(MockTransportFactory::new().manual()),
        env.clock(),
    );
    host.set_microphone(true).unwrap();

    // Not started as a session; only its directory entry matters here.
    let listener_id = ParticipantId::new();
    env.directory.join(env.session, listener_id, Role::Listener);
    host.reconcile_now().unwrap();

    assert!(
        wait_for_state(host.status(), &listener_id, LinkState::AwaitingAnswer, TIMEOUT).await
    );
    host.shutdown().await.unwrap();
}
