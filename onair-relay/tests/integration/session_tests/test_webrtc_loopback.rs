use bytes::Bytes;
use onair_core::{LinkState, ParticipantId, Role};
use onair_relay::{AudioRouting, LocalAudioTrack, RemoteAudioPacket, SessionParams, spawn_session};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::integration::init_tracing;
use crate::integration::session_tests::fast_config;
use crate::utils::{TestEnv, wait_for_state};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Smallest valid Opus frame: 20ms of silence.
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_real_webrtc_sessions_connect_and_carry_audio() {
    init_tracing();

    let env = TestEnv::new();
    let (host_id, listener_id) = (ParticipantId::new(), ParticipantId::new());
    env.directory.join(env.session, host_id, Role::Host);
    env.directory.join(env.session, listener_id, Role::Listener);

    // fast_config() keeps ICE to host candidates.
    let mic = LocalAudioTrack::new(format!("onair-{}", host_id));
    let host = spawn_session(
        SessionParams::webrtc(
            env.session,
            host_id,
            fast_config(),
            env.store.clone(),
            env.directory.clone(),
            AudioRouting {
                microphone: Some(mic.clone()),
                ..AudioRouting::default()
            },
        )
        .with_clock(env.clock()),
    )
    .unwrap();

    let (audio_tx, mut audio_rx) = broadcast::channel::<RemoteAudioPacket>(64);
    let listener = spawn_session(
        SessionParams::webrtc(
            env.session,
            listener_id,
            fast_config(),
            env.store.clone(),
            env.directory.clone(),
            AudioRouting {
                playback: Some(audio_tx),
                ..AudioRouting::default()
            },
        )
        .with_clock(env.clock()),
    )
    .unwrap();
    host.set_microphone(true).unwrap();

    assert!(
        wait_for_state(host.status(), &listener_id, LinkState::Connected, CONNECT_TIMEOUT).await,
        "speaker side did not connect"
    );
    assert!(
        wait_for_state(listener.status(), &host_id, LinkState::Connected, CONNECT_TIMEOUT).await,
        "listener side did not connect"
    );

    let writer = tokio::spawn(async move {
        loop {
            let _ = mic
                .write_sample(Bytes::from_static(&OPUS_SILENCE), Duration::from_millis(20))
                .await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    });

    let packet = tokio::time::timeout(CONNECT_TIMEOUT, audio_rx.recv())
        .await
        .expect("no audio within timeout")
        .expect("audio channel closed");
    assert_eq!(packet.from, host_id);
    assert!(!packet.payload.is_empty());

    writer.abort();
    host.shutdown().await.unwrap();
    listener.shutdown().await.unwrap();
}
