use onair_core::{LinkState, Role, SignalKind};
use onair_relay::TransportState;

use crate::integration::{TIMEOUT, eventually, init_tracing};
use crate::utils::{TestEnv, pump_until};

#[tokio::test]
async fn test_recreated_link_ignores_answers_to_the_old_offer() {
    init_tracing();

    let env = TestEnv::new();
    let mut speaker = env.peer(Role::Host);
    let mut listener = env.peer(Role::Listener);
    let (s_id, l_id) = (speaker.id, listener.id);

    speaker.orchestrator.set_local_track_live(true);
    speaker.reconcile().await;
    listener.reconcile().await;

    let (s_view, l_view) = (speaker.status(), listener.status());
    let both_connected = || {
        s_view.get(&l_id).is_some_and(|s| s.state == LinkState::Connected)
            && l_view.get(&s_id).is_some_and(|s| s.state == LinkState::Connected)
    };
    assert!(pump_until(&mut [&mut speaker, &mut listener], TIMEOUT, both_connected).await);

    let first_link = speaker.orchestrator.link_id_for(&l_id).unwrap();
    let old_answer = env
        .signals_from(l_id)
        .into_iter()
        .find(|s| s.kind == SignalKind::Answer)
        .unwrap();

    speaker
        .transport_to(&l_id)
        .unwrap()
        .set_state(TransportState::Failed)
        .await;
    let failed = pump_until(&mut [&mut speaker], TIMEOUT, || {
        s_view.get(&l_id).is_some_and(|s| s.state == LinkState::Failed)
    })
    .await;
    assert!(failed);
    let first_transport = speaker.transports.transport(first_link).unwrap();
    assert!(eventually(TIMEOUT, || first_transport.is_closed()).await);

    speaker.reconcile().await;
    let second_link = speaker.orchestrator.link_id_for(&l_id).unwrap();
    assert!(second_link > first_link);

    assert!(pump_until(&mut [&mut speaker, &mut listener], TIMEOUT, both_connected).await);
    assert_eq!(speaker.orchestrator.link_id_for(&l_id), Some(second_link));

    // The listener replaced its link for the newer offer.
    assert_eq!(listener.transports.created().len(), 2);
    let new_transport = speaker.transports.transport(second_link).unwrap();
    assert_eq!(new_transport.remote_descriptions().len(), 1);

    // An answer to the first offer reaching the new link is stale.
    speaker.orchestrator.handle_signal(old_answer);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    speaker.pump().await;
    assert_eq!(new_transport.remote_descriptions().len(), 1);
    assert!(
        eventually(TIMEOUT, || {
            listener.transports.created()[0].is_closed()
        })
        .await
    );
}

#[tokio::test]
async fn test_answer_to_a_replaced_offer_is_not_applied() {
    init_tracing();

    let env = TestEnv::new();
    let mut speaker = env.peer(Role::Host);
    let mut listener = env.peer(Role::Listener);
    let (s_id, l_id) = (speaker.id, listener.id);

    speaker.orchestrator.set_local_track_live(true);
    speaker.reconcile().await;
    let s_view = speaker.status();
    let offered = pump_until(&mut [&mut speaker], TIMEOUT, || {
        s_view.get(&l_id).is_some_and(|s| s.state == LinkState::AwaitingAnswer)
    })
    .await;
    assert!(offered);

    let offer = env
        .signals_from(s_id)
        .into_iter()
        .find(|s| s.kind == SignalKind::Offer)
        .unwrap();

    // An answer from a retired listener link lands after the current offer
    // but names an earlier one.
    let late = env
        .inject_for_offer(
            l_id,
            s_id,
            SignalKind::Answer,
            "answer:retired",
            Some(offer.timestamp - 1),
        )
        .await;
    assert!(late.timestamp > offer.timestamp);
    speaker.pump().await;

    listener.reconcile().await;
    let l_view = listener.status();
    let connected = pump_until(&mut [&mut speaker, &mut listener], TIMEOUT, || {
        s_view.get(&l_id).is_some_and(|s| s.state == LinkState::Connected)
            && l_view.get(&s_id).is_some_and(|s| s.state == LinkState::Connected)
    })
    .await;
    assert!(connected);

    let listener_link = listener.orchestrator.link_id_for(&s_id).unwrap();
    let transport = speaker.transport_to(&l_id).unwrap();
    assert_eq!(
        transport.remote_descriptions(),
        vec![format!("answer:{}", listener_link.0)]
    );

    let answer = env
        .signals_from(l_id)
        .into_iter()
        .find(|s| s.kind == SignalKind::Answer && s.payload != "answer:retired")
        .unwrap();
    assert_eq!(answer.epoch, Some(offer.timestamp));
}
