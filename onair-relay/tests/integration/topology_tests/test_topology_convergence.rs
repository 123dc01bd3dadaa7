use onair_core::{LinkDirection, LinkState, ParticipantId, Role};
use onair_relay::LinkStatusView;

use crate::integration::{TIMEOUT, init_tracing};
use crate::utils::{TestEnv, TestPeer, pump_until};

fn connected_to(view: &LinkStatusView, remotes: &[ParticipantId]) -> bool {
    view.len() == remotes.len()
        && remotes
            .iter()
            .all(|r| view.get(r).is_some_and(|s| s.state == LinkState::Connected))
}

async fn reconcile_all(peers: &mut [&mut TestPeer]) {
    for peer in peers.iter_mut() {
        peer.reconcile().await;
    }
}

#[tokio::test]
async fn test_links_follow_directory_changes() {
    init_tracing();

    let env = TestEnv::new();
    let mut host = env.peer(Role::Host);
    let mut cohost = env.peer(Role::Cohost);
    let mut l1 = env.peer(Role::Listener);
    let mut l2 = env.peer(Role::Listener);
    let mut l3 = env.peer(Role::Listener);
    let (h, c) = (host.id, cohost.id);
    let (l1_id, l2_id, l3_id) = (l1.id, l2.id, l3.id);

    host.orchestrator.set_local_track_live(true);
    cohost.orchestrator.set_local_track_live(true);

    let views = [
        host.status(),
        cohost.status(),
        l1.status(),
        l2.status(),
        l3.status(),
    ];

    {
        let mut peers = [&mut host, &mut cohost, &mut l1, &mut l2, &mut l3];
        reconcile_all(&mut peers).await;

        let converged = pump_until(&mut peers, TIMEOUT, || {
            connected_to(&views[0], &[l1_id, l2_id, l3_id])
                && connected_to(&views[1], &[l1_id, l2_id, l3_id])
                && views[2..].iter().all(|v| connected_to(v, &[h, c]))
        })
        .await;
        assert!(converged, "full mesh between speakers and listeners");
    }

    // Reconciling again against the same directory changes nothing.
    let before = host.orchestrator.link_id_for(&l1_id);
    host.reconcile().await;
    l1.reconcile().await;
    assert_eq!(host.orchestrator.link_id_for(&l1_id), before);
    assert_eq!(l1.orchestrator.linked_remotes().len(), 2);

    // l3 leaves.
    env.directory.leave(env.session, l3_id);
    host.reconcile().await;
    cohost.reconcile().await;
    assert!(host.orchestrator.link(&l3_id).is_none());
    assert!(cohost.orchestrator.link(&l3_id).is_none());
    assert_eq!(views[0].len(), 2);

    // The cohost steps down and becomes a listener.
    env.directory.set_role(env.session, c, Role::Listener);
    {
        let mut peers = [&mut host, &mut cohost, &mut l1, &mut l2];
        reconcile_all(&mut peers).await;

        let converged = pump_until(&mut peers, TIMEOUT, || {
            connected_to(&views[0], &[l1_id, l2_id, c])
                && connected_to(&views[1], &[h])
                && connected_to(&views[2], &[h])
                && connected_to(&views[3], &[h])
        })
        .await;
        assert!(converged, "former cohost now listens to the host");
    }

    assert_eq!(
        cohost.orchestrator.link(&h).map(|l| l.direction),
        Some(LinkDirection::Inbound)
    );
    assert!(cohost.orchestrator.link(&l1_id).is_none());
}
