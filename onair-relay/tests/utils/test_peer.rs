use crate::utils::{MockTransport, MockTransportFactory};
use onair_core::{
    Clock, LinkState, ManualClock, NewSignal, ParticipantId, Role, SessionId, Signal, SignalKind,
};
use onair_relay::{
    LinkEvent, LinkStatusView, MemoryRoleDirectory, MemorySignalStore, Orchestrator,
    OrchestratorContext, RoleDirectory, SignalDeduplicator, SignalPoller, SignalStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const POLL_WINDOW: Duration = Duration::from_secs(60);

/// One session with a frozen clock shared by every peer.
pub struct TestEnv {
    pub session: SessionId,
    pub clock: ManualClock,
    pub store: Arc<MemorySignalStore>,
    pub directory: Arc<MemoryRoleDirectory>,
}

impl TestEnv {
    pub fn new() -> Self {
        let clock = ManualClock::new(1_000_000);
        Self {
            session: SessionId::new(),
            store: Arc::new(MemorySignalStore::new(Arc::new(clock.clone()))),
            clock,
            directory: Arc::new(MemoryRoleDirectory::new()),
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::new(self.clock.clone())
    }

    /// Register a participant and return a peer driven by hand.
    pub fn peer(&self, role: Role) -> TestPeer {
        self.peer_with(role, MockTransportFactory::new())
    }

    pub fn peer_with(&self, role: Role, transports: MockTransportFactory) -> TestPeer {
        let id = ParticipantId::new();
        self.directory.join(self.session, id, role);
        TestPeer::new(self, id, transports)
    }

    /// Store a signal as if `from` had sent it.
    pub async fn inject(
        &self,
        from: ParticipantId,
        to: ParticipantId,
        kind: SignalKind,
        payload: &str,
    ) -> Signal {
        self.inject_for_offer(from, to, kind, payload, None).await
    }

    /// Like `inject`, tagged with the epoch of the offer it replies to.
    pub async fn inject_for_offer(
        &self,
        from: ParticipantId,
        to: ParticipantId,
        kind: SignalKind,
        payload: &str,
        epoch: Option<u64>,
    ) -> Signal {
        self.store
            .append_signal(NewSignal {
                session_id: self.session,
                from,
                to,
                kind,
                payload: payload.to_string(),
                epoch,
            })
            .await
            .unwrap()
    }

    pub fn signals_from(&self, from: ParticipantId) -> Vec<Signal> {
        self.store
            .all_signals(&self.session)
            .into_iter()
            .filter(|s| s.from == from)
            .collect()
    }
}

/// The poll, dedup and dispatch pipeline of one participant, stepped
/// explicitly instead of by timers.
pub struct TestPeer {
    pub id: ParticipantId,
    pub orchestrator: Orchestrator,
    pub transports: MockTransportFactory,
    events: mpsc::UnboundedReceiver<LinkEvent>,
    poller: SignalPoller,
    dedup: SignalDeduplicator,
    directory: Arc<MemoryRoleDirectory>,
    session: SessionId,
}

impl TestPeer {
    fn new(env: &TestEnv, id: ParticipantId, transports: MockTransportFactory) -> Self {
        let store: Arc<dyn SignalStore> = env.store.clone();
        let (orchestrator, events) = Orchestrator::new(OrchestratorContext {
            session_id: env.session,
            local_id: id,
            store: store.clone(),
            transports: Arc::new(transports.clone()),
            disconnect_grace: Duration::from_millis(200),
        });

        Self {
            id,
            orchestrator,
            transports,
            events,
            poller: SignalPoller::new(store, env.session, id, POLL_WINDOW, env.clock()),
            dedup: SignalDeduplicator::new(),
            directory: env.directory.clone(),
            session: env.session,
        }
    }

    pub fn status(&self) -> LinkStatusView {
        self.orchestrator.status()
    }

    pub fn state_of(&self, remote: &ParticipantId) -> Option<LinkState> {
        self.status().get(remote).map(|s| s.state)
    }

    pub fn transport_to(&self, remote: &ParticipantId) -> Option<Arc<MockTransport>> {
        let link_id = self.orchestrator.link_id_for(remote)?;
        self.transports.transport(link_id)
    }

    pub async fn reconcile(&mut self) {
        let participants = self
            .directory
            .list_active_participants(&self.session)
            .await
            .unwrap();
        self.orchestrator.reconcile(&participants);
    }

    /// One poll tick plus every link event reported so far.
    pub async fn pump(&mut self) {
        if let Ok(signals) = self.poller.poll().await {
            for signal in signals {
                if self.dedup.admit(&signal) {
                    self.orchestrator.handle_signal(signal);
                }
            }
        }
        self.dedup.evict_older_than(self.poller.window_start());

        while let Ok(event) = self.events.try_recv() {
            self.orchestrator.handle_link_event(event);
        }
    }

    /// Apply every signal of `kind` in the window again, bypassing the
    /// deduplicator.
    pub async fn replay_window(&mut self, kind: SignalKind) {
        for signal in self.poller.poll().await.unwrap() {
            if signal.kind == kind {
                self.orchestrator.handle_signal(signal);
            }
        }
    }
}

/// Pump every peer until `done` holds or `timeout` passes.
pub async fn pump_until<F>(peers: &mut [&mut TestPeer], timeout: Duration, done: F) -> bool
where
    F: Fn() -> bool,
{
    let start = std::time::Instant::now();
    loop {
        for peer in peers.iter_mut() {
            peer.pump().await;
        }
        if done() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait until `remote` is in `state` in `view`.
pub async fn wait_for_state(
    view: &LinkStatusView,
    remote: &ParticipantId,
    state: LinkState,
    timeout: Duration,
) -> bool {
    let mut changes = view.subscribe();
    let check = || view.get(remote).is_some_and(|s| s.state == state);

    tokio::time::timeout(timeout, async {
        while !check() {
            if changes.changed().await.is_err() {
                return false;
            }
        }
        true
    })
    .await
    .unwrap_or(false)
}
