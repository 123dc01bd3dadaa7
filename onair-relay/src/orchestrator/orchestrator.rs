use crate::orchestrator::link_worker::{LinkCommand, LinkWorker, Opening};
use crate::orchestrator::peer_link::WorkerHandle;
use crate::orchestrator::{LinkEvent, LinkEventKind, LinkStatusView, PeerLink, required_links};
use crate::store::SignalStore;
use crate::transport::TransportFactory;
use onair_core::{
    LinkDirection, LinkId, LinkState, Participant, ParticipantId, Role, SessionId, Signal,
    SignalKind,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything an orchestrator needs from its session.
#[derive(Clone)]
pub struct OrchestratorContext {
    pub session_id: SessionId,
    pub local_id: ParticipantId,
    pub store: Arc<dyn SignalStore>,
    pub transports: Arc<dyn TransportFactory>,
    pub disconnect_grace: Duration,
}

/// Owns every peer link of the local participant.
///
/// All mutation happens through `&mut self`, so the owning task is the only
/// writer. Network work is done by one worker task per link; workers report
/// back through the event channel returned by [`Orchestrator::new`].
pub struct Orchestrator {
    ctx: OrchestratorContext,

    links: HashMap<LinkId, PeerLink>,
    by_remote: HashMap<ParticipantId, LinkId>,
    next_link_id: u64,

    /// Newest offer per speaker waiting for an inbound placeholder: it came
    /// before the speaker was known, or its link failed before connecting.
    pending_offers: HashMap<ParticipantId, Signal>,
    /// Candidates that arrived before their link could take them.
    orphan_candidates: HashMap<ParticipantId, Vec<Signal>>,

    participants: Vec<Participant>,
    track_live: bool,

    status: LinkStatusView,
    events_tx: mpsc::UnboundedSender<LinkEvent>,
}

impl Orchestrator {
    pub fn new(ctx: OrchestratorContext) -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let orchestrator = Self {
            ctx,
            links: HashMap::new(),
            by_remote: HashMap::new(),
            next_link_id: 1,
            pending_offers: HashMap::new(),
            orphan_candidates: HashMap::new(),
            participants: Vec::new(),
            track_live: false,
            status: LinkStatusView::new(),
            events_tx,
        };
        (orchestrator, events_rx)
    }

    pub fn local_id(&self) -> ParticipantId {
        self.ctx.local_id
    }

    pub fn status(&self) -> LinkStatusView {
        self.status.clone()
    }

    pub fn link(&self, remote: &ParticipantId) -> Option<&PeerLink> {
        self.by_remote.get(remote).and_then(|id| self.links.get(id))
    }

    pub fn link_id_for(&self, remote: &ParticipantId) -> Option<LinkId> {
        self.by_remote.get(remote).copied()
    }

    pub fn linked_remotes(&self) -> Vec<ParticipantId> {
        let mut remotes: Vec<_> = self.by_remote.keys().copied().collect();
        remotes.sort();
        remotes
    }

    pub fn is_track_live(&self) -> bool {
        self.track_live
    }

    fn local_role(&self) -> Option<Role> {
        self.participants
            .iter()
            .find(|p| p.id == self.ctx.local_id && p.active)
            .map(|p| p.role)
    }

    /// Bring the set of links in line with `participants`.
    pub fn reconcile(&mut self, participants: &[Participant]) {
        self.participants = participants.to_vec();
        self.apply_topology();
    }

    /// Turn the local audio track on or off. Outbound links only exist while
    /// it is live.
    pub fn set_local_track_live(&mut self, live: bool) {
        if self.track_live == live {
            return;
        }
        info!("Local audio track {}", if live { "on" } else { "off" });
        self.track_live = live;
        self.apply_topology();
    }

    fn apply_topology(&mut self) {
        let required = required_links(self.ctx.local_id, &self.participants, self.track_live);

        let existing: Vec<(ParticipantId, LinkId)> =
            self.by_remote.iter().map(|(r, id)| (*r, *id)).collect();

        for (remote, link_id) in existing {
            let Some(link) = self.links.get(&link_id) else {
                continue;
            };
            let keep = required.get(&remote) == Some(&link.direction) && !link.state.is_terminal();
            if !keep {
                self.close_link(link_id);
            }
        }

        for (remote, direction) in required {
            if self.by_remote.contains_key(&remote) {
                continue;
            }
            match direction {
                LinkDirection::Outbound => self.open_outbound(remote),
                LinkDirection::Inbound => self.open_placeholder(remote),
            }
        }
    }

    fn allocate_link_id(&mut self) -> LinkId {
        let id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        id
    }

    fn insert_link(&mut self, link: PeerLink) {
        self.status.publish(link.remote, link.status());
        self.by_remote.insert(link.remote, link.id);
        self.links.insert(link.id, link);
    }

    fn open_outbound(&mut self, remote: ParticipantId) {
        let link_id = self.allocate_link_id();
        let mut link = PeerLink::new(link_id, remote, LinkDirection::Outbound);
        link.transition(LinkState::Offering);

        // Anything a listener sent before this link existed belongs to an
        // older offer.
        self.orphan_candidates.remove(&remote);

        info!("Opening {} to listener {}", link_id, remote);
        link.worker = Some(self.spawn_worker(link_id, remote, Opening::Offer));
        self.insert_link(link);
    }

    fn open_placeholder(&mut self, remote: ParticipantId) {
        let link_id = self.allocate_link_id();
        debug!("Waiting for an offer from speaker {} on {}", remote, link_id);
        self.insert_link(PeerLink::new(link_id, remote, LinkDirection::Inbound));

        if let Some(offer) = self.pending_offers.remove(&remote) {
            debug!("Replaying offer from {} at {}", remote, offer.timestamp);
            self.accept_offer(offer);
        }
    }

    fn spawn_worker(&self, link_id: LinkId, remote: ParticipantId, opening: Opening) -> WorkerHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let worker = LinkWorker {
            link_id,
            remote,
            local_id: self.ctx.local_id,
            session_id: self.ctx.session_id,
            opening,
            store: self.ctx.store.clone(),
            transports: self.ctx.transports.clone(),
            commands: commands_rx,
            events: self.events_tx.clone(),
            disconnect_grace: self.ctx.disconnect_grace,
        };

        WorkerHandle {
            commands: commands_tx,
            cancel: cancel_tx,
            join: tokio::spawn(worker.run(cancel_rx)),
        }
    }

    /// Tear a link down because topology no longer wants it.
    fn close_link(&mut self, link_id: LinkId) {
        let Some(mut link) = self.links.remove(&link_id) else {
            return;
        };
        if self.by_remote.get(&link.remote) == Some(&link_id) {
            self.by_remote.remove(&link.remote);
            self.status.remove(&link.remote);
        }

        if link.transition(LinkState::Closed) {
            info!("Closed {} to {}", link_id, link.remote);
        } else {
            debug!("Removed {} to {} ({})", link_id, link.remote, link.state);
        }
        if let Some(worker) = link.worker.take() {
            drop(worker.cancel());
        }
    }

    /// Apply one deduplicated signal addressed to the local participant.
    pub fn handle_signal(&mut self, signal: Signal) {
        if signal.from == self.ctx.local_id {
            debug!("Ignoring signal from self");
            return;
        }

        match signal.kind {
            SignalKind::Offer => self.handle_offer(signal),
            SignalKind::Answer => self.handle_answer(signal),
            SignalKind::Candidate => self.handle_candidate(signal),
        }
    }

    fn handle_offer(&mut self, signal: Signal) {
        if self.local_role().is_some_and(Role::is_speaker) {
            debug!("Speaker ignoring offer from {}", signal.from);
            return;
        }

        let Some(link) = self.link(&signal.from) else {
            // The speaker is not known yet; keep the newest offer for later.
            debug!("Holding offer from unknown speaker {}", signal.from);
            self.hold_offer(signal, Vec::new());
            return;
        };

        if link.direction != LinkDirection::Inbound {
            debug!("Ignoring offer from {} on an outbound link", signal.from);
            return;
        }
        if link.epoch.is_some_and(|epoch| signal.timestamp <= epoch) {
            debug!("Dropping stale offer from {} on {}", signal.from, link.id);
            return;
        }

        self.accept_offer(signal);
    }

    /// Keep `offer` until an inbound placeholder for its sender can take it,
    /// unless a newer one is already held.
    fn hold_offer(&mut self, offer: Signal, candidates: Vec<Signal>) {
        let remote = offer.from;
        let newer_held = self
            .pending_offers
            .get(&remote)
            .is_some_and(|held| held.timestamp >= offer.timestamp);
        if newer_held {
            return;
        }

        if !candidates.is_empty() {
            self.orphan_candidates
                .entry(remote)
                .or_default()
                .extend(candidates);
        }
        self.pending_offers.insert(remote, offer);
    }

    /// Start answering `offer`. An Idle placeholder turns into the new link;
    /// a link built on an older offer is replaced by a fresh one.
    fn accept_offer(&mut self, offer: Signal) {
        let remote = offer.from;
        let epoch = offer.timestamp;
        if self
            .pending_offers
            .get(&remote)
            .is_some_and(|held| held.timestamp <= epoch)
        {
            self.pending_offers.remove(&remote);
        }

        let link_id = match self.by_remote.get(&remote).copied() {
            Some(id) if self.links.get(&id).is_some_and(PeerLink::is_placeholder) => id,
            Some(old) => {
                info!("Newer offer from {} replaces {}", remote, old);
                self.close_link(old);
                let id = self.allocate_link_id();
                self.insert_link(PeerLink::new(id, remote, LinkDirection::Inbound));
                id
            }
            None => {
                let id = self.allocate_link_id();
                self.insert_link(PeerLink::new(id, remote, LinkDirection::Inbound));
                id
            }
        };

        let worker = self.spawn_worker(
            link_id,
            remote,
            Opening::Answer {
                offer: offer.payload.clone(),
                epoch,
            },
        );

        // Queued candidates that belong to this offer, in arrival order.
        let mut queued = self.orphan_candidates.remove(&remote).unwrap_or_default();
        queued.retain(|c| c.belongs_to(epoch));
        queued.sort_by_key(|c| c.timestamp);
        queued.dedup_by_key(|c| c.timestamp);
        for candidate in &queued {
            let _ = worker
                .commands
                .send(LinkCommand::RemoteCandidate(candidate.clone()));
        }

        let Some(link) = self.links.get_mut(&link_id) else {
            return;
        };
        link.epoch = Some(epoch);
        link.offer = Some(offer);
        link.remote_candidates = queued;
        link.transition(LinkState::Negotiating);
        link.worker = Some(worker);
        info!("Answering offer from {} on {}", remote, link_id);
        self.status.publish(remote, link.status());
    }

    fn handle_answer(&mut self, signal: Signal) {
        if self.local_role() == Some(Role::Listener) {
            debug!("Listener ignoring answer from {}", signal.from);
            return;
        }

        let Some(link) = self.link(&signal.from) else {
            debug!("Dropping answer from {} with no link", signal.from);
            return;
        };
        if link.direction != LinkDirection::Outbound {
            debug!("Dropping answer from {} on an inbound link", signal.from);
            return;
        }
        let Some(worker) = &link.worker else {
            debug!("Dropping answer from {} for finished {}", signal.from, link.id);
            return;
        };

        let _ = worker.commands.send(LinkCommand::RemoteAnswer(signal));
    }

    fn handle_candidate(&mut self, signal: Signal) {
        let link = self
            .by_remote
            .get(&signal.from)
            .and_then(|id| self.links.get_mut(id));
        if let Some(link) = link {
            if let Some(worker) = &link.worker {
                let _ = worker
                    .commands
                    .send(LinkCommand::RemoteCandidate(signal.clone()));
                if link.direction == LinkDirection::Inbound {
                    link.remote_candidates.push(signal);
                }
                return;
            }
        }

        debug!("Queueing candidate from {} at {}", signal.from, signal.timestamp);
        self.orphan_candidates
            .entry(signal.from)
            .or_default()
            .push(signal);
    }

    /// Apply progress reported by a worker. Events for retired links are
    /// dropped.
    pub fn handle_link_event(&mut self, event: LinkEvent) {
        let Some(link) = self.links.get_mut(&event.link_id) else {
            debug!("Dropping {:?} for retired {}", event.kind, event.link_id);
            return;
        };
        if link.remote != event.remote {
            warn!("{} reported an event for the wrong remote", event.link_id);
            return;
        }

        // An inbound link that ends before connecting gives its offer back,
        // so the replacement link answers it again. The speaker is still
        // waiting on that offer and will not send another.
        let gave_up = matches!(event.kind, LinkEventKind::Failed(_) | LinkEventKind::Closed)
            && link.direction == LinkDirection::Inbound
            && link.state != LinkState::Connected;
        let retry = if gave_up {
            link.offer
                .take()
                .map(|offer| (offer, std::mem::take(&mut link.remote_candidates)))
        } else {
            None
        };

        match event.kind {
            LinkEventKind::OfferSent { epoch } => {
                link.epoch = Some(epoch);
                link.transition(LinkState::AwaitingAnswer);
            }
            LinkEventKind::AnswerSent => {}
            LinkEventKind::RemoteDescriptionApplied => {
                if link.direction == LinkDirection::Outbound {
                    link.transition(LinkState::Negotiating);
                }
            }
            LinkEventKind::Connected => {
                if link.state != LinkState::Connected && link.transition(LinkState::Connected) {
                    info!("{} to {} connected", link.id, link.remote);
                }
            }
            LinkEventKind::ReceivingAudio => {
                if !link.state.is_terminal() {
                    link.receiving_audio = true;
                }
            }
            LinkEventKind::AudioStopped => link.receiving_audio = false,
            LinkEventKind::Failed(reason) => {
                if link.transition(LinkState::Failed) {
                    warn!("{} to {} failed: {}", link.id, link.remote, reason);
                }
                link.worker = None;
            }
            LinkEventKind::Closed => {
                link.transition(LinkState::Closed);
                link.worker = None;
            }
        }

        if self.by_remote.get(&link.remote) == Some(&link.id) {
            self.status.publish(link.remote, link.status());
        }

        if let Some((offer, candidates)) = retry {
            debug!("Holding offer from {} at {} for a retry", offer.from, offer.timestamp);
            self.hold_offer(offer, candidates);
        }
    }

    /// Forget held offers and queued candidates older than `cutoff`.
    pub fn evict_expired(&mut self, cutoff: u64) {
        self.pending_offers.retain(|_, offer| offer.timestamp >= cutoff);
        self.orphan_candidates.retain(|_, queued| {
            queued.retain(|c| c.timestamp >= cutoff);
            !queued.is_empty()
        });
    }

    pub fn pending_offer_count(&self) -> usize {
        self.pending_offers.len()
    }

    /// Cancel every worker and return their handles so the caller can wait
    /// for transports to close.
    pub fn shutdown(&mut self) -> Vec<JoinHandle<()>> {
        let handles = self
            .links
            .drain()
            .filter_map(|(_, mut link)| link.worker.take())
            .map(WorkerHandle::cancel)
            .collect();

        self.by_remote.clear();
        self.pending_offers.clear();
        self.orphan_candidates.clear();
        self.status.clear();
        handles
    }
}
