use crate::orchestrator::{LinkEvent, LinkEventKind};
use crate::store::SignalStore;
use crate::transport::{PeerTransport, TransportEvent, TransportFactory, TransportState};
use anyhow::{Context, Result, bail};
use onair_core::{LinkDirection, LinkId, NewSignal, ParticipantId, SessionId, Signal, SignalKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Remote signals the orchestrator routes to a running link.
#[derive(Debug)]
pub(crate) enum LinkCommand {
    RemoteAnswer(Signal),
    RemoteCandidate(Signal),
}

/// How the link starts negotiating.
pub(crate) enum Opening {
    /// Attach the local track and send an offer.
    Offer,
    /// Apply the remote offer and send an answer.
    Answer { offer: String, epoch: u64 },
}

enum LinkEnd {
    /// The transport closed or the orchestrator let go of the link.
    Closed,
}

pub(crate) struct LinkWorker {
    pub link_id: LinkId,
    pub remote: ParticipantId,
    pub local_id: ParticipantId,
    pub session_id: SessionId,
    pub opening: Opening,
    pub store: Arc<dyn SignalStore>,
    pub transports: Arc<dyn TransportFactory>,
    pub commands: mpsc::UnboundedReceiver<LinkCommand>,
    pub events: mpsc::UnboundedSender<LinkEvent>,
    pub disconnect_grace: Duration,
}

/// Per-link negotiation state kept by the worker.
struct Negotiation {
    epoch: u64,
    remote_applied: bool,
    queued_candidates: Vec<String>,
    track_seen: bool,
    grace_deadline: Option<Instant>,
}

impl LinkWorker {
    fn direction(&self) -> LinkDirection {
        match self.opening {
            Opening::Offer => LinkDirection::Outbound,
            Opening::Answer { .. } => LinkDirection::Inbound,
        }
    }

    /// Drive the link until it ends or `cancel` fires. The transport is
    /// closed either way.
    pub async fn run(mut self, cancel: oneshot::Receiver<()>) {
        let mut transport: Option<Arc<dyn PeerTransport>> = None;

        let outcome = tokio::select! {
            _ = cancel => None,
            result = self.drive(&mut transport) => Some(result),
        };

        match outcome {
            None => debug!("{} to {} cancelled", self.link_id, self.remote),
            Some(Ok(LinkEnd::Closed)) => {
                info!("{} to {} closed", self.link_id, self.remote);
                self.emit(LinkEventKind::Closed);
            }
            Some(Err(e)) => {
                warn!("{} to {} failed: {:#}", self.link_id, self.remote, e);
                self.emit(LinkEventKind::Failed(format!("{:#}", e)));
            }
        }

        if let Some(transport) = transport {
            if let Err(e) = transport.close().await {
                debug!("Closing transport of {} failed: {}", self.link_id, e);
            }
        }
    }

    async fn drive(&mut self, slot: &mut Option<Arc<dyn PeerTransport>>) -> Result<LinkEnd> {
        let (transport_tx, mut transport_rx) = mpsc::channel(256);
        let transport = self
            .transports
            .create_link(self.link_id, self.remote, self.direction(), transport_tx)
            .await
            .context("Failed to create transport")?;
        *slot = Some(transport.clone());

        let mut negotiation = self.open(transport.as_ref()).await?;

        // Candidates are read only from here on, so every local candidate is
        // stored after the offer or answer.
        loop {
            let deadline = negotiation.grace_deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(c) => self.handle_command(c, transport.as_ref(), &mut negotiation).await?,
                        None => return Ok(LinkEnd::Closed),
                    }
                }

                event = transport_rx.recv() => {
                    match event {
                        Some(e) => {
                            if let Some(end) = self.handle_transport_event(e, &mut negotiation).await? {
                                return Ok(end);
                            }
                        }
                        None => bail!("transport event channel closed"),
                    }
                }

                _ = sleep_until(deadline), if negotiation.grace_deadline.is_some() => {
                    bail!("disconnected for longer than {:?}", self.disconnect_grace);
                }
            }
        }
    }

    async fn open(&self, transport: &dyn PeerTransport) -> Result<Negotiation> {
        match &self.opening {
            Opening::Offer => {
                transport
                    .attach_local_audio()
                    .await
                    .context("Failed to attach local audio")?;
                let offer = transport.create_offer().await.context("Failed to create offer")?;
                let stored = self.send_signal(SignalKind::Offer, offer, None).await?;

                info!("{} sent offer to {} at {}", self.link_id, self.remote, stored);
                self.emit(LinkEventKind::OfferSent { epoch: stored });

                Ok(Negotiation {
                    epoch: stored,
                    remote_applied: false,
                    queued_candidates: Vec::new(),
                    track_seen: false,
                    grace_deadline: None,
                })
            }
            Opening::Answer { offer, epoch } => {
                let epoch = *epoch;
                transport
                    .set_remote_description(offer)
                    .await
                    .context("Failed to apply remote offer")?;
                self.emit(LinkEventKind::RemoteDescriptionApplied);

                let answer = transport
                    .create_answer()
                    .await
                    .context("Failed to create answer")?;
                let stored = self
                    .send_signal(SignalKind::Answer, answer, Some(epoch))
                    .await?;

                info!("{} sent answer to {} at {}", self.link_id, self.remote, stored);
                self.emit(LinkEventKind::AnswerSent);

                Ok(Negotiation {
                    epoch,
                    remote_applied: true,
                    queued_candidates: Vec::new(),
                    track_seen: false,
                    grace_deadline: None,
                })
            }
        }
    }

    async fn handle_command(
        &self,
        command: LinkCommand,
        transport: &dyn PeerTransport,
        negotiation: &mut Negotiation,
    ) -> Result<()> {
        match command {
            LinkCommand::RemoteAnswer(answer) => {
                if !answer.belongs_to(negotiation.epoch) {
                    debug!(
                        "{} dropping answer to another offer ({:?})",
                        self.link_id, answer.epoch
                    );
                    return Ok(());
                }
                if negotiation.remote_applied {
                    debug!("{} already has a remote description", self.link_id);
                    return Ok(());
                }

                transport
                    .set_remote_description(&answer.payload)
                    .await
                    .context("Failed to apply remote answer")?;
                negotiation.remote_applied = true;
                self.emit(LinkEventKind::RemoteDescriptionApplied);

                for candidate in std::mem::take(&mut negotiation.queued_candidates) {
                    self.apply_candidate(transport, &candidate).await;
                }
            }
            LinkCommand::RemoteCandidate(candidate) => {
                if !candidate.belongs_to(negotiation.epoch) {
                    debug!("{} dropping candidate for another offer", self.link_id);
                    return Ok(());
                }
                if negotiation.remote_applied {
                    self.apply_candidate(transport, &candidate.payload).await;
                } else {
                    negotiation.queued_candidates.push(candidate.payload);
                }
            }
        }
        Ok(())
    }

    async fn apply_candidate(&self, transport: &dyn PeerTransport, candidate: &str) {
        // A single bad candidate does not fail the link; others may still work.
        if let Err(e) = transport.add_ice_candidate(candidate).await {
            warn!("{} rejected a remote candidate: {:#}", self.link_id, e);
        }
    }

    async fn handle_transport_event(
        &self,
        event: TransportEvent,
        negotiation: &mut Negotiation,
    ) -> Result<Option<LinkEnd>> {
        if event.link_id() != self.link_id {
            debug!("{} ignoring event for {}", self.link_id, event.link_id());
            return Ok(None);
        }

        match event {
            TransportEvent::CandidateGenerated(_, candidate) => {
                let epoch = Some(negotiation.epoch);
                if let Err(e) = self.send_signal(SignalKind::Candidate, candidate, epoch).await {
                    warn!("{} could not store a local candidate: {:#}", self.link_id, e);
                }
            }
            TransportEvent::TrackReceived(_) => {
                negotiation.track_seen = true;
                self.emit(LinkEventKind::ReceivingAudio);
            }
            TransportEvent::StateChanged(_, state) => match state {
                TransportState::New | TransportState::Connecting => {}
                TransportState::Connected => {
                    negotiation.grace_deadline = None;
                    self.emit(LinkEventKind::Connected);
                    if negotiation.track_seen {
                        self.emit(LinkEventKind::ReceivingAudio);
                    }
                }
                TransportState::Disconnected => {
                    if negotiation.grace_deadline.is_none() {
                        negotiation.grace_deadline = Some(Instant::now() + self.disconnect_grace);
                    }
                    if negotiation.track_seen {
                        self.emit(LinkEventKind::AudioStopped);
                    }
                }
                TransportState::Failed => bail!("transport failed"),
                TransportState::Closed => return Ok(Some(LinkEnd::Closed)),
            },
        }
        Ok(None)
    }

    /// Append a signal to the remote and return its store timestamp. Answers
    /// and candidates carry the epoch of the offer they belong to.
    async fn send_signal(
        &self,
        kind: SignalKind,
        payload: String,
        epoch: Option<u64>,
    ) -> Result<u64> {
        let stored = self
            .store
            .append_signal(NewSignal {
                session_id: self.session_id,
                from: self.local_id,
                to: self.remote,
                kind,
                payload,
                epoch,
            })
            .await
            .with_context(|| format!("Failed to store {}", kind))?;
        Ok(stored.timestamp)
    }

    fn emit(&self, kind: LinkEventKind) {
        let _ = self.events.send(LinkEvent {
            link_id: self.link_id,
            remote: self.remote,
            kind,
        });
    }
}
