use crate::orchestrator::link_worker::LinkCommand;
use onair_core::{LinkDirection, LinkId, LinkState, LinkStatus, ParticipantId, Signal};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Channels to the task negotiating one link.
pub(crate) struct WorkerHandle {
    pub commands: mpsc::UnboundedSender<LinkCommand>,
    pub cancel: oneshot::Sender<()>,
    pub join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop the worker. It closes its transport on the way out.
    pub fn cancel(self) -> JoinHandle<()> {
        let _ = self.cancel.send(());
        self.join
    }
}

/// One desired connection to a remote participant.
pub struct PeerLink {
    pub id: LinkId,
    pub remote: ParticipantId,
    pub direction: LinkDirection,
    pub state: LinkState,
    /// Store timestamp of the offer this link is built on. `None` until known.
    pub epoch: Option<u64>,
    pub receiving_audio: bool,
    pub(crate) worker: Option<WorkerHandle>,
    /// Inbound only: the offer being answered and the remote candidates
    /// handed to the worker so far.
    pub(crate) offer: Option<Signal>,
    pub(crate) remote_candidates: Vec<Signal>,
}

impl PeerLink {
    pub(crate) fn new(id: LinkId, remote: ParticipantId, direction: LinkDirection) -> Self {
        Self {
            id,
            remote,
            direction,
            state: LinkState::Idle,
            epoch: None,
            receiving_audio: false,
            worker: None,
            offer: None,
            remote_candidates: Vec::new(),
        }
    }

    pub fn status(&self) -> LinkStatus {
        LinkStatus {
            link_id: self.id,
            direction: self.direction,
            state: self.state,
            receiving_audio: self.receiving_audio,
        }
    }

    /// An inbound link that has not seen an offer yet.
    pub fn is_placeholder(&self) -> bool {
        self.state == LinkState::Idle && self.worker.is_none()
    }

    /// Move to `next` if the state machine allows it.
    pub(crate) fn transition(&mut self, next: LinkState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        if next.is_terminal() {
            self.receiving_audio = false;
        }
        true
    }
}
