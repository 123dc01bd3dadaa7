use crate::orchestrator::LinkStatusView;
use onair_core::{ParticipantId, SessionId};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session task is no longer running")]
    Closed,
}

/// Commands accepted by a running session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Turn the local audio track on or off.
    SetMicrophone(bool),
    /// Re-read the directory and reconcile right away.
    Reconcile,
    Shutdown(oneshot::Sender<()>),
}

/// Cheap handle to a session task.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    local_id: ParticipantId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    status: LinkStatusView,
}

impl SessionHandle {
    pub(crate) fn new(
        session_id: SessionId,
        local_id: ParticipantId,
        commands: mpsc::UnboundedSender<SessionCommand>,
        status: LinkStatusView,
    ) -> Self {
        Self {
            session_id,
            local_id,
            commands,
            status,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn local_id(&self) -> ParticipantId {
        self.local_id
    }

    /// Per-remote link state, updated as transitions happen.
    pub fn status(&self) -> &LinkStatusView {
        &self.status
    }

    pub fn set_microphone(&self, live: bool) -> Result<(), SessionError> {
        self.send(SessionCommand::SetMicrophone(live))
    }

    pub fn reconcile_now(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Reconcile)
    }

    /// Stop the session and wait until every link has been closed.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(SessionCommand::Shutdown(done_tx))?;
        done_rx.await.map_err(|_| SessionError::Closed)
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }
}
