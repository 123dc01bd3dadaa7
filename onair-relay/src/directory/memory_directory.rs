use crate::directory::{DirectoryError, RoleDirectory};
use async_trait::async_trait;
use dashmap::DashMap;
use onair_core::{Participant, ParticipantId, Role, SessionId};
use tokio::sync::watch;
use tracing::info;

struct DirectorySession {
    participants: Vec<Participant>,
    version: watch::Sender<u64>,
}

impl DirectorySession {
    fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            participants: Vec::new(),
            version,
        }
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

/// Role directory kept in process memory. Membership is managed by whoever owns
/// the session; the relay only reads it.
#[derive(Default)]
pub struct MemoryRoleDirectory {
    sessions: DashMap<SessionId, DirectorySession>,
}

impl MemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a participant entry.
    pub fn upsert(&self, session_id: SessionId, participant: Participant) {
        let mut session = self
            .sessions
            .entry(session_id)
            .or_insert_with(DirectorySession::new);

        info!(
            "Directory {}: {} is {:?} (active: {})",
            session_id, participant.id, participant.role, participant.active
        );

        match session
            .participants
            .iter_mut()
            .find(|p| p.id == participant.id)
        {
            Some(existing) => *existing = participant,
            None => session.participants.push(participant),
        }
        session.bump();
    }

    pub fn join(&self, session_id: SessionId, id: ParticipantId, role: Role) {
        self.upsert(session_id, Participant::new(id, role));
    }

    /// Mark a participant inactive. Returns false if it was never known.
    pub fn leave(&self, session_id: SessionId, id: ParticipantId) -> bool {
        self.update(session_id, id, |p| p.active = false)
    }

    pub fn set_role(&self, session_id: SessionId, id: ParticipantId, role: Role) -> bool {
        self.update(session_id, id, |p| p.role = role)
    }

    /// Every known participant, active or not.
    pub fn participants(&self, session_id: &SessionId) -> Vec<Participant> {
        self.sessions
            .get(session_id)
            .map(|s| s.participants.clone())
            .unwrap_or_default()
    }

    fn update(
        &self,
        session_id: SessionId,
        id: ParticipantId,
        f: impl FnOnce(&mut Participant),
    ) -> bool {
        let Some(mut session) = self.sessions.get_mut(&session_id) else {
            return false;
        };
        let Some(participant) = session.participants.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        f(participant);
        session.bump();
        true
    }
}

#[async_trait]
impl RoleDirectory for MemoryRoleDirectory {
    async fn list_active_participants(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Participant>, DirectoryError> {
        Ok(self
            .sessions
            .get(session_id)
            .map(|s| s.participants.iter().filter(|p| p.active).cloned().collect())
            .unwrap_or_default())
    }

    fn subscribe(&self, session_id: &SessionId) -> watch::Receiver<u64> {
        self.sessions
            .entry(*session_id)
            .or_insert_with(DirectorySession::new)
            .version
            .subscribe()
    }
}
