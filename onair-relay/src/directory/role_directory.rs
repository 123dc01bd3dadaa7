use async_trait::async_trait;
use onair_core::{Participant, SessionId};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("role directory unavailable: {0}")]
    Unavailable(String),
    #[error("malformed role directory response: {0}")]
    Decode(String),
}

/// Read-only view of session membership.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Participants currently active in the session, with their roles.
    async fn list_active_participants(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Participant>, DirectoryError>;

    /// Receiver that changes whenever membership of the session changes.
    /// Directories that cannot push changes return a receiver whose sender is
    /// already gone; callers then rely on periodic refresh.
    fn subscribe(&self, session_id: &SessionId) -> watch::Receiver<u64>;
}

#[async_trait]
impl<T: RoleDirectory + ?Sized> RoleDirectory for Arc<T> {
    async fn list_active_participants(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Participant>, DirectoryError> {
        (**self).list_active_participants(session_id).await
    }

    fn subscribe(&self, session_id: &SessionId) -> watch::Receiver<u64> {
        (**self).subscribe(session_id)
    }
}
