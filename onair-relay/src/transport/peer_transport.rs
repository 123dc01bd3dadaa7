use crate::transport::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use onair_core::{LinkDirection, LinkId, ParticipantId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One real-time connection to a remote participant. Session descriptions and
/// candidates cross this boundary as opaque payload strings; only the
/// implementation interprets them.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Attach the local audio track so it is part of the next offer.
    async fn attach_local_audio(&self) -> Result<()>;

    /// Create an offer, apply it as the local description and return it.
    async fn create_offer(&self) -> Result<String>;

    /// Create an answer, apply it as the local description and return it.
    async fn create_answer(&self) -> Result<String>;

    async fn set_remote_description(&self, payload: &str) -> Result<()>;

    async fn add_ice_candidate(&self, payload: &str) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Creates transports. Connection state, generated candidates and incoming
/// tracks are reported through `events`, tagged with `link_id`.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create_link(
        &self,
        link_id: LinkId,
        remote: ParticipantId,
        direction: LinkDirection,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>>;
}
