use crate::directory::{DirectoryError, RoleDirectory};
use crate::store::{SignalStore, StoreError};
use async_trait::async_trait;
use onair_core::{
    NewSignal, Participant, ParticipantId, PurgeQuery, PurgeResponse, SendSignalRequest,
    SessionId, Signal, SignalQuery,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio::sync::watch;

/// Signal store and role directory served by `onair-server`.
#[derive(Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

enum Failure {
    Transport(String),
    Status(String),
    Decode(String),
}

impl From<Failure> for StoreError {
    fn from(f: Failure) -> Self {
        match f {
            Failure::Transport(e) => StoreError::Unavailable(e),
            Failure::Status(e) => StoreError::Rejected(e),
            Failure::Decode(e) => StoreError::Decode(e),
        }
    }
}

impl From<Failure> for DirectoryError {
    fn from(f: Failure) -> Self {
        match f {
            Failure::Transport(e) | Failure::Status(e) => DirectoryError::Unavailable(e),
            Failure::Decode(e) => DirectoryError::Decode(e),
        }
    }
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, session_id: &SessionId, tail: &str) -> String {
        format!("{}/sessions/{}/{}", self.base_url, session_id, tail)
    }

    async fn read<T: DeserializeOwned>(
        res: Result<Response, reqwest::Error>,
    ) -> Result<T, Failure> {
        let res = res.map_err(|e| Failure::Transport(e.to_string()))?;

        if res.status().is_success() {
            res.json::<T>()
                .await
                .map_err(|e| Failure::Decode(e.to_string()))
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(Failure::Status(format!("{} {}", status, body)))
        }
    }
}

#[async_trait]
impl SignalStore for HttpBackend {
    async fn append_signal(&self, signal: NewSignal) -> Result<Signal, StoreError> {
        let body = SendSignalRequest {
            from: signal.from,
            to: signal.to,
            kind: signal.kind,
            payload: signal.payload,
            epoch: signal.epoch,
        };
        let res = self
            .http
            .post(self.url(&signal.session_id, "signals"))
            .json(&body)
            .send()
            .await;
        Ok(Self::read(res).await?)
    }

    async fn query_signals_to(
        &self,
        session_id: &SessionId,
        recipient: &ParticipantId,
        since: u64,
    ) -> Result<Vec<Signal>, StoreError> {
        let query = SignalQuery {
            to: *recipient,
            since,
        };
        let res = self
            .http
            .get(self.url(session_id, "signals"))
            .query(&query)
            .send()
            .await;
        Ok(Self::read(res).await?)
    }

    async fn purge_signals_older_than(
        &self,
        session_id: &SessionId,
        cutoff: u64,
    ) -> Result<usize, StoreError> {
        let res = self
            .http
            .delete(self.url(session_id, "signals"))
            .query(&PurgeQuery { before: cutoff })
            .send()
            .await;
        let purged: PurgeResponse = Self::read(res).await?;
        Ok(purged.deleted)
    }
}

#[async_trait]
impl RoleDirectory for HttpBackend {
    async fn list_active_participants(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Participant>, DirectoryError> {
        let res = self
            .http
            .get(self.url(session_id, "participants"))
            .send()
            .await;
        let participants: Vec<Participant> = Self::read(res).await?;
        Ok(participants.into_iter().filter(|p| p.active).collect())
    }

    /// No change feed over plain HTTP; sessions fall back to periodic refresh.
    fn subscribe(&self, _session_id: &SessionId) -> watch::Receiver<u64> {
        let (_, rx) = watch::channel(0);
        rx
    }
}
