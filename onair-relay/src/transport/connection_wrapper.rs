use crate::transport::{
    LocalAudioTrack, PeerTransport, RemoteAudioPacket, TransportConfig, TransportEvent,
    TransportFactory, TransportState,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use onair_core::{LinkDirection, LinkId, ParticipantId};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_remote::TrackRemote;

/// Builds one `RTCPeerConnection` per link.
#[derive(Clone)]
pub struct WebRtcTransportFactory {
    config: TransportConfig,
    local_audio: Option<LocalAudioTrack>,
    remote_audio: Option<broadcast::Sender<RemoteAudioPacket>>,
}

impl WebRtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            local_audio: None,
            remote_audio: None,
        }
    }

    /// Track sent on every outbound link.
    pub fn with_local_audio(mut self, track: LocalAudioTrack) -> Self {
        self.local_audio = Some(track);
        self
    }

    /// Where audio received on inbound links is forwarded.
    pub fn with_remote_audio_sink(mut self, sink: broadcast::Sender<RemoteAudioPacket>) -> Self {
        self.remote_audio = Some(sink);
        self
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create_link(
        &self,
        link_id: LinkId,
        remote: ParticipantId,
        direction: LinkDirection,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>> {
        let wrapper = ConnectionWrapper::new(
            link_id,
            remote,
            &self.config,
            events,
            self.remote_audio.clone(),
        )
        .await?;

        if direction == LinkDirection::Inbound {
            wrapper.receive_audio_only().await?;
        }

        Ok(Arc::new(wrapper.with_local_audio(self.local_audio.clone())))
    }
}

pub struct ConnectionWrapper {
    pub link_id: LinkId,
    pub remote: ParticipantId,
    pub peer_connection: Arc<RTCPeerConnection>,
    local_audio: Option<LocalAudioTrack>,
}

impl ConnectionWrapper {
    /// Create the peer connection and wire its callbacks into `event_tx`.
    pub async fn new(
        link_id: LinkId,
        remote: ParticipantId,
        config: &TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
        remote_audio: Option<broadcast::Sender<RemoteAudioPacket>>,
    ) -> Result<Self> {
        // 1. Codecs (Opus among the defaults)
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;

        // 2. Interceptors (NACK, RTCP reports)
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        // 3. API object
        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        // 4. ICE servers, STUN only
        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        // 5. PeerConnection
        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        // --- Callbacks ---
        // Each closure gets its own sender clone; they must be 'static.

        // A. Connection state, mapped onto the link's transport states
        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", link_id, s);
                    let state = match s {
                        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => {
                            TransportState::New
                        }
                        RTCPeerConnectionState::Connecting => TransportState::Connecting,
                        RTCPeerConnectionState::Connected => TransportState::Connected,
                        RTCPeerConnectionState::Disconnected => TransportState::Disconnected,
                        RTCPeerConnectionState::Failed => TransportState::Failed,
                        RTCPeerConnectionState::Closed => TransportState::Closed,
                    };
                    let _ = tx.send(TransportEvent::StateChanged(link_id, state)).await;
                })
            },
        ));

        // B. Trickle ICE: local candidates go out as RTCIceCandidateInit JSON
        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(json_candidate) = candidate.to_json() else {
                    return;
                };
                let Ok(str_candidate) = serde_json::to_string(&json_candidate) else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(link_id, str_candidate))
                    .await;
            })
        }));

        // C. Remote audio: announce on the first packet, then forward to the sink
        let track_tx = event_tx;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let sink = remote_audio.clone();

                Box::pin(async move {
                    if track.kind() != RTPCodecType::Audio {
                        return;
                    }
                    info!("Audio track from {} on {}", remote, link_id);

                    tokio::spawn(async move {
                        let mut announced = false;
                        while let Ok((packet, _)) = track.read_rtp().await {
                            if !announced {
                                announced = true;
                                let _ = tx.send(TransportEvent::TrackReceived(link_id)).await;
                            }
                            if let Some(sink) = &sink {
                                let _ = sink.send(RemoteAudioPacket {
                                    from: remote,
                                    payload: packet.payload,
                                });
                            }
                        }
                        debug!("Audio track from {} ended", remote);
                    });
                })
            },
        ));

        Ok(Self {
            link_id,
            remote,
            peer_connection,
            local_audio: None,
        })
    }

    /// Listeners only receive, so the offer's audio section is answered
    /// `recvonly`.
    pub async fn receive_audio_only(&self) -> Result<()> {
        self.peer_connection
            .add_transceiver_from_kind(
                RTPCodecType::Audio,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: Vec::new(),
                }),
            )
            .await
            .context("Failed to add audio receiver")?;
        Ok(())
    }

    fn with_local_audio(mut self, track: Option<LocalAudioTrack>) -> Self {
        self.local_audio = track;
        self
    }

    async fn apply_local(&self, description: RTCSessionDescription) -> Result<String> {
        self.peer_connection
            .set_local_description(description.clone())
            .await?;
        serde_json::to_string(&description).context("Failed to encode session description")
    }
}

#[async_trait]
impl PeerTransport for ConnectionWrapper {
    async fn attach_local_audio(&self) -> Result<()> {
        let Some(track) = &self.local_audio else {
            bail!("no local audio track configured");
        };

        let sender = self
            .peer_connection
            .add_track(track.as_track_local())
            .await?;

        // RTCP has to be drained for the interceptors to work.
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.apply_local(offer).await
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.apply_local(answer).await
    }

    async fn set_remote_description(&self, payload: &str) -> Result<()> {
        let desc: RTCSessionDescription =
            serde_json::from_str(payload).context("Failed to parse session description JSON")?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, payload: &str) -> Result<()> {
        let candidate: RTCIceCandidateInit =
            serde_json::from_str(payload).context("Failed to parse ICE candidate JSON")?;
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
