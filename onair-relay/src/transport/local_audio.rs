use anyhow::Result;
use bytes::Bytes;
use onair_core::ParticipantId;
use std::sync::Arc;
use std::time::Duration;
use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// The speaker's microphone track. One instance is shared by every outbound
/// link, so a sample written once reaches all listeners.
#[derive(Clone)]
pub struct LocalAudioTrack {
    track: Arc<TrackLocalStaticSample>,
}

impl LocalAudioTrack {
    pub fn new(stream_id: impl Into<String>) -> Self {
        let track = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48_000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_owned(),
            stream_id.into(),
        );

        Self {
            track: Arc::new(track),
        }
    }

    /// Write one encoded Opus frame covering `duration` of audio.
    pub async fn write_sample(&self, data: Bytes, duration: Duration) -> Result<()> {
        self.track
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    pub(crate) fn as_track_local(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.track.clone()
    }
}

/// A chunk of audio received from a speaker.
#[derive(Debug, Clone)]
pub struct RemoteAudioPacket {
    pub from: ParticipantId,
    pub payload: Bytes,
}
