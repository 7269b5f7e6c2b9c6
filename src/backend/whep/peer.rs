//! Peer connection seam for WHEP negotiation
//!
//! [`PeerEndpoint`] abstracts the handful of peer operations the WHEP
//! exchange needs, so negotiation ordering can be tested against a recording
//! mock. [`RtcPeerEndpoint`] is the production implementation over webrtc-rs.

use crate::config::PreviewConfig;
use crate::sink::{FrameKind, MediaFrame, SinkBinding};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::track::track_remote::TrackRemote;

/// The peer operations the WHEP exchange drives, in the order it drives them
#[async_trait]
pub trait PeerEndpoint: Send + Sync {
    /// Add one recvonly video and one recvonly audio media line. No send
    /// capability is offered; this is a pure egress client.
    async fn add_recv_transceivers(&self) -> Result<()>;

    /// Register the inbound-track callback. May fire any time after the
    /// offer is posted; all sink writes go through the generation-gated
    /// binding.
    fn on_track(&self, binding: SinkBinding);

    /// Create the local offer SDP
    async fn create_offer(&self) -> Result<String>;

    /// Apply the offer locally
    async fn set_local_description(&self, offer_sdp: String) -> Result<()>;

    /// Wait until ICE candidate gathering for the local description is
    /// complete. Must short-circuit if gathering already finished and
    /// resolve exactly once.
    async fn wait_ice_gathering_complete(&self);

    /// The complete (candidate-bearing) local description, if set
    async fn local_description(&self) -> Option<String>;

    /// Apply the remote answer
    async fn set_remote_description(&self, answer_sdp: String) -> Result<()>;

    /// Close the connection, terminating ICE and media delivery
    async fn close(&self);
}

/// Production endpoint over a webrtc-rs `RTCPeerConnection`
pub struct RtcPeerEndpoint {
    connection_id: String,
    pc: Arc<RTCPeerConnection>,
}

impl RtcPeerEndpoint {
    /// Build the peer connection the standard way: default codecs, default
    /// interceptors, configured STUN servers.
    pub async fn new(config: &PreviewConfig) -> Result<Self> {
        let connection_id = uuid::Uuid::new_v4().to_string();

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::NegotiationFailed(format!("Failed to register codecs: {e}")))?;

        let interceptor_registry = register_default_interceptors(Default::default(), &mut media_engine)
            .map_err(|e| {
                Error::NegotiationFailed(format!("Failed to register interceptors: {e}"))
            })?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        let ice_servers: Vec<RTCIceServer> = config
            .stun_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .collect();

        let pc = Arc::new(
            api.new_peer_connection(RTCConfiguration {
                ice_servers,
                ..Default::default()
            })
            .await
            .map_err(|e| {
                Error::NegotiationFailed(format!("Failed to create peer connection: {e}"))
            })?,
        );

        debug!(connection_id, "created egress peer connection");

        Ok(Self { connection_id, pc })
    }

    fn recvonly_init() -> RTCRtpTransceiverInit {
        RTCRtpTransceiverInit {
            direction: RTCRtpTransceiverDirection::Recvonly,
            send_encodings: vec![],
        }
    }
}

#[async_trait]
impl PeerEndpoint for RtcPeerEndpoint {
    async fn add_recv_transceivers(&self) -> Result<()> {
        self.pc
            .add_transceiver_from_kind(RTPCodecType::Video, Some(Self::recvonly_init()))
            .await
            .map_err(|e| {
                Error::NegotiationFailed(format!("Failed to add video transceiver: {e}"))
            })?;
        self.pc
            .add_transceiver_from_kind(RTPCodecType::Audio, Some(Self::recvonly_init()))
            .await
            .map_err(|e| {
                Error::NegotiationFailed(format!("Failed to add audio transceiver: {e}"))
            })?;
        Ok(())
    }

    fn on_track(&self, binding: SinkBinding) {
        let connection_id = self.connection_id.clone();
        self.pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let binding = binding.clone();
            let connection_id = connection_id.clone();
            Box::pin(async move {
                debug!(
                    connection_id,
                    kind = %track.kind(),
                    ssrc = track.ssrc(),
                    "remote track arrived"
                );
                pump_remote_track(track, binding).await;
            })
        }));
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| Error::NegotiationFailed(format!("Failed to create offer: {e}")))?;
        Ok(offer.sdp)
    }

    async fn set_local_description(&self, offer_sdp: String) -> Result<()> {
        let offer = RTCSessionDescription::offer(offer_sdp)
            .map_err(|e| Error::NegotiationFailed(format!("Failed to parse offer: {e}")))?;
        self.pc
            .set_local_description(offer)
            .await
            .map_err(|e| Error::NegotiationFailed(format!("Failed to set local description: {e}")))
    }

    async fn wait_ice_gathering_complete(&self) {
        // The promise resolves immediately when gathering already completed,
        // and at most once otherwise.
        let mut gather_complete = self.pc.gathering_complete_promise().await;
        let _ = gather_complete.recv().await;
    }

    async fn local_description(&self) -> Option<String> {
        self.pc.local_description().await.map(|d| d.sdp)
    }

    async fn set_remote_description(&self, answer_sdp: String) -> Result<()> {
        let answer = RTCSessionDescription::answer(answer_sdp)
            .map_err(|e| Error::NegotiationFailed(format!("Failed to parse answer: {e}")))?;
        self.pc
            .set_remote_description(answer)
            .await
            .map_err(|e| Error::NegotiationFailed(format!("Failed to set remote description: {e}")))
    }

    async fn close(&self) {
        if let Err(e) = self.pc.close().await {
            warn!(connection_id = self.connection_id, error = %e, "peer close reported an error");
        }
    }
}

/// Forward RTP payloads from a remote track through the binding until the
/// track ends or the binding's generation is retired.
async fn pump_remote_track(track: Arc<TrackRemote>, binding: SinkBinding) {
    let kind = match track.kind() {
        RTPCodecType::Audio => FrameKind::Audio,
        _ => FrameKind::Video,
    };
    loop {
        if !binding.is_live() {
            debug!(generation = binding.generation(), "binding superseded, track pump exiting");
            return;
        }
        match track.read_rtp().await {
            Ok((packet, _attributes)) => {
                let delivered = binding.render(MediaFrame {
                    kind,
                    timestamp: packet.header.timestamp,
                    keyframe: false,
                    payload: packet.payload,
                });
                if !delivered {
                    return;
                }
            }
            Err(_) => {
                debug!("remote track ended");
                return;
            }
        }
    }
}
