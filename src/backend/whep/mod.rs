//! WHEP backend adapter
//!
//! Drives the WebRTC-HTTP Egress Protocol exchange: offer out over a plain
//! HTTP POST, answer back in the response body. The peer operations run
//! through the [`PeerEndpoint`] seam; cancellation mid-negotiation is the
//! controller's generation check, not an aborted request.

pub mod peer;

use crate::backend::{BackendKind, PreviewBackend};
use crate::config::PreviewConfig;
use crate::sink::SinkBinding;
use crate::{Error, Result};
use async_trait::async_trait;
use peer::{PeerEndpoint, RtcPeerEndpoint};
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use tracing::{debug, info};

/// WebRTC egress playback adapter
pub struct WhepBackend {
    config: PreviewConfig,
    http: reqwest::Client,
    peer: Option<Arc<dyn PeerEndpoint>>,
    /// Injected endpoint for tests; production builds one per negotiation
    endpoint_override: Option<Arc<dyn PeerEndpoint>>,
}

impl WhepBackend {
    pub fn new(config: PreviewConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            peer: None,
            endpoint_override: None,
        }
    }

    /// Use a pre-built peer endpoint instead of constructing one.
    pub fn with_endpoint(
        config: PreviewConfig,
        http: reqwest::Client,
        endpoint: Arc<dyn PeerEndpoint>,
    ) -> Self {
        Self {
            config,
            http,
            peer: None,
            endpoint_override: Some(endpoint),
        }
    }

    /// The WHEP negotiation algorithm, steps in strict order.
    async fn negotiate(&mut self, signaling_url: &str, binding: SinkBinding) -> Result<()> {
        let peer: Arc<dyn PeerEndpoint> = match self.endpoint_override.clone() {
            Some(endpoint) => endpoint,
            None => Arc::new(RtcPeerEndpoint::new(&self.config).await?),
        };
        // Held from here on so a failure at any later step still releases
        // the connection through stop().
        self.peer = Some(peer.clone());

        // 1. recvonly media lines, 2. inbound-track delivery point
        peer.add_recv_transceivers().await?;
        peer.on_track(binding.clone());

        // 3. local offer
        let offer = peer.create_offer().await?;
        peer.set_local_description(offer).await?;

        // 4. suspension point: ICE gathering completion
        peer.wait_ice_gathering_complete().await;

        let local_sdp = peer.local_description().await.ok_or_else(|| {
            Error::NegotiationFailed("no local description after ICE gathering".to_string())
        })?;

        // 5-6. POST the complete offer; non-2xx is a hard failure
        debug!(signaling_url, "posting WHEP offer");
        let response = self
            .http
            .post(signaling_url)
            .header(CONTENT_TYPE, "application/sdp")
            .body(local_sdp)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SignalingRejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        // 7-8. apply the answer; Ready does not wait for media arrival
        let answer_sdp = response.text().await?;
        peer.set_remote_description(answer_sdp).await?;

        info!(signaling_url, generation = binding.generation(), "WHEP negotiation complete");
        Ok(())
    }
}

#[async_trait]
impl PreviewBackend for WhepBackend {
    async fn start(&mut self, url: &str, binding: SinkBinding) -> Result<()> {
        self.negotiate(url, binding).await
    }

    async fn stop(&mut self) {
        if let Some(peer) = self.peer.take() {
            peer.close().await;
            debug!("peer connection released");
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Whep
    }
}
