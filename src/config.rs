//! Configuration types for the preview session manager

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for the preview session manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// STUN server URLs handed to the peer connection (default: empty,
    /// matching the console's browser-default ICE behavior)
    pub stun_servers: Vec<String>,

    /// Optional upper bound on URL resolution and WHEP negotiation, in
    /// milliseconds. `None` (default) lets the transport's own timeout, if
    /// any, surface the failure.
    pub negotiation_timeout_ms: Option<u64>,

    /// Target live-edge latency for progressive FLV playback in milliseconds
    /// (default: 500ms). When the demuxed backlog spans more than this the
    /// pump skips forward to the next keyframe.
    pub live_sync_target_latency_ms: u64,

    /// FLV video codec IDs the execution environment can decode
    pub flv_video_codecs: Vec<FlvVideoCodec>,

    /// FLV audio codec IDs the execution environment can decode
    pub flv_audio_codecs: Vec<FlvAudioCodec>,
}

/// FLV video codec identifiers (FLV tag codec id field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlvVideoCodec {
    /// AVC / H.264 (FLV codec id 7)
    H264,
    /// HEVC / H.265 (FLV codec id 12, enhanced RTMP)
    H265,
}

/// FLV audio codec identifiers (FLV tag sound format field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlvAudioCodec {
    /// MP3 (sound format 2)
    Mp3,
    /// AAC (sound format 10)
    Aac,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            stun_servers: Vec::new(),
            negotiation_timeout_ms: None,
            live_sync_target_latency_ms: 500,
            flv_video_codecs: vec![FlvVideoCodec::H264, FlvVideoCodec::H265],
            flv_audio_codecs: vec![FlvAudioCodec::Aac, FlvAudioCodec::Mp3],
        }
    }
}

impl PreviewConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ms) = self.negotiation_timeout_ms {
            if ms == 0 {
                return Err("negotiation_timeout_ms must be greater than 0".to_string());
            }
        }
        if self.live_sync_target_latency_ms == 0 {
            return Err("live_sync_target_latency_ms must be greater than 0".to_string());
        }
        for url in &self.stun_servers {
            if !url.starts_with("stun:") && !url.starts_with("stuns:") {
                return Err(format!("invalid STUN server URL: {url}"));
            }
        }
        Ok(())
    }

    /// Negotiation timeout as a `Duration`, if configured
    pub fn negotiation_timeout(&self) -> Option<Duration> {
        self.negotiation_timeout_ms.map(Duration::from_millis)
    }

    /// Live-edge target latency as a `Duration`
    pub fn live_sync_target_latency(&self) -> Duration {
        Duration::from_millis(self.live_sync_target_latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PreviewConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.negotiation_timeout().is_none());
        assert_eq!(config.live_sync_target_latency(), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = PreviewConfig {
            negotiation_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_stun_url_rejected() {
        let config = PreviewConfig {
            stun_servers: vec!["turn:relay.example.com".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PreviewConfig {
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
