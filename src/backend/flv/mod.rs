//! HTTP-progressive FLV backend adapter
//!
//! Owns one demuxer/pump bound to the output sink. `start` verifies the
//! environment can decode the format, then issues continuous live playback
//! with a small target latency so the preview tracks the live edge instead
//! of buffering.

pub mod demux;

use crate::backend::{BackendKind, PreviewBackend};
use crate::config::{FlvAudioCodec, FlvVideoCodec, PreviewConfig};
use crate::sink::{FrameKind, MediaFrame, SinkBinding};
use crate::{Error, Result};
use async_trait::async_trait;
use demux::{FlvDemuxer, FlvTag, FlvTagType};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Progressive FLV playback adapter
pub struct FlvBackend {
    config: PreviewConfig,
    http: reqwest::Client,
    pump: Option<JoinHandle<()>>,
}

impl FlvBackend {
    pub fn new(config: PreviewConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            pump: None,
        }
    }

    /// Capability check: can this environment decode any FLV payload at all?
    fn environment_supported(config: &PreviewConfig) -> bool {
        !config.flv_video_codecs.is_empty() || !config.flv_audio_codecs.is_empty()
    }
}

#[async_trait]
impl PreviewBackend for FlvBackend {
    async fn start(&mut self, url: &str, binding: SinkBinding) -> Result<()> {
        if !Self::environment_supported(&self.config) {
            return Err(Error::Unsupported(
                "no FLV codec is decodable in this environment".to_string(),
            ));
        }

        info!(url, generation = binding.generation(), "starting FLV playback");

        let http = self.http.clone();
        let url = url.to_string();
        let latency_ms = self.config.live_sync_target_latency_ms;
        let video_codecs = self.config.flv_video_codecs.clone();
        let audio_codecs = self.config.flv_audio_codecs.clone();

        // Fire-and-forget: no round trip is awaited beyond the capability
        // check above. Transport failures surface through the pump's logs
        // and the stream simply ends.
        self.pump = Some(tokio::spawn(async move {
            if let Err(e) = pump_progressive(
                http,
                &url,
                binding.clone(),
                latency_ms,
                &video_codecs,
                &audio_codecs,
            )
            .await
            {
                if binding.is_live() {
                    warn!(url, error = %e, "FLV pump terminated");
                }
            }
        }));

        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            debug!("FLV pump released");
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Flv
    }
}

/// Drive the progressive GET: demux arriving chunks and render their tags
/// through the generation-gated binding until the stream ends or the binding
/// is superseded.
async fn pump_progressive(
    http: reqwest::Client,
    url: &str,
    binding: SinkBinding,
    latency_ms: u64,
    video_codecs: &[FlvVideoCodec],
    audio_codecs: &[FlvAudioCodec],
) -> Result<()> {
    let response = http.get(url).send().await?.error_for_status()?;
    let mut body = response.bytes_stream();
    let mut demuxer = FlvDemuxer::new();

    while let Some(chunk) = body.next().await {
        if !binding.is_live() {
            debug!(generation = binding.generation(), "binding superseded, FLV pump exiting");
            return Ok(());
        }
        demuxer.feed(&chunk?);

        let mut frames = Vec::new();
        while let Some(tag) = demuxer.next_tag()? {
            if let Some(frame) = tag_to_frame(tag, video_codecs, audio_codecs)? {
                frames.push(frame);
            }
        }
        for frame in trim_to_live_edge(frames, latency_ms) {
            if !binding.render(frame) {
                return Ok(());
            }
        }
    }

    debug!(url, "progressive stream ended");
    Ok(())
}

/// Map a demuxed tag to a sink frame, enforcing the codec allowance.
///
/// Script tags carry metadata only and are dropped.
fn tag_to_frame(
    tag: FlvTag,
    video_codecs: &[FlvVideoCodec],
    audio_codecs: &[FlvAudioCodec],
) -> Result<Option<MediaFrame>> {
    match tag.tag_type {
        FlvTagType::Script => Ok(None),
        FlvTagType::Video => {
            let codec = tag.video_codec();
            let allowed = match codec {
                Some(demux::VIDEO_CODEC_H264) => video_codecs.contains(&FlvVideoCodec::H264),
                Some(demux::VIDEO_CODEC_H265) => video_codecs.contains(&FlvVideoCodec::H265),
                _ => false,
            };
            if !allowed {
                return Err(Error::Unsupported(format!(
                    "FLV video codec id {codec:?} is not decodable"
                )));
            }
            Ok(Some(MediaFrame {
                kind: FrameKind::Video,
                timestamp: tag.timestamp_ms,
                keyframe: tag.is_keyframe(),
                payload: tag.payload,
            }))
        }
        FlvTagType::Audio => {
            let format = tag.audio_format();
            let allowed = match format {
                Some(demux::AUDIO_FORMAT_AAC) => audio_codecs.contains(&FlvAudioCodec::Aac),
                Some(demux::AUDIO_FORMAT_MP3) => audio_codecs.contains(&FlvAudioCodec::Mp3),
                _ => false,
            };
            if !allowed {
                return Err(Error::Unsupported(format!(
                    "FLV audio format {format:?} is not decodable"
                )));
            }
            Ok(Some(MediaFrame {
                kind: FrameKind::Audio,
                timestamp: tag.timestamp_ms,
                keyframe: false,
                payload: tag.payload,
            }))
        }
    }
}

/// Live-edge sync: when one network burst spans more media time than the
/// target latency (catch-up after a stall), skip forward to the last video
/// keyframe inside the target window instead of rendering the backlog.
fn trim_to_live_edge(frames: Vec<MediaFrame>, latency_ms: u64) -> Vec<MediaFrame> {
    let Some(last) = frames.last() else {
        return frames;
    };
    let Some(first) = frames.first() else {
        return frames;
    };
    let span = last.timestamp.saturating_sub(first.timestamp) as u64;
    if span <= latency_ms {
        return frames;
    }

    let edge = last.timestamp.saturating_sub(latency_ms as u32);
    let cut = frames
        .iter()
        .enumerate()
        .filter(|(_, f)| f.keyframe && f.timestamp >= edge)
        .map(|(i, _)| i)
        .last();

    match cut {
        Some(i) => {
            debug!(dropped = i, span_ms = span, "skipping to live edge");
            frames.into_iter().skip(i).collect()
        }
        // No keyframe inside the window: keep the backlog, a later burst
        // will carry one.
        None => frames,
    }
}
