//! Incremental FLV container demuxer
//!
//! Parses the continuously growing FLV byte stream the progressive backend
//! receives over HTTP: a 9-byte file header followed by back-pointer-framed
//! tags (audio, video, script data). The demuxer is push-based: feed it
//! arbitrary network chunks, pull complete tags out.

use crate::{Error, Result};
use bytes::{Buf, Bytes, BytesMut};

/// FLV tag type field values
const TAG_TYPE_AUDIO: u8 = 8;
const TAG_TYPE_VIDEO: u8 = 9;
const TAG_TYPE_SCRIPT: u8 = 18;

/// FLV video codec id for AVC / H.264
pub const VIDEO_CODEC_H264: u8 = 7;
/// FLV video codec id for HEVC / H.265 (enhanced RTMP)
pub const VIDEO_CODEC_H265: u8 = 12;
/// FLV sound format for MP3
pub const AUDIO_FORMAT_MP3: u8 = 2;
/// FLV sound format for AAC
pub const AUDIO_FORMAT_AAC: u8 = 10;

/// Kind of a demuxed FLV tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlvTagType {
    Audio,
    Video,
    Script,
}

/// One complete FLV tag
#[derive(Debug, Clone)]
pub struct FlvTag {
    pub tag_type: FlvTagType,
    /// Extended 32-bit timestamp in milliseconds
    pub timestamp_ms: u32,
    pub payload: Bytes,
}

impl FlvTag {
    /// Video codec id from the first payload byte, if this is a video tag
    pub fn video_codec(&self) -> Option<u8> {
        if self.tag_type != FlvTagType::Video {
            return None;
        }
        self.payload.first().map(|b| b & 0x0f)
    }

    /// Sound format from the first payload byte, if this is an audio tag
    pub fn audio_format(&self) -> Option<u8> {
        if self.tag_type != FlvTagType::Audio {
            return None;
        }
        self.payload.first().map(|b| b >> 4)
    }

    /// True for video tags whose frame type marks a keyframe
    pub fn is_keyframe(&self) -> bool {
        self.tag_type == FlvTagType::Video
            && self.payload.first().map(|b| b >> 4) == Some(1)
    }
}

enum DemuxState {
    /// Waiting for the 9-byte file header (plus its declared padding)
    Header,
    /// Steady state: back pointer + tag header + payload
    Tags,
}

/// Push-based FLV demuxer
pub struct FlvDemuxer {
    buf: BytesMut,
    state: DemuxState,
}

impl FlvDemuxer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            state: DemuxState::Header,
        }
    }

    /// Append a network chunk to the parse buffer
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pull the next complete tag, or `None` when more bytes are needed.
    ///
    /// Tags of unknown type are skipped. A stream that does not start with
    /// the FLV signature fails with [`Error::Unsupported`].
    pub fn next_tag(&mut self) -> Result<Option<FlvTag>> {
        loop {
            match self.state {
                DemuxState::Header => {
                    if self.buf.len() < 9 {
                        return Ok(None);
                    }
                    if &self.buf[0..3] != b"FLV" {
                        return Err(Error::Unsupported(
                            "stream does not carry an FLV signature".to_string(),
                        ));
                    }
                    let data_offset =
                        u32::from_be_bytes([self.buf[5], self.buf[6], self.buf[7], self.buf[8]])
                            as usize;
                    if data_offset < 9 {
                        return Err(Error::Unsupported(format!(
                            "invalid FLV header data offset {data_offset}"
                        )));
                    }
                    if self.buf.len() < data_offset {
                        return Ok(None);
                    }
                    self.buf.advance(data_offset);
                    self.state = DemuxState::Tags;
                }
                DemuxState::Tags => {
                    // 4-byte back pointer + 11-byte tag header
                    if self.buf.len() < 15 {
                        return Ok(None);
                    }
                    let tag_type_byte = self.buf[4] & 0x1f;
                    let data_size = u32::from_be_bytes([0, self.buf[5], self.buf[6], self.buf[7]])
                        as usize;
                    let timestamp_ms = u32::from_be_bytes([
                        self.buf[11],
                        self.buf[8],
                        self.buf[9],
                        self.buf[10],
                    ]);
                    if self.buf.len() < 15 + data_size {
                        return Ok(None);
                    }
                    self.buf.advance(15);
                    let payload = self.buf.split_to(data_size).freeze();

                    let tag_type = match tag_type_byte {
                        TAG_TYPE_AUDIO => FlvTagType::Audio,
                        TAG_TYPE_VIDEO => FlvTagType::Video,
                        TAG_TYPE_SCRIPT => FlvTagType::Script,
                        _ => continue,
                    };
                    return Ok(Some(FlvTag {
                        tag_type,
                        timestamp_ms,
                        payload,
                    }));
                }
            }
        }
    }
}

impl Default for FlvDemuxer {
    fn default() -> Self {
        Self::new()
    }
}
