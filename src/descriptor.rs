//! Playback source descriptors

/// Identifies exactly one playback request.
///
/// A descriptor is immutable once constructed; the resolver maps it to either
/// a progressive-delivery URL or a WHEP signaling endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// Live preview of a registered device
    Device { device_id: String },

    /// Playback of a recorded file known to the catalog
    File { file_id: String },

    /// Preview of an active WebRTC ingest session
    WebrtcSession { session_id: String },

    /// Preview of a published RTMP stream
    RtmpStream { stream: String },

    /// GB28181 record playback over a time range
    GbRecord {
        device_id: String,
        start_time: String,
        end_time: String,
        record_type: String,
    },
}

impl SourceDescriptor {
    /// Short human-readable label for logging
    pub fn label(&self) -> String {
        match self {
            SourceDescriptor::Device { device_id } => format!("device:{device_id}"),
            SourceDescriptor::File { file_id } => format!("file:{file_id}"),
            SourceDescriptor::WebrtcSession { session_id } => format!("rtc-session:{session_id}"),
            SourceDescriptor::RtmpStream { stream } => format!("rtmp:{stream}"),
            SourceDescriptor::GbRecord {
                device_id,
                start_time,
                end_time,
                ..
            } => format!("gb-record:{device_id}:{start_time}-{end_time}"),
        }
    }
}

impl std::fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}
