//! Output sink shared across sessions
//!
//! The sink is the single rendering target. At most one backend may hold a
//! live write to it; ownership is expressed through [`SinkBinding`], a
//! generation-gated handle the controller hands out between acquisition and
//! release. A binding from a superseded generation silently drops writes, so
//! a stale continuation can never paint over the current session.

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Kind of media payload flowing to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Audio,
    Video,
}

/// One demuxed (FLV) or depacketized (WHEP) media frame
#[derive(Debug, Clone)]
pub struct MediaFrame {
    pub kind: FrameKind,
    /// Presentation timestamp. Milliseconds for FLV tags, the raw RTP
    /// timestamp for WHEP payloads.
    pub timestamp: u32,
    /// True when the frame is a random access point (always false for RTP
    /// payloads, where the depacketizer does not inspect the bitstream)
    pub keyframe: bool,
    pub payload: Bytes,
}

/// The rendering target (video surface) shared across all sessions
pub trait MediaSink: Send + Sync {
    /// Deliver one media frame for rendering
    fn render(&self, frame: MediaFrame);

    /// Detach whatever source is currently bound and blank the surface
    fn clear(&self);
}

/// Generation-gated write handle to the sink.
///
/// Carries the generation it was issued for and the controller's live
/// counter; every write re-checks the two. Backends must not retain a binding
/// past `stop()`, but even a leaked clone goes inert the moment its
/// generation is retired.
#[derive(Clone)]
pub struct SinkBinding {
    sink: Arc<dyn MediaSink>,
    generation: u64,
    live: Arc<AtomicU64>,
}

impl SinkBinding {
    /// Issue a binding for `generation` gated on the controller's `live`
    /// counter. Normally only the session controller constructs these.
    pub fn new(sink: Arc<dyn MediaSink>, generation: u64, live: Arc<AtomicU64>) -> Self {
        Self {
            sink,
            generation,
            live,
        }
    }

    /// The generation this binding was issued for
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this binding still owns write access to the sink
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire) == self.generation
    }

    /// Render a frame if this binding is still live.
    ///
    /// Returns false when the write was dropped as stale.
    pub fn render(&self, frame: MediaFrame) -> bool {
        if !self.is_live() {
            return false;
        }
        self.sink.render(frame);
        true
    }
}

impl std::fmt::Debug for SinkBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkBinding")
            .field("generation", &self.generation)
            .field("live", &self.live.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingSink {
        frames: Mutex<Vec<MediaFrame>>,
        cleared: AtomicU64,
    }

    impl MediaSink for CountingSink {
        fn render(&self, frame: MediaFrame) {
            self.frames.lock().unwrap().push(frame);
        }

        fn clear(&self) {
            self.cleared.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn frame() -> MediaFrame {
        MediaFrame {
            kind: FrameKind::Video,
            timestamp: 0,
            keyframe: true,
            payload: Bytes::from_static(&[0x17, 0x00]),
        }
    }

    #[test]
    fn test_live_binding_writes() {
        let sink = Arc::new(CountingSink::default());
        let live = Arc::new(AtomicU64::new(1));
        let binding = SinkBinding::new(sink.clone(), 1, live);

        assert!(binding.is_live());
        assert!(binding.render(frame()));
        assert_eq!(sink.frames.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_retired_binding_drops_writes() {
        let sink = Arc::new(CountingSink::default());
        let live = Arc::new(AtomicU64::new(1));
        let binding = SinkBinding::new(sink.clone(), 1, live.clone());

        // Supersede generation 1
        live.store(2, Ordering::Release);

        assert!(!binding.is_live());
        assert!(!binding.render(frame()));
        assert!(sink.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cloned_binding_shares_gate() {
        let sink = Arc::new(CountingSink::default());
        let live = Arc::new(AtomicU64::new(3));
        let binding = SinkBinding::new(sink.clone(), 3, live.clone());
        let leaked = binding.clone();

        live.store(0, Ordering::Release);
        assert!(!leaked.render(frame()));
    }
}
