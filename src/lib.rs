//! Media preview session manager for the MediaServer operator console
//!
//! Opens a single inline playback session against one of two live transport
//! backends — HTTP-progressive FLV demuxed client-side, or WebRTC egress
//! negotiated via WHEP — and guarantees clean hand-off between sessions and
//! backends.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  Console UI (tables, preview surface)                │
//! │  ↓ open(descriptor) / close()                        │
//! │  SessionController                                   │
//! │  ├─ PlaybackResolver (console REST API)              │
//! │  ├─ FlvBackend  (progressive GET → FlvDemuxer)       │
//! │  ├─ WhepBackend (PeerEndpoint + signaling POST)      │
//! │  └─ SinkBinding (generation-gated sink access)       │
//! │     ↓                                                │
//! │  MediaSink (the single rendering target)             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! At most one session is active at a time; `open` tears the previous one
//! down to completion before acquiring anything new. Asynchronous
//! continuations (resolver responses, ICE gathering, the signaling POST)
//! carry the generation they were started under and discard themselves
//! silently once superseded.
//!
//! # Example
//!
//! ```no_run
//! use media_preview::{
//!     ConsoleApi, HttpResolver, MediaFrame, MediaSink, PreviewConfig, SessionController,
//!     SourceDescriptor,
//! };
//! use std::sync::Arc;
//!
//! struct VideoSurface;
//! impl MediaSink for VideoSurface {
//!     fn render(&self, _frame: MediaFrame) { /* hand to the decoder */ }
//!     fn clear(&self) { /* blank the surface */ }
//! }
//!
//! # async fn example() -> media_preview::Result<()> {
//! let api = ConsoleApi::new("http://127.0.0.1:8080/api", reqwest::Client::new());
//! let controller = SessionController::new(
//!     PreviewConfig::default(),
//!     Arc::new(VideoSurface),
//!     Arc::new(HttpResolver::new(api)),
//! )?;
//!
//! controller
//!     .open(SourceDescriptor::Device { device_id: "cam1".to_string() })
//!     .await?;
//! controller.close().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod backend;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod resolver;
pub mod session;
pub mod sink;

pub use api::{ConsoleApi, PlayUrls};
pub use backend::{BackendFactory, BackendKind, FlvBackend, PreviewBackend, WhepBackend};
pub use config::{FlvAudioCodec, FlvVideoCodec, PreviewConfig};
pub use descriptor::SourceDescriptor;
pub use error::{Error, Result};
pub use resolver::{HttpResolver, PlaybackResolver, ResolvedSource};
pub use session::{SessionController, SessionState};
pub use sink::{FrameKind, MediaFrame, MediaSink, SinkBinding};
