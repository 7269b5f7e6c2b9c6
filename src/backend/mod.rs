//! Playback backend adapters
//!
//! Two mutually-exclusive transports serve a preview session: progressive
//! FLV over HTTP and WebRTC egress negotiated via WHEP. Both sit behind the
//! same capability interface so the controller can start and tear them down
//! polymorphically.

pub mod flv;
pub mod whep;

use crate::config::PreviewConfig;
use crate::sink::SinkBinding;
use crate::Result;
use async_trait::async_trait;

pub use flv::FlvBackend;
pub use whep::WhepBackend;

/// Which transport backend serves a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// HTTP-progressive FLV, demuxed client-side
    Flv,
    /// WebRTC egress via the WHEP signaling exchange
    Whep,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Flv => f.write_str("flv"),
            BackendKind::Whep => f.write_str("whep"),
        }
    }
}

/// Shared capability interface over the two backend adapters.
///
/// `start` covers both the FLV adapter's `start(url, sink)` and the WHEP
/// adapter's `negotiate(signaling_url, sink)`; `stop` is the polymorphic
/// teardown the controller composes into `close()`. `stop` must be
/// idempotent and safe after a failed `start`.
#[async_trait]
pub trait PreviewBackend: Send + Sync {
    /// Acquire the sink and bring playback up for `url`.
    ///
    /// Resolves once the backend reports ready; media may start flowing to
    /// the sink asynchronously afterwards.
    async fn start(&mut self, url: &str, binding: SinkBinding) -> Result<()>;

    /// Release all backend resources and detach from the sink
    async fn stop(&mut self);

    fn kind(&self) -> BackendKind;
}

/// Builds backend adapters for the controller; a seam so tests can
/// substitute recording fakes.
pub trait BackendFactory: Send + Sync {
    fn build(&self, kind: BackendKind) -> Box<dyn PreviewBackend>;
}

/// Production factory: real FLV and WHEP adapters sharing one HTTP client
pub struct DefaultBackendFactory {
    config: PreviewConfig,
    http: reqwest::Client,
}

impl DefaultBackendFactory {
    pub fn new(config: PreviewConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }
}

impl BackendFactory for DefaultBackendFactory {
    fn build(&self, kind: BackendKind) -> Box<dyn PreviewBackend> {
        match kind {
            BackendKind::Flv => Box::new(FlvBackend::new(self.config.clone(), self.http.clone())),
            BackendKind::Whep => {
                Box::new(WhepBackend::new(self.config.clone(), self.http.clone()))
            }
        }
    }
}
