//! Playback URL resolution
//!
//! The resolver is the controller's external collaborator: it maps a
//! [`SourceDescriptor`] to either a progressive-delivery URL or a WHEP
//! signaling endpoint. Which of the two fields comes back populated selects
//! the backend.

use crate::api::ConsoleApi;
use crate::backend::BackendKind;
use crate::{Error, Result, SourceDescriptor};
use async_trait::async_trait;

/// Outcome of a successful resolution, exactly one field populated
#[derive(Debug, Clone, Default)]
pub struct ResolvedSource {
    /// Continuously-muxed FLV over a plain HTTP response
    pub progressive_url: Option<String>,

    /// WHEP signaling endpoint (POST offer, receive answer)
    pub signaling_url: Option<String>,
}

impl ResolvedSource {
    /// Select the backend from whichever URL field is populated.
    ///
    /// A progressive URL wins when both are present; absence of both is a
    /// resolution failure.
    pub fn backend(&self) -> Result<(BackendKind, &str)> {
        if let Some(url) = self.progressive_url.as_deref() {
            return Ok((BackendKind::Flv, url));
        }
        if let Some(url) = self.signaling_url.as_deref() {
            return Ok((BackendKind::Whep, url));
        }
        Err(Error::ResolutionFailed(
            "resolver returned no playable URL".to_string(),
        ))
    }
}

/// Maps a source descriptor to its playback URL(s)
#[async_trait]
pub trait PlaybackResolver: Send + Sync {
    async fn resolve(&self, descriptor: &SourceDescriptor) -> Result<ResolvedSource>;
}

/// Resolver backed by the console REST API
#[derive(Debug, Clone)]
pub struct HttpResolver {
    api: ConsoleApi,
}

impl HttpResolver {
    pub fn new(api: ConsoleApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PlaybackResolver for HttpResolver {
    async fn resolve(&self, descriptor: &SourceDescriptor) -> Result<ResolvedSource> {
        let urls = self.api.play_url(descriptor).await.map_err(|e| match e {
            Error::Api { code, msg } => {
                Error::ResolutionFailed(format!("API error {code}: {msg}"))
            }
            other => other,
        })?;
        Ok(ResolvedSource {
            progressive_url: urls.http_flv_url,
            signaling_url: urls.rtc_url,
        })
    }
}
