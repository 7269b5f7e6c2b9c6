//! Session controller
//!
//! The only component the surrounding console code talks to. Accepts
//! `open(descriptor)` and `close()`, selects a backend from the resolver's
//! answer, and serializes backend switches: the previous session is torn
//! down to completion before any new resource is acquired, and the output
//! sink is never writable by two backends at once.
//!
//! Cancellation is generation-based. Every `open` claims the next
//! generation; the `live` counter holds the generation that currently owns
//! the sink (0 when none does). Continuations resuming from a suspension
//! point re-check their captured generation and silently discard themselves
//! on mismatch — a superseded attempt releases whatever it acquired and
//! reports nothing.

use crate::backend::{BackendFactory, BackendKind, DefaultBackendFactory, PreviewBackend};
use crate::config::PreviewConfig;
use crate::resolver::PlaybackResolver;
use crate::session::SessionState;
use crate::sink::{MediaSink, SinkBinding};
use crate::{Error, Result, SourceDescriptor};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

struct SessionRecord {
    generation: u64,
    descriptor: SourceDescriptor,
    backend_kind: Option<BackendKind>,
    state: SessionState,
    backend: Option<Box<dyn PreviewBackend>>,
}

struct Inner {
    next_generation: u64,
    session: Option<SessionRecord>,
}

/// Controller owning the single active preview session
pub struct SessionController {
    config: PreviewConfig,
    sink: Arc<dyn MediaSink>,
    resolver: Arc<dyn PlaybackResolver>,
    factory: Arc<dyn BackendFactory>,
    /// Generation currently holding sink write access; 0 when none
    live: Arc<AtomicU64>,
    /// Never held across an await
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("config", &self.config)
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller with the production backend factory
    pub fn new(
        config: PreviewConfig,
        sink: Arc<dyn MediaSink>,
        resolver: Arc<dyn PlaybackResolver>,
    ) -> Result<Self> {
        let factory = Arc::new(DefaultBackendFactory::new(
            config.clone(),
            reqwest::Client::new(),
        ));
        Self::with_factory(config, sink, resolver, factory)
    }

    /// Create a controller with a custom backend factory
    pub fn with_factory(
        config: PreviewConfig,
        sink: Arc<dyn MediaSink>,
        resolver: Arc<dyn PlaybackResolver>,
        factory: Arc<dyn BackendFactory>,
    ) -> Result<Self> {
        config.validate().map_err(Error::InvalidConfig)?;
        Ok(Self {
            config,
            sink,
            resolver,
            factory,
            live: Arc::new(AtomicU64::new(0)),
            inner: Mutex::new(Inner {
                next_generation: 0,
                session: None,
            }),
        })
    }

    /// State of the current session, `Idle` before the first `open`
    pub fn state(&self) -> SessionState {
        self.inner
            .lock()
            .unwrap()
            .session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(SessionState::Idle)
    }

    /// Descriptor of the current (possibly closed) session
    pub fn current_descriptor(&self) -> Option<SourceDescriptor> {
        self.inner
            .lock()
            .unwrap()
            .session
            .as_ref()
            .map(|s| s.descriptor.clone())
    }

    /// Backend kind of the current session, once selected
    pub fn current_backend(&self) -> Option<BackendKind> {
        self.inner
            .lock()
            .unwrap()
            .session
            .as_ref()
            .and_then(|s| s.backend_kind)
    }

    /// Generation currently owning the sink, 0 when none
    pub fn live_generation(&self) -> u64 {
        self.live.load(Ordering::Acquire)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.live.load(Ordering::Acquire) == generation
    }

    /// Open a preview session for `descriptor`.
    ///
    /// Any active session is closed to completion first; the single-active-
    /// session invariant is enforced by teardown-before-acquire, never by
    /// queuing. Failures abort the new session, release partial resources,
    /// and are reported once through the returned error. A session
    /// superseded mid-flight by a later `open` or `close` reports nothing.
    pub async fn open(&self, descriptor: SourceDescriptor) -> Result<()> {
        self.close().await;

        let generation = {
            let mut inner = self.inner.lock().unwrap();
            inner.next_generation += 1;
            let generation = inner.next_generation;
            inner.session = Some(SessionRecord {
                generation,
                descriptor: descriptor.clone(),
                backend_kind: None,
                state: SessionState::Resolving,
                backend: None,
            });
            self.live.store(generation, Ordering::Release);
            generation
        };
        info!(generation, source = %descriptor, "opening preview session");

        // Suspension point: URL resolution
        let resolved = match self
            .bounded(
                self.resolver.resolve(&descriptor),
                Error::ResolutionFailed,
                "playback URL resolution",
            )
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => return self.abort(generation, e),
        };
        if !self.is_current(generation) {
            return Ok(());
        }

        let (kind, url) = match resolved.backend() {
            Ok((kind, url)) => (kind, url.to_string()),
            Err(e) => return self.abort(generation, e),
        };

        {
            let mut inner = self.inner.lock().unwrap();
            match inner.session.as_mut() {
                Some(s) if s.generation == generation => {
                    s.backend_kind = Some(kind);
                    s.state = match kind {
                        BackendKind::Flv => SessionState::Loading,
                        BackendKind::Whep => SessionState::Negotiating,
                    };
                }
                _ => return Ok(()),
            }
        }
        debug!(generation, backend = %kind, url, "backend selected");

        let mut backend = self.factory.build(kind);
        let binding = SinkBinding::new(self.sink.clone(), generation, self.live.clone());

        // Suspension point: backend bring-up (FLV capability check + load,
        // or the full WHEP signaling exchange)
        match self
            .bounded(
                backend.start(&url, binding),
                Error::NegotiationFailed,
                "backend negotiation",
            )
            .await
        {
            Ok(()) => {
                let stale = {
                    let mut inner = self.inner.lock().unwrap();
                    match inner.session.as_mut() {
                        Some(s) if s.generation == generation && self.is_current(generation) => {
                            s.backend = Some(backend);
                            s.state = SessionState::Playing;
                            None
                        }
                        _ => Some(backend),
                    }
                };
                match stale {
                    None => {
                        info!(generation, backend = %kind, "preview session playing");
                        Ok(())
                    }
                    Some(mut backend) => {
                        // Superseded while the backend came up: release it
                        // and vanish without a report.
                        debug!(generation, "open superseded after backend ready, releasing");
                        backend.stop().await;
                        Ok(())
                    }
                }
            }
            Err(e) => {
                backend.stop().await;
                if self.is_current(generation) {
                    self.abort(generation, e)
                } else {
                    debug!(generation, "open superseded during failed bring-up");
                    Ok(())
                }
            }
        }
    }

    /// Close the current session.
    ///
    /// Valid from any state and idempotent; closing an already-closed or
    /// absent session is a no-op. Safe to call while a suspension point is
    /// outstanding: the generation is retired first, so the outstanding
    /// continuation discards itself and releases its own resources.
    pub async fn close(&self) {
        let (backend, generation) = {
            let mut inner = self.inner.lock().unwrap();
            let Some(session) = inner.session.as_mut() else {
                return;
            };
            if session.state == SessionState::Closed {
                return;
            }
            session.state = SessionState::Closed;
            // Retire the generation before releasing anything so no stale
            // continuation can touch the sink mid-teardown.
            self.live.store(0, Ordering::Release);
            (session.backend.take(), session.generation)
        };

        if let Some(mut backend) = backend {
            backend.stop().await;
        }
        self.sink.clear();
        info!(generation, "preview session closed");
    }

    /// Abort `generation` with `err`: release its claim on the sink, mark it
    /// closed, and report the failure once. A generation superseded in the
    /// meantime is dropped silently instead.
    fn abort(&self, generation: u64, err: Error) -> Result<()> {
        if self
            .live
            .compare_exchange(generation, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(generation, "stale failure discarded");
            return Ok(());
        }
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(session) = inner.session.as_mut() {
                if session.generation == generation {
                    session.state = SessionState::Closed;
                    session.backend = None;
                }
            }
        }
        self.sink.clear();
        warn!(generation, error = %err, "preview session aborted");
        Err(err)
    }

    /// Apply the configured negotiation timeout, if any
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T>>,
        on_timeout: fn(String) -> Error,
        what: &str,
    ) -> Result<T> {
        match self.config.negotiation_timeout() {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(on_timeout(format!("{what} timed out after {limit:?}"))),
            },
            None => fut.await,
        }
    }
}
