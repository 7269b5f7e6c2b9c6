//! Shared fakes for controller-level tests: a recording sink, a scriptable
//! resolver, and a backend factory whose backends log acquire/release order.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use media_preview::{
    BackendFactory, BackendKind, Error, FrameKind, MediaFrame, MediaSink, PlaybackResolver,
    PreviewBackend, ResolvedSource, Result, SinkBinding, SourceDescriptor,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Sink that records every frame and clear() call
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Mutex<Vec<MediaFrame>>,
    pub cleared: AtomicU64,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend ids (the fake backends' payload marker) of rendered frames
    pub fn rendered_ids(&self) -> Vec<u8> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter_map(|f| f.payload.first().copied())
            .collect()
    }
}

impl MediaSink for RecordingSink {
    fn render(&self, frame: MediaFrame) {
        self.frames.lock().unwrap().push(frame);
    }

    fn clear(&self) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
    }
}

/// Resolver answering from a per-descriptor script
#[derive(Default)]
pub struct FakeResolver {
    responses: Mutex<HashMap<String, std::result::Result<ResolvedSource, String>>>,
}

impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn progressive(&self, descriptor: &SourceDescriptor, url: &str) {
        self.responses.lock().unwrap().insert(
            descriptor.label(),
            Ok(ResolvedSource {
                progressive_url: Some(url.to_string()),
                signaling_url: None,
            }),
        );
    }

    pub fn signaling(&self, descriptor: &SourceDescriptor, url: &str) {
        self.responses.lock().unwrap().insert(
            descriptor.label(),
            Ok(ResolvedSource {
                progressive_url: None,
                signaling_url: Some(url.to_string()),
            }),
        );
    }

    /// Successful resolution carrying no URL at all
    pub fn empty(&self, descriptor: &SourceDescriptor) {
        self.responses
            .lock()
            .unwrap()
            .insert(descriptor.label(), Ok(ResolvedSource::default()));
    }

    pub fn failure(&self, descriptor: &SourceDescriptor, msg: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(descriptor.label(), Err(msg.to_string()));
    }
}

#[async_trait]
impl PlaybackResolver for FakeResolver {
    async fn resolve(&self, descriptor: &SourceDescriptor) -> Result<ResolvedSource> {
        match self.responses.lock().unwrap().get(&descriptor.label()) {
            Some(Ok(resolved)) => Ok(resolved.clone()),
            Some(Err(msg)) => Err(Error::ResolutionFailed(msg.clone())),
            None => Err(Error::ResolutionFailed(format!(
                "no stubbed resolution for {descriptor}"
            ))),
        }
    }
}

/// Factory building [`RecordingBackend`]s; every acquire/release lands in
/// one shared, ordered event log.
pub struct RecordingFactory {
    pub events: Arc<Mutex<Vec<String>>>,
    next_id: AtomicU64,
    gate_for_next: Mutex<Option<Arc<Notify>>>,
    fail_next_with: Mutex<Option<String>>,
    render_on_start: bool,
}

impl RecordingFactory {
    pub fn new() -> Arc<Self> {
        Self::build_with(false)
    }

    /// Like `new`, but every backend renders one marker frame (payload =
    /// backend id) through its binding when `start` completes.
    pub fn rendering() -> Arc<Self> {
        Self::build_with(true)
    }

    fn build_with(render_on_start: bool) -> Arc<Self> {
        Arc::new(Self {
            events: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
            gate_for_next: Mutex::new(None),
            fail_next_with: Mutex::new(None),
            render_on_start,
        })
    }

    /// The next backend built will block inside `start` until `gate` is
    /// notified.
    pub fn gate_next(&self, gate: Arc<Notify>) {
        *self.gate_for_next.lock().unwrap() = Some(gate);
    }

    /// The next backend built will fail `start` with `Unsupported(msg)`.
    pub fn fail_next(&self, msg: &str) {
        *self.fail_next_with.lock().unwrap() = Some(msg.to_string());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl BackendFactory for RecordingFactory {
    fn build(&self, kind: BackendKind) -> Box<dyn PreviewBackend> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Box::new(RecordingBackend {
            id,
            kind,
            events: self.events.clone(),
            gate: self.gate_for_next.lock().unwrap().take(),
            fail_with: self.fail_next_with.lock().unwrap().take(),
            render_on_start: self.render_on_start,
        })
    }
}

pub struct RecordingBackend {
    id: u64,
    kind: BackendKind,
    events: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Notify>>,
    fail_with: Option<String>,
    render_on_start: bool,
}

#[async_trait]
impl PreviewBackend for RecordingBackend {
    async fn start(&mut self, url: &str, binding: SinkBinding) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("start:{}#{}:{}", self.kind, self.id, url));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(msg) = &self.fail_with {
            return Err(Error::Unsupported(msg.clone()));
        }
        if self.render_on_start {
            binding.render(MediaFrame {
                kind: FrameKind::Video,
                timestamp: 0,
                keyframe: true,
                payload: Bytes::copy_from_slice(&[self.id as u8]),
            });
        }
        Ok(())
    }

    async fn stop(&mut self) {
        self.events
            .lock()
            .unwrap()
            .push(format!("stop:{}#{}", self.kind, self.id));
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }
}

/// Poll until `predicate` holds or the deadline passes
pub async fn wait_for(mut predicate: impl FnMut() -> bool) {
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached within deadline");
}
