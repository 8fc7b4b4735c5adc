//! Shared fixtures: a recording provider double, image bytes, and a local
//! HTTP host for remote-URL inputs.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
use mediaq::engine::TaskEngine;
use mediaq::error::{Error, Result};
use mediaq::event::{Event, EventKind};
use mediaq::ingest::{IngestOptions, Ingestor, RetryPolicy};
use mediaq::model::{AttachRequest, EncodedFile, StagedParameter, StagedTarget, StagedUploadRequest};
use mediaq::provider::MediaProvider;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const STAGED_RESOURCE_URL: &str = "https://storage.example.com/tmp/staged/resource.jpg";

// ---------------------------------------------------------------------------
// Image fixtures
// ---------------------------------------------------------------------------

pub fn jpeg_bytes() -> Vec<u8> {
    let img = ImageBuffer::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 128]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

pub fn png_bytes() -> Vec<u8> {
    let img = ImageBuffer::from_fn(8, 8, |x, _| Rgba([255, (x * 32) as u8, 0, 128]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn jpeg_file() -> tempfile::NamedTempFile {
    let file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    std::fs::write(file.path(), jpeg_bytes()).unwrap();
    file
}

// ---------------------------------------------------------------------------
// Recording provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Call {
    Stage(StagedUploadRequest),
    Upload {
        upload_url: String,
        filename: String,
        mime_type: String,
        bytes: Vec<u8>,
        parameters: Vec<StagedParameter>,
    },
    Attach(AttachRequest),
}

/// Records every protocol call. Optionally fails phase 2 or slows phase 3.
#[derive(Default)]
pub struct RecordingProvider {
    calls: Mutex<Vec<Call>>,
    upload_failure: Option<u16>,
    attach_delay: Option<Duration>,
    attaching: AtomicUsize,
    peak_attaching: AtomicUsize,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload answers with this non-success status.
    pub fn failing_upload(status: u16) -> Self {
        Self {
            upload_failure: Some(status),
            ..Self::default()
        }
    }

    pub fn slow_attach(delay: Duration) -> Self {
        Self {
            attach_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn attaches(&self) -> Vec<AttachRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Attach(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    pub fn upload_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Upload { .. }))
            .count()
    }

    pub fn peak_attaching(&self) -> usize {
        self.peak_attaching.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProvider for RecordingProvider {
    async fn create_staged_upload(&self, request: &StagedUploadRequest) -> Result<StagedTarget> {
        self.calls.lock().unwrap().push(Call::Stage(request.clone()));
        Ok(StagedTarget {
            upload_url: "https://storage.example.com/upload".to_string(),
            resource_url: STAGED_RESOURCE_URL.to_string(),
            parameters: vec![
                StagedParameter {
                    name: "key".to_string(),
                    value: format!("tmp/{}", request.filename),
                },
                StagedParameter {
                    name: "policy".to_string(),
                    value: "signed".to_string(),
                },
            ],
        })
    }

    async fn upload(&self, target: &StagedTarget, file: &EncodedFile) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Upload {
            upload_url: target.upload_url.clone(),
            filename: file.filename.clone(),
            mime_type: file.mime_type.clone(),
            bytes: file.bytes.clone(),
            parameters: target.parameters.clone(),
        });
        match self.upload_failure {
            Some(status) => Err(Error::Protocol {
                phase: "upload",
                errors: vec![format!("status {status}")],
            }),
            None => Ok(()),
        }
    }

    async fn attach(&self, request: &AttachRequest) -> Result<()> {
        let now = self.attaching.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_attaching.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.attach_delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(Call::Attach(request.clone()));
        self.attaching.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ingestor wiring
// ---------------------------------------------------------------------------

/// Options with no backoff so retry tests run instantly.
pub fn fast_options() -> IngestOptions {
    IngestOptions {
        retry: RetryPolicy::new(2, Duration::ZERO),
        probe_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        ..IngestOptions::default()
    }
}

pub fn ingestor(
    provider: Arc<RecordingProvider>,
    concurrency: usize,
    options: IngestOptions,
) -> (Ingestor, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = TaskEngine::new(concurrency).unwrap();
    let ingestor = Ingestor::new(engine, provider, options, Some(tx)).unwrap();
    (ingestor, rx)
}

/// Everything emitted so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<EventKind> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event.kind);
    }
    events
}

pub fn attempts_started(events: &[EventKind]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, EventKind::AttemptStarted { .. }))
        .count()
}

// ---------------------------------------------------------------------------
// Remote image host
// ---------------------------------------------------------------------------

/// Counts HEAD and GET requests per path.
#[derive(Default)]
pub struct HostCounters {
    pub heads: AtomicUsize,
    pub gets: AtomicUsize,
}

/// Serves:
/// - `/photo.jpg`: a JPEG
/// - `/page.html`: HTML
/// - `/no-head.jpg`: 405 on HEAD, a JPEG on GET
/// - `/missing.jpg`: 404
pub async fn spawn_image_host() -> (SocketAddr, Arc<HostCounters>) {
    let counters = Arc::new(HostCounters::default());
    let jpeg = jpeg_bytes();

    let app = Router::new().route(
        "/{name}",
        any({
            let counters = Arc::clone(&counters);
            move |method: Method, axum::extract::Path(name): axum::extract::Path<String>| {
                let counters = Arc::clone(&counters);
                let jpeg = jpeg.clone();
                async move { serve_fixture(&counters, method, &name, jpeg) }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, counters)
}

fn serve_fixture(counters: &HostCounters, method: Method, name: &str, jpeg: Vec<u8>) -> Response {
    let is_head = method == Method::HEAD;
    if is_head {
        counters.heads.fetch_add(1, Ordering::SeqCst);
    } else {
        counters.gets.fetch_add(1, Ordering::SeqCst);
    }

    match name {
        "photo.jpg" => ([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response(),
        "page.html" => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            "<html></html>",
        )
            .into_response(),
        "no-head.jpg" if is_head => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        "no-head.jpg" => ([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
