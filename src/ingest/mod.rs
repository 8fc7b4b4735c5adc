//! Media ingestion orchestrator.
//!
//! Each ingestion is classified at enqueue time and then becomes one unit of
//! work in the [`TaskEngine`]: acquire and normalize the bytes, then stage,
//! upload and attach.
//! Attempts are retried per [`RetryPolicy`]; once the budget is spent the
//! ingestion is discarded and only the event stream and logs record it.

pub mod retry;
pub mod source;

use crate::config::Config;
use crate::engine::{TaskEngine, TaskHandle};
use crate::error::{Error, Result};
use crate::event::{Event, EventKind, EventSink};
use crate::media::{CANONICAL_EXTENSION, CANONICAL_MIME, SourceKind, classify, transcode};
use crate::model::{
    AttachRequest, EncodedFile, IngestId, IngestOutcome, IngestRequest, RemoteUrlMode,
    ResourceCategory, StagedUploadRequest,
};
use crate::provider::MediaProvider;
use crate::telemetry::ingest::{record_attempt, record_phase, start_ingest_span};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, Span, error, info, warn};
use uuid::Uuid;

pub use retry::RetryPolicy;
pub use source::RemoteFetcher;

/// Longest slice of an input echoed into errors and events.
const INPUT_PREVIEW_CHARS: usize = 80;

/// Ingestion behavior knobs.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub retry: RetryPolicy,
    pub remote_urls: RemoteUrlMode,
    /// Bound on the remote HEAD probe and its GET fallback.
    pub probe_timeout: Duration,
    /// Bound on every other remote retrieval.
    pub request_timeout: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            remote_urls: RemoteUrlMode::Reupload,
            probe_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retry: RetryPolicy::new(config.max_attempts, config.retry_backoff),
            remote_urls: config.remote_urls,
            probe_timeout: config.probe_timeout,
            request_timeout: config.request_timeout,
        }
    }
}

/// Submits ingestions to a shared [`TaskEngine`].
#[derive(Clone)]
pub struct Ingestor {
    engine: TaskEngine,
    pipeline: Arc<Pipeline>,
}

impl Ingestor {
    /// `events` receives every ingestion event; pass `None` to rely on logs alone.
    pub fn new(
        engine: TaskEngine,
        provider: Arc<dyn MediaProvider>,
        options: IngestOptions,
        events: Option<mpsc::UnboundedSender<Event>>,
    ) -> Result<Self> {
        let remote = RemoteFetcher::new(options.request_timeout, options.probe_timeout)?;
        Ok(Self {
            engine,
            pipeline: Arc::new(Pipeline {
                provider,
                remote,
                options,
                events: EventSink::new(events),
            }),
        })
    }

    pub fn engine(&self) -> &TaskEngine {
        &self.engine
    }

    /// Validate, classify and enqueue one ingestion.
    ///
    /// The handle resolves with an [`IngestOutcome`], never with an
    /// ingestion error. `Queued` is emitted before the unit can start.
    ///
    /// # Errors
    /// [`Error::InvalidRequest`] for missing fields, [`Error::QueueFull`] if
    /// the engine queue is at capacity.
    pub async fn ingest(&self, request: IngestRequest) -> Result<TaskHandle<IngestOutcome>> {
        validate(&request.input, &request.target_id)?;

        let id = IngestId::new();
        let kind = classify_off_thread(request.input.clone()).await?;
        let source = kind.label();
        let target_id = request.target_id.clone();

        let (queued_tx, queued_rx) = oneshot::channel::<()>();
        let pipeline = Arc::clone(&self.pipeline);
        let handle = self.engine.submit(move || async move {
            let _ = queued_rx.await;
            Ok(pipeline.run(id, kind, request).await)
        })?;

        self.pipeline.events.emit(EventKind::Queued {
            id,
            target_id,
            source: source.to_string(),
        });
        let _ = queued_tx.send(());

        metrics::ingest_submitted().add(1, &[KeyValue::new("source", source)]);
        info!(%id, source, "ingestion queued");
        Ok(handle)
    }

    /// One attempt at uploading a local file, bypassing classification.
    ///
    /// Runs inside the engine like any ingestion, but is not retried and
    /// its failure is delivered through the handle.
    pub fn upload_file(
        &self,
        path: impl Into<PathBuf>,
        target_id: impl Into<String>,
        alt_text: impl Into<String>,
    ) -> Result<TaskHandle<String>> {
        let path = path.into();
        let request = IngestRequest::new(path.display().to_string(), target_id, alt_text);
        validate(&request.input, &request.target_id)?;

        let id = IngestId::new();
        let pipeline = Arc::clone(&self.pipeline);
        self.engine.submit(move || async move {
            let kind = SourceKind::LocalFile(path);
            let span = start_ingest_span(id, &request.target_id, kind.label());
            record_attempt(&span, 1);
            pipeline
                .attempt(&kind, &request, &span)
                .instrument(span.clone())
                .await
        })
    }
}

/// Classification stats the filesystem, so keep it off the async workers.
async fn classify_off_thread(input: String) -> Result<SourceKind> {
    tokio::task::spawn_blocking(move || classify(&input))
        .await
        .map_err(|e| Error::Other(format!("classifier task failed: {e}")))
}

fn validate(input: &str, target_id: &str) -> Result<()> {
    if input.trim().is_empty() {
        return Err(Error::InvalidRequest("input is required".to_string()));
    }
    if target_id.trim().is_empty() {
        return Err(Error::InvalidRequest("target id is required".to_string()));
    }
    Ok(())
}

/// Everything a unit of work needs, shared across all units.
struct Pipeline {
    provider: Arc<dyn MediaProvider>,
    remote: RemoteFetcher,
    options: IngestOptions,
    events: EventSink,
}

impl Pipeline {
    async fn run(&self, id: IngestId, kind: SourceKind, request: IngestRequest) -> IngestOutcome {
        let span = start_ingest_span(id, &request.target_id, kind.label());

        async {
            let policy = self.options.retry;
            let mut attempt = policy.first_attempt();
            loop {
                record_attempt(&span, attempt.number);
                self.events.emit(EventKind::AttemptStarted {
                    id,
                    attempt: attempt.number,
                });

                let error = match self.attempt(&kind, &request, &span).await {
                    Ok(resource_url) => {
                        metrics::ingest_attempts().add(1, &[KeyValue::new("result", "attached")]);
                        info!(attempt = attempt.number, %resource_url, "media attached");
                        self.events.emit(EventKind::Attached {
                            id,
                            attempt: attempt.number,
                            resource_url: resource_url.clone(),
                        });
                        return IngestOutcome::Attached { resource_url };
                    }
                    Err(error) => error,
                };

                let retryable = error.is_retryable();
                metrics::ingest_attempts().add(1, &[KeyValue::new("result", "failed")]);
                self.events.emit(EventKind::AttemptFailed {
                    id,
                    attempt: attempt.number,
                    error: error.to_string(),
                    retryable,
                });

                match policy.next_attempt(attempt, &error) {
                    Some(next) => {
                        let delay = policy.delay(attempt);
                        warn!(
                            attempt = attempt.number,
                            %error,
                            delay_ms = delay.as_millis() as u64,
                            "ingestion attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt = next;
                    }
                    None => {
                        error!(attempts = attempt.number, retryable, %error, "ingestion abandoned");
                        metrics::ingest_abandoned()
                            .add(1, &[KeyValue::new("retryable", retryable.to_string())]);
                        self.events.emit(EventKind::Abandoned {
                            id,
                            input: preview(&request.input),
                            target_id: request.target_id.clone(),
                            attempts: attempt.number,
                            error: error.to_string(),
                        });
                        return IngestOutcome::Abandoned {
                            attempts: attempt.number,
                            error: error.to_string(),
                        };
                    }
                }
            }
        }
        .instrument(span.clone())
        .await
    }

    /// One full pass: acquire, normalize, stage, upload, attach.
    /// Returns the resource reference handed to the attach phase.
    async fn attempt(&self, kind: &SourceKind, request: &IngestRequest, span: &Span) -> Result<String> {
        let resource_url = match kind {
            SourceKind::Unrecognized => {
                return Err(Error::UnsupportedInput(format!(
                    "{:?} is not an inline image, an existing file, or an absolute URL",
                    preview(&request.input)
                )));
            }
            SourceKind::RemoteUrl(url) if self.options.remote_urls == RemoteUrlMode::Direct => {
                self.remote.probe(url).await?;
                url.to_string()
            }
            _ => {
                let raw = self.acquire(kind, &request.input).await?;
                let file = normalize(raw).await?;
                self.stage_and_upload(&file, span).await?
            }
        };

        self.provider
            .attach(&AttachRequest {
                target_id: request.target_id.clone(),
                resource_url: resource_url.clone(),
                alt_text: request.alt_text.clone(),
                category: ResourceCategory::Image,
            })
            .await?;
        record_phase(span, "attach");

        Ok(resource_url)
    }

    async fn acquire(&self, kind: &SourceKind, input: &str) -> Result<Vec<u8>> {
        match kind {
            SourceKind::InlineImage => source::decode_inline(input),
            SourceKind::LocalFile(path) => Ok(tokio::fs::read(path).await?),
            SourceKind::RemoteUrl(url) => self.remote.fetch(url).await,
            SourceKind::Unrecognized => Err(Error::UnsupportedInput(preview(input))),
        }
    }

    async fn stage_and_upload(&self, file: &EncodedFile, span: &Span) -> Result<String> {
        let target = self
            .provider
            .create_staged_upload(&StagedUploadRequest {
                filename: file.filename.clone(),
                mime_type: file.mime_type.clone(),
                file_size: file.bytes.len() as u64,
                http_method: "POST".to_string(),
                resource: ResourceCategory::Image,
            })
            .await?;
        record_phase(span, "stage");

        self.provider.upload(&target, file).await?;
        record_phase(span, "upload");

        Ok(target.resource_url)
    }
}

/// Transcode off the async workers and name the result.
async fn normalize(raw: Vec<u8>) -> Result<EncodedFile> {
    let bytes = tokio::task::spawn_blocking(move || transcode(&raw))
        .await
        .map_err(|e| Error::Transcode(format!("transcoder task failed: {e}")))??;

    Ok(EncodedFile {
        filename: format!("{}.{CANONICAL_EXTENSION}", Uuid::new_v4()),
        mime_type: CANONICAL_MIME.to_string(),
        bytes,
    })
}

fn preview(input: &str) -> String {
    if input.chars().count() <= INPUT_PREVIEW_CHARS {
        input.to_string()
    } else {
        let head: String = input.chars().take(INPUT_PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}
