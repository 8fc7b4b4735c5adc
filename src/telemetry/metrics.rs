//! Metric instrument factories for mediaq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"mediaq"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("mediaq")
}

/// Counter: ingestions accepted into the engine queue.
/// Labels: `source` ("inline" | "local_file" | "remote_url" | "unrecognized").
pub fn ingest_submitted() -> Counter<u64> {
    meter()
        .u64_counter("mediaq.ingest.submitted")
        .with_description("Number of ingestions enqueued")
        .build()
}

/// Counter: ingestion attempts.
/// Labels: `result` ("attached" | "failed").
pub fn ingest_attempts() -> Counter<u64> {
    meter()
        .u64_counter("mediaq.ingest.attempts")
        .with_description("Number of ingestion attempts")
        .build()
}

/// Counter: ingestions discarded after their final failed attempt.
/// Labels: `retryable` ("true" | "false").
pub fn ingest_abandoned() -> Counter<u64> {
    meter()
        .u64_counter("mediaq.ingest.abandoned")
        .with_description("Number of ingestions abandoned")
        .build()
}

/// Histogram: remote phase duration in milliseconds.
/// Labels: `phase` ("stage" | "upload" | "attach").
pub fn remote_phase_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("mediaq.remote.phase_duration_ms")
        .with_description("Remote provider call duration in milliseconds")
        .with_unit("ms")
        .build()
}
