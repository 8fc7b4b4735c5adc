//! Ingestion span helpers.

use crate::model::IngestId;
use tracing::Span;

/// Start a span covering every attempt of one ingestion.
///
/// `ingest.attempt` is declared empty and updated via [`record_attempt`].
pub fn start_ingest_span(id: IngestId, target_id: &str, source: &str) -> Span {
    tracing::info_span!(
        "ingest.execute",
        "ingest.id" = %id,
        "ingest.target" = target_id,
        "ingest.source" = source,
        "ingest.attempt" = tracing::field::Empty,
    )
}

pub fn record_attempt(span: &Span, attempt: u32) {
    span.record("ingest.attempt", attempt);
}

/// Emit a phase-completed event scoped to the given span.
pub fn record_phase(span: &Span, phase: &str) {
    span.in_scope(|| {
        tracing::debug!(phase = phase, "phase_completed");
    });
}
