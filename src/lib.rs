//! # mediaq
//!
//! Rate-limited image ingestion for a remote media provider.
//!
//! Provides a bounded-concurrency task engine, input classification and JPEG
//! normalization, the three-phase stage/upload/attach protocol with retries,
//! and an HTTP front door. Observability goes through `tracing` and
//! OpenTelemetry.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod ingest;
pub mod media;
pub mod model;
pub mod provider;
pub mod server;
pub mod telemetry;
