//! Media input handling: what kind of reference we were given, and how raw
//! image bytes become the canonical encoding.

pub mod classify;
pub mod transcode;

pub use classify::{INLINE_IMAGE_PREFIX, SourceKind, classify};
pub use transcode::{CANONICAL_EXTENSION, CANONICAL_MIME, transcode};
