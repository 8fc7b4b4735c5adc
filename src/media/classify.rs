//! Input classification.
//!
//! Precedence, first match wins: inline payload, existing local path,
//! absolute URL. Anything else is unrecognized.

use reqwest::Url;
use std::path::{Path, PathBuf};

/// Marker that opens an inline base64 image (`data:image/png;base64,...`).
pub const INLINE_IMAGE_PREFIX: &str = "data:image/";

/// What a raw input string refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    InlineImage,
    LocalFile(PathBuf),
    RemoteUrl(Url),
    Unrecognized,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::InlineImage => "inline",
            SourceKind::LocalFile(_) => "local_file",
            SourceKind::RemoteUrl(_) => "remote_url",
            SourceKind::Unrecognized => "unrecognized",
        }
    }
}

/// Classify a single input string.
pub fn classify(input: &str) -> SourceKind {
    if input.starts_with(INLINE_IMAGE_PREFIX) {
        return SourceKind::InlineImage;
    }

    let path = Path::new(input);
    if !input.is_empty() && path.exists() {
        return SourceKind::LocalFile(path.to_path_buf());
    }

    match Url::parse(input) {
        // `mailto:` and friends parse but have nothing to fetch.
        Ok(url) if !url.cannot_be_a_base() => SourceKind::RemoteUrl(url),
        _ => SourceKind::Unrecognized,
    }
}
