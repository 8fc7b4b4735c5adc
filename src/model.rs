//! Core data model.
//!
//! An ingestion takes one image reference and attaches it to a target entity.
//! Between the two sits the three-phase remote protocol: stage, upload, attach.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Ingest Request
// ---------------------------------------------------------------------------

/// One image reference destined for one target entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Local path, absolute URL, or inline `data:image/...;base64,` payload.
    pub input: String,

    /// Opaque ID of the entity the media is attached to (e.g. `gid://shop/Product/1`).
    pub target_id: String,

    /// Alt text stored with the attached media.
    pub alt_text: String,
}

impl IngestRequest {
    pub fn new(
        input: impl Into<String>,
        target_id: impl Into<String>,
        alt_text: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            target_id: target_id.into(),
            alt_text: alt_text.into(),
        }
    }
}

/// Newtype for ingestion IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngestId(pub Uuid);

impl IngestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for IngestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for IngestId {
    fn default() -> Self {
        Self::new()
    }
}

/// Attempt counter for a single ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestAttempt {
    /// 1-based.
    pub number: u32,
    pub max_attempts: u32,
}

impl IngestAttempt {
    pub fn first(max_attempts: u32) -> Self {
        Self {
            number: 1,
            max_attempts,
        }
    }

    /// The following attempt, or `None` once the budget is spent.
    pub fn next(self) -> Option<Self> {
        (self.number < self.max_attempts).then_some(Self {
            number: self.number + 1,
            ..self
        })
    }
}

/// How an ingestion ended. Ingestion failures never surface as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Attached { resource_url: String },
    Abandoned { attempts: u32, error: String },
}

// ---------------------------------------------------------------------------
// Remote URL handling
// ---------------------------------------------------------------------------

/// What to do with an input that is a remote URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteUrlMode {
    /// Download, transcode and stage the bytes like any other input.
    #[default]
    Reupload,
    /// Probe the URL, then hand it to the provider as the resource reference.
    Direct,
}

impl std::fmt::Display for RemoteUrlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RemoteUrlMode::Reupload => "reupload",
            RemoteUrlMode::Direct => "direct",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RemoteUrlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reupload" => Ok(RemoteUrlMode::Reupload),
            "direct" => Ok(RemoteUrlMode::Direct),
            other => Err(format!("unknown remote url mode: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Remote protocol
// ---------------------------------------------------------------------------

/// Resource category sent with staging and attach requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceCategory {
    Image,
}

impl ResourceCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceCategory::Image => "IMAGE",
        }
    }
}

/// Phase 1 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUploadRequest {
    pub filename: String,
    pub mime_type: String,
    pub file_size: u64,
    /// HTTP verb the phase 2 upload will use.
    pub http_method: String,
    pub resource: ResourceCategory,
}

/// Phase 1 response: where to upload and what to send along.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedTarget {
    pub upload_url: String,
    pub resource_url: String,
    /// Form fields for phase 2, in the order the backend issued them.
    pub parameters: Vec<StagedParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedParameter {
    pub name: String,
    pub value: String,
}

/// Canonical bytes ready for phase 2.
#[derive(Debug, Clone)]
pub struct EncodedFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Phase 3 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachRequest {
    pub target_id: String,
    pub resource_url: String,
    pub alt_text: String,
    pub category: ResourceCategory,
}
