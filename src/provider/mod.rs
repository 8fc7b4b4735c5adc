//! Remote media provider: the three-phase stage → upload → attach protocol.

pub mod graphql;

use crate::error::Result;
use crate::model::{AttachRequest, EncodedFile, StagedTarget, StagedUploadRequest};
use async_trait::async_trait;

pub use graphql::{GraphqlProvider, ProviderConfig};

/// A backend that can stage, receive and attach media.
///
/// Implementations map user-facing error lists to
/// [`Error::Protocol`](crate::error::Error::Protocol).
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Phase 1: reserve an upload destination for one file.
    async fn create_staged_upload(&self, request: &StagedUploadRequest) -> Result<StagedTarget>;

    /// Phase 2: send the bytes plus every staged form field to the target.
    async fn upload(&self, target: &StagedTarget, file: &EncodedFile) -> Result<()>;

    /// Phase 3: attach a resource reference to the target entity.
    async fn attach(&self, request: &AttachRequest) -> Result<()>;
}
