//! Admin GraphQL client for a Shopify-style media backend.
//!
//! Phase 1 is `stagedUploadsCreate`, phase 2 a multipart POST to the staged
//! URL, phase 3 `productCreateMedia`.

use crate::config::Config;
use crate::config::secrets::{ExposeSecret, SecretString};
use crate::error::{Error, Result};
use crate::model::{AttachRequest, EncodedFile, StagedParameter, StagedTarget, StagedUploadRequest};
use crate::provider::MediaProvider;
use crate::telemetry::metrics;
use async_trait::async_trait;
use opentelemetry::KeyValue;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::debug;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

const STAGED_UPLOADS_CREATE: &str = r#"
mutation stagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets {
      url
      resourceUrl
      parameters { name value }
    }
    userErrors { field message }
  }
}"#;

const PRODUCT_CREATE_MEDIA: &str = r#"
mutation productCreateMedia($productId: ID!, $media: [CreateMediaInput!]!) {
  productCreateMedia(productId: $productId, media: $media) {
    media { alt mediaContentType status }
    mediaUserErrors { field message }
  }
}"#;

/// Connection settings for [`GraphqlProvider`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Full GraphQL endpoint URL.
    pub endpoint: String,
    pub access_token: SecretString,
    /// Applied to every outbound request, uploads included.
    pub request_timeout: Duration,
}

impl ProviderConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.graphql_endpoint(),
            access_token: config.access_token.clone(),
            request_timeout: config.request_timeout,
        }
    }
}

pub struct GraphqlProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl GraphqlProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        phase: &'static str,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        let started = Instant::now();
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(ACCESS_TOKEN_HEADER, self.config.access_token.expose_secret())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| unreachable(&self.config.endpoint, e))?;
        record_phase_duration(phase, started);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Protocol {
                phase,
                errors: vec![format!("status {status}: {body}")],
            });
        }

        let body: GraphqlResponse<T> = response.json().await.map_err(|e| Error::Protocol {
            phase,
            errors: vec![format!("malformed response: {e}")],
        })?;
        if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
            return Err(Error::Protocol {
                phase,
                errors: errors.into_iter().map(|e| e.message).collect(),
            });
        }
        body.data.ok_or_else(|| Error::Protocol {
            phase,
            errors: vec!["response carried no data".to_string()],
        })
    }
}

#[async_trait]
impl MediaProvider for GraphqlProvider {
    async fn create_staged_upload(&self, request: &StagedUploadRequest) -> Result<StagedTarget> {
        let variables = json!({
            "input": [{
                "filename": request.filename,
                "mimeType": request.mime_type,
                "httpMethod": request.http_method,
                "resource": request.resource.as_str(),
                "fileSize": request.file_size.to_string(),
            }]
        });

        let data: StagedUploadsData = self
            .execute("stage", STAGED_UPLOADS_CREATE, variables)
            .await?;
        let payload = data.staged_uploads_create.ok_or_else(|| Error::Protocol {
            phase: "stage",
            errors: vec!["stagedUploadsCreate returned null".to_string()],
        })?;

        check_user_errors("stage", payload.user_errors)?;

        let target = payload
            .staged_targets
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| Error::Protocol {
                phase: "stage",
                errors: vec!["no staged target issued".to_string()],
            })?;

        match (target.url, target.resource_url) {
            (Some(upload_url), Some(resource_url)) => {
                debug!(%upload_url, %resource_url, "staged target created");
                Ok(StagedTarget {
                    upload_url,
                    resource_url,
                    parameters: target.parameters.unwrap_or_default(),
                })
            }
            _ => Err(Error::Protocol {
                phase: "stage",
                errors: vec!["staged target is missing its URLs".to_string()],
            }),
        }
    }

    async fn upload(&self, target: &StagedTarget, file: &EncodedFile) -> Result<()> {
        let mut form = Form::new();
        for parameter in &target.parameters {
            form = form.text(parameter.name.clone(), parameter.value.clone());
        }
        // The storage backend expects the file part last.
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.mime_type)?;
        form = form.part("file", part);

        let started = Instant::now();
        let response = self
            .client
            .post(&target.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| unreachable(&target.upload_url, e))?;
        record_phase_duration("upload", started);

        let status = response.status();
        if status.is_success() {
            debug!(bytes = file.bytes.len(), "staged upload accepted");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Protocol {
                phase: "upload",
                errors: vec![format!("status {status}: {body}")],
            })
        }
    }

    async fn attach(&self, request: &AttachRequest) -> Result<()> {
        let variables = json!({
            "productId": request.target_id,
            "media": [{
                "originalSource": request.resource_url,
                "alt": request.alt_text,
                "mediaContentType": request.category.as_str(),
            }]
        });

        let data: ProductCreateMediaData = self
            .execute("attach", PRODUCT_CREATE_MEDIA, variables)
            .await?;
        let payload = data.product_create_media.ok_or_else(|| {
            Error::AttachFailed(format!("no response payload for {}", request.target_id))
        })?;

        check_user_errors("attach", payload.media_user_errors)?;

        if payload.media.unwrap_or_default().is_empty() {
            return Err(Error::AttachFailed(format!(
                "no media created on {}",
                request.target_id
            )));
        }
        Ok(())
    }
}

fn check_user_errors(phase: &'static str, errors: Option<Vec<UserError>>) -> Result<()> {
    let errors = errors.unwrap_or_default();
    if errors.is_empty() {
        return Ok(());
    }
    Err(Error::Protocol {
        phase,
        errors: errors.into_iter().map(UserError::describe).collect(),
    })
}

fn unreachable(url: &str, error: reqwest::Error) -> Error {
    Error::RemoteUnreachable(format!("{url}: {error}"))
}

fn record_phase_duration(phase: &'static str, started: Instant) {
    metrics::remote_phase_duration_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[KeyValue::new("phase", phase)],
    );
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct UserError {
    field: Option<Vec<String>>,
    message: String,
}

impl UserError {
    fn describe(self) -> String {
        match self.field {
            Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), self.message),
            _ => self.message,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StagedUploadsData {
    staged_uploads_create: Option<StagedUploadsPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StagedUploadsPayload {
    staged_targets: Option<Vec<WireStagedTarget>>,
    user_errors: Option<Vec<UserError>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStagedTarget {
    url: Option<String>,
    resource_url: Option<String>,
    parameters: Option<Vec<StagedParameter>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductCreateMediaData {
    product_create_media: Option<ProductCreateMediaPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductCreateMediaPayload {
    media: Option<Vec<Value>>,
    media_user_errors: Option<Vec<UserError>>,
}
