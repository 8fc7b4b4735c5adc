//! Raw byte acquisition for inline payloads and remote URLs.

use crate::error::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Decode the base64 payload after the first `,` of a data URI.
pub fn decode_inline(input: &str) -> Result<Vec<u8>> {
    let (_, payload) = input.split_once(',').ok_or_else(|| {
        Error::UnsupportedInput("inline image has no payload separator".to_string())
    })?;
    STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::UnsupportedInput(format!("inline payload is not valid base64: {e}")))
}

/// HTTP retrieval of externally hosted images.
pub struct RemoteFetcher {
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl RemoteFetcher {
    pub fn new(request_timeout: Duration, probe_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            probe_timeout,
        })
    }

    /// Check that `url` is reachable and serves an image.
    ///
    /// Uses HEAD. Servers that refuse HEAD get a GET bounded by the probe
    /// timeout instead, and its body is returned so it need not be fetched twice.
    pub async fn probe(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .head(url.clone())
            .timeout(self.probe_timeout)
            .send()
            .await;

        match response {
            Ok(response)
                if matches!(
                    response.status(),
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) =>
            {
                debug!(%url, status = %response.status(), "HEAD refused, probing with GET");
                self.probe_with_get(url).await.map(Some)
            }
            Ok(response) => {
                ensure_success(url, &response)?;
                ensure_image(url, &response)?;
                Ok(None)
            }
            Err(e) => {
                warn!(%url, error = %e, "HEAD probe failed, probing with GET");
                self.probe_with_get(url).await.map(Some)
            }
        }
    }

    /// Probe, then retrieve the full body.
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        if let Some(body) = self.probe(url).await? {
            return Ok(body);
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| unreachable(url, e))?;
        ensure_success(url, &response)?;
        read_body(url, response).await
    }

    async fn probe_with_get(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| unreachable(url, e))?;
        ensure_success(url, &response)?;
        ensure_image(url, &response)?;
        read_body(url, response).await
    }
}

fn unreachable(url: &Url, error: reqwest::Error) -> Error {
    Error::RemoteUnreachable(format!("{url}: {error}"))
}

fn ensure_success(url: &Url, response: &Response) -> Result<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(Error::RemoteUnreachable(format!(
            "{url} returned {}",
            response.status()
        )))
    }
}

/// A reachable URL that serves something other than an image is not going
/// to improve on retry.
fn ensure_image(url: &Url, response: &Response) -> Result<()> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if is_image_content_type(content_type) {
        Ok(())
    } else {
        Err(Error::UnsupportedInput(format!(
            "{url} serves {:?}, not an image",
            content_type
        )))
    }
}

fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

async fn read_body(url: &Url, response: Response) -> Result<Vec<u8>> {
    let bytes = response.bytes().await.map_err(|e| unreachable(url, e))?;
    debug!(%url, bytes = bytes.len(), "remote image retrieved");
    Ok(bytes.to_vec())
}
