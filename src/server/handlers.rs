use super::AppState;
use crate::error::Error;
use crate::model::IngestRequest;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestBody {
    pub input: Option<String>,
    pub product_id: Option<String>,
    pub alt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAccepted {
    pub status: String,
    pub queued: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBody {
    pub path: Option<String>,
    pub product_id: Option<String>,
    pub alt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDone {
    pub resource_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

type Failure = (StatusCode, Json<ErrorBody>);

fn failure(error: impl ToString) -> Failure {
    let error = error.to_string();
    warn!(%error, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error }))
}

fn required(field: Option<String>, name: &str) -> Result<String, Failure> {
    field
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| failure(Error::InvalidRequest(format!("{name} is required"))))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn ingest_media(
    State(state): State<AppState>,
    body: Result<Json<IngestBody>, JsonRejection>,
) -> Result<impl IntoResponse, Failure> {
    let Json(body) = body.map_err(failure)?;
    let input = required(body.input, "input")?;
    let product_id = required(body.product_id, "productId")?;
    let alt = body.alt.unwrap_or_default();

    state
        .ingestor
        .ingest(IngestRequest::new(input, product_id, alt))
        .await
        .map_err(failure)?
        .detach();

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestAccepted {
            status: "queued".to_string(),
            queued: state.ingestor.engine().queued(),
        }),
    ))
}

pub async fn upload_media(
    State(state): State<AppState>,
    body: Result<Json<UploadBody>, JsonRejection>,
) -> Result<impl IntoResponse, Failure> {
    let Json(body) = body.map_err(failure)?;
    let path = required(body.path, "path")?;
    let product_id = required(body.product_id, "productId")?;
    let alt = body.alt.unwrap_or_default();

    let resource_url = state
        .ingestor
        .upload_file(path, product_id, alt)
        .map_err(failure)?
        .await
        .map_err(failure)?;

    Ok((StatusCode::OK, Json(UploadDone { resource_url })))
}
