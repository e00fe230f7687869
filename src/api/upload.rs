use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;

use crate::api::context::AppState;
use crate::api::error::ApiError;
use crate::output::UploadOutcome;

/// Name of the multipart field carrying the PDF.
pub const FILE_FIELD: &str = "file";

/// `POST /upload` — store a PDF and return its extracted metadata.
///
/// The record is not saved; clients follow up with `POST /save`.
#[tracing::instrument(skip_all)]
pub async fn upload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadOutcome>), ApiError> {
    let mut multipart =
        multipart.map_err(|_| ApiError::bad_request("No file part in the request"))?;

    let limit = state.config.max_upload_bytes;
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, limit))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::bad_request("No file part in the request"))?;
    if file_name.is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }

    let base_url = public_base_url(&state, &headers);
    let outcome = state
        .pipeline
        .handle_upload(&file_name, &bytes, &state.config.upload_folder, &base_url)
        .await
        .map_err(ApiError::echo)?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// A body over the upload limit keeps its 413 but names the limit.
fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Rejected upload over the {} byte limit", limit);
        return ApiError::new(
            status,
            format!("File exceeds the upload limit of {limit} bytes"),
        );
    }
    ApiError::new(status, err.body_text())
}

/// The configured public URL, else `http://<Host header>`, else the bind address.
fn public_base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(ref url) = state.config.public_base_url {
        return url.clone();
    }
    match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) if !host.is_empty() => format!("http://{host}"),
        _ => format!("http://{}", state.config.bind_addr),
    }
}
