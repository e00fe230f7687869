use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::api::context::AppState;
use crate::api::error::ApiError;
use crate::error::IntakeError;
use crate::output::DocumentRecord;

/// Query parameters of `GET /documents`, still as raw text.
#[derive(Debug, Default)]
pub struct ListParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    /// Collect the known keys from raw query pairs. A repeated key keeps its
    /// first value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut params.page,
                "per_page" => &mut params.per_page,
                "search" => &mut params.search,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

/// `GET /documents?page=&per_page=&search=`
#[tracing::instrument(skip(state))]
pub async fn list_documents_handler(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    let Query(pairs) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let params = ListParams::from_pairs(pairs);
    let page = params.page.as_deref().unwrap_or("1");
    let per_page = params.per_page.as_deref().unwrap_or("10");
    let search = params.search.unwrap_or_default().to_lowercase();

    let documents = state
        .records
        .list_records(page, per_page, &search)
        .await
        .map_err(|e| ApiError::from_intake(e, "Failed to list documents"))?;

    Ok(Json(documents))
}

/// `POST /save` — persist `{file_url, metadata}` as a new record.
#[tracing::instrument(skip_all)]
pub async fn save_document_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let id = state
        .records
        .save_record(&body)
        .await
        .map_err(|e| ApiError::from_intake(e, "Failed to save document"))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Metadata saved", "id": id })),
    ))
}

/// `GET /document/:id`
#[tracing::instrument(skip(state))]
pub async fn get_document_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentRecord>, ApiError> {
    let id = parse_id(&id)?;

    let document = state
        .records
        .fetch_record(id)
        .await
        .and_then(|found| found.ok_or(IntakeError::NotFound { id }))
        .map_err(|e| ApiError::from_intake(e, "Failed to fetch document"))?;

    Ok(Json(document))
}

/// `PUT /document/:id` — replace the record's metadata.
#[tracing::instrument(skip(state, body))]
pub async fn update_document_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    state
        .records
        .update_record(id, &body)
        .await
        .map_err(|e| ApiError::from_intake(e, "Failed to update document"))?;

    Ok(Json(json!({ "message": "Document updated" })))
}

/// Only a plain run of ASCII digits names a document; anything else
/// (signs, whitespace, out-of-range values) is treated as no such route.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::not_found());
    }
    raw.parse::<i64>().map_err(|_| ApiError::not_found())
}
