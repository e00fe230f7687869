//! Record service: input validation and pagination over [`DocumentStore`].
//!
//! Arguments arrive in the shape the HTTP layer receives them (query strings
//! as text, bodies as untyped JSON) and are validated here, so every entry
//! point enforces the same rules.

use crate::error::IntakeError;
use crate::output::{DocumentRecord, Metadata};
use crate::store::DocumentStore;
use serde_json::Value;
use tracing::{debug, info};

/// Validation and pagination layer over the record store.
#[derive(Clone)]
pub struct RecordService {
    store: DocumentStore,
}

impl RecordService {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// List one page of records, optionally filtered by `search`.
    ///
    /// `page` and `per_page` must parse as integers ≥ 1. Page 1 starts at the
    /// lowest id.
    pub async fn list_records(
        &self,
        page: &str,
        per_page: &str,
        search: &str,
    ) -> Result<Vec<DocumentRecord>, IntakeError> {
        let (page, per_page) = match (page.trim().parse::<i64>(), per_page.trim().parse::<i64>()) {
            (Ok(p), Ok(n)) => (p, n),
            _ => {
                return Err(IntakeError::InvalidArgument(
                    "Page and per_page must be integers".into(),
                ))
            }
        };
        if page < 1 || per_page < 1 {
            return Err(IntakeError::InvalidArgument(
                "Page and per_page must be positive integers".into(),
            ));
        }
        let offset = (page - 1).checked_mul(per_page).ok_or_else(|| {
            IntakeError::InvalidArgument("Page is out of range".into())
        })?;

        debug!(
            "Listing documents: offset={} limit={} search={:?}",
            offset, per_page, search
        );
        self.store.list(offset, per_page, search).await
    }

    /// Validate `body` as `{file_url, metadata}` and store it as a new record.
    ///
    /// Returns the new record's id.
    pub async fn save_record(&self, body: &Value) -> Result<i64, IntakeError> {
        let body = body
            .as_object()
            .ok_or_else(|| IntakeError::InvalidArgument("Invalid data format".into()))?;

        let file_url = match body.get("file_url") {
            Some(Value::String(url)) if !url.is_empty() => url,
            _ => {
                return Err(IntakeError::InvalidArgument(
                    "Missing or invalid file_url".into(),
                ))
            }
        };
        let metadata = required_metadata(body)?;

        let id = self.store.insert(file_url, metadata).await?;
        info!("Saved document {}", id);
        Ok(id)
    }

    /// Fetch one record. `Ok(None)` means no record has that id.
    pub async fn fetch_record(&self, id: i64) -> Result<Option<DocumentRecord>, IntakeError> {
        validate_id(id)?;
        self.store.get_by_id(id).await
    }

    /// Replace the metadata of record `id` with `body.metadata`.
    ///
    /// Updating an id that does not exist changes nothing and is not an error.
    pub async fn update_record(&self, id: i64, body: &Value) -> Result<(), IntakeError> {
        validate_id(id)?;
        let body = body
            .as_object()
            .ok_or_else(|| IntakeError::InvalidArgument("Invalid data format".into()))?;
        let metadata = required_metadata(body)?;

        if self.store.update_metadata(id, metadata).await? {
            info!("Updated document {}", id);
        }
        Ok(())
    }
}

fn validate_id(id: i64) -> Result<(), IntakeError> {
    if id < 1 {
        return Err(IntakeError::InvalidArgument("Invalid document ID".into()));
    }
    Ok(())
}

fn required_metadata(body: &Metadata) -> Result<&Metadata, IntakeError> {
    match body.get("metadata") {
        Some(Value::Object(metadata)) if !metadata.is_empty() => Ok(metadata),
        _ => Err(IntakeError::InvalidArgument(
            "Missing or invalid metadata".into(),
        )),
    }
}
