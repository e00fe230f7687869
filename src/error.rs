//! Error types for the pdf-intake library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`IntakeError`] — **request-level**: the operation the caller asked for
//!   did not happen (bad argument, unsupported upload, storage failure).
//!   Every public operation returns `Result<_, IntakeError>`, and the HTTP
//!   layer maps each variant onto a status code.
//!
//! * [`ExtractionError`] — **stage-level**: text extraction or the LLM call
//!   failed. The upload pipeline catches it, deletes the file it just wrote,
//!   and re-raises it wrapped in [`IntakeError::MetadataExtractionFailed`].
//!
//! Keeping the extraction failures in their own enum means the rollback path
//! in [`crate::upload`] only triggers on extraction problems, never on a
//! programming error elsewhere in the request.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-intake library.
#[derive(Debug, Error)]
pub enum IntakeError {
    // ── Client errors ─────────────────────────────────────────────────────
    /// A caller-supplied argument failed validation.
    #[error("{0}")]
    InvalidArgument(String),

    /// No record exists with the given id.
    #[error("Document {id} not found")]
    NotFound { id: i64 },

    /// The uploaded file name does not carry a `.pdf` extension.
    #[error("Unsupported file type")]
    UnsupportedFileType { filename: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Text or metadata extraction failed after the file was written.
    /// The file has already been removed when this is returned.
    #[error("Failed to extract metadata: {0}")]
    MetadataExtractionFailed(#[source] ExtractionError),

    /// The uploaded bytes could not be written to the upload folder.
    #[error("Failed to write uploaded file '{path}': {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Storage errors ────────────────────────────────────────────────────
    /// The database rejected or failed a statement.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Metadata could not be serialised to or parsed from its JSON column.
    #[error("Metadata serialisation error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntakeError {
    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IntakeError::InvalidArgument(_)
                | IntakeError::NotFound { .. }
                | IntakeError::UnsupportedFileType { .. }
        )
    }
}

/// A failure of the text or metadata extraction stage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The PDF could not be turned into text.
    #[error("text extraction failed: {detail}")]
    TextExtraction { detail: String },

    /// No API key is configured for the LLM endpoint.
    #[error("LLM provider is not configured: {hint}")]
    ProviderNotConfigured { hint: String },

    /// The LLM endpoint answered with a non-success status, could not be
    /// reached, or did not answer before the timeout.
    #[error("LLM API Error: {detail}")]
    Upstream { status: Option<u16>, detail: String },

    /// The LLM answered, but not with a JSON object.
    #[error("malformed LLM response: {detail}")]
    MalformedResponse { detail: String },
}
