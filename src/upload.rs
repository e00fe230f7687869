//! The upload pipeline: raw upload → stored file + extracted metadata.
//!
//! ```text
//! name ──▶ sanitise ──▶ .pdf? ──▶ reserve free slot ──▶ write bytes
//!                                                          │
//!        file_url ◀── build URL ◀── LLM metadata ◀── PDF text
//! ```
//!
//! If text or metadata extraction fails, the file written in this request is
//! deleted before the error is returned.
//!
//! Uploading does **not** create a record. The caller gets the metadata and
//! the file URL back and must call the save operation
//! ([`crate::service::RecordService::save_record`]) to keep them. A crash
//! between the two steps leaves the file on disk without a record.

use crate::error::{ExtractionError, IntakeError};
use crate::output::{Metadata, UploadOutcome};
use crate::pipeline::filename::{
    has_allowed_extension, reserve_unique, sanitize_filename, ReservedFile,
};
use crate::pipeline::llm::MetadataExtractor;
use crate::pipeline::text::TextExtractor;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Orchestrates one upload from file name and bytes to [`UploadOutcome`].
#[derive(Clone)]
pub struct UploadPipeline {
    text_extractor: Arc<dyn TextExtractor>,
    metadata_extractor: Arc<dyn MetadataExtractor>,
}

impl UploadPipeline {
    pub fn new(
        text_extractor: Arc<dyn TextExtractor>,
        metadata_extractor: Arc<dyn MetadataExtractor>,
    ) -> Self {
        Self {
            text_extractor,
            metadata_extractor,
        }
    }

    /// Run the full pipeline for one uploaded file.
    ///
    /// # Arguments
    /// * `file_name` — name as sent by the client (untrusted)
    /// * `bytes` — file content
    /// * `destination` — upload folder; must exist
    /// * `public_base_url` — externally visible base URL of this service
    ///
    /// # Errors
    /// - [`IntakeError::InvalidArgument`] — nothing is left of the name after sanitising
    /// - [`IntakeError::UnsupportedFileType`] — not a `.pdf` name
    /// - [`IntakeError::FileWriteFailed`] — the file could not be written
    /// - [`IntakeError::MetadataExtractionFailed`] — extraction failed; the
    ///   file has been removed
    pub async fn handle_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
        destination: &Path,
        public_base_url: &str,
    ) -> Result<UploadOutcome, IntakeError> {
        let start = Instant::now();

        // ── Step 1: Sanitise ────────────────────────────────────────────────
        let sanitized = sanitize_filename(file_name)?;

        // ── Step 2: Extension check ─────────────────────────────────────────
        if !has_allowed_extension(&sanitized) {
            warn!("Rejected upload with unsupported type: {}", sanitized);
            return Err(IntakeError::UnsupportedFileType {
                filename: sanitized,
            });
        }

        // ── Step 3: Resolve collisions ──────────────────────────────────────
        let ReservedFile {
            name: stored_name,
            path,
            mut file,
        } = reserve_unique(destination, &sanitized).await?;

        // ── Step 4: Persist bytes ───────────────────────────────────────────
        let written = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;
        drop(file);
        if let Err(source) = written {
            remove_best_effort(&path).await;
            return Err(IntakeError::FileWriteFailed { path, source });
        }
        info!("Stored upload as {} ({} bytes)", path.display(), bytes.len());

        // ── Steps 5–6: Extract text and metadata ────────────────────────────
        let metadata = match self.extract(bytes).await {
            Ok(metadata) => metadata,
            Err(e) => {
                // ── Step 7: Roll back the stored file ───────────────────────
                warn!("Extraction failed for {}: {}", stored_name, e);
                remove_best_effort(&path).await;
                return Err(IntakeError::MetadataExtractionFailed(e));
            }
        };

        // ── Step 8: Build the public URL ────────────────────────────────────
        let file_url = file_url(public_base_url, &stored_name);

        info!(
            "Upload {} processed in {}ms",
            stored_name,
            start.elapsed().as_millis()
        );
        Ok(UploadOutcome { metadata, file_url })
    }

    async fn extract(&self, bytes: &[u8]) -> Result<Metadata, ExtractionError> {
        let text = self.text_extractor.extract_text(bytes).await?;
        debug!("Sending {} chars to metadata extractor", text.len());
        self.metadata_extractor.extract(&text).await
    }
}

/// `base` without trailing slashes, then `/files/`, then `name`.
pub fn file_url(base: &str, name: &str) -> String {
    format!("{}/files/{}", base.trim_end_matches('/'), name)
}

/// Delete `path`, treating an already-missing file as success.
async fn remove_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedText(Result<String, ExtractionError>);

    #[async_trait]
    impl TextExtractor for FixedText {
        async fn extract_text(&self, _bytes: &[u8]) -> Result<String, ExtractionError> {
            self.0.clone()
        }
    }

    struct FixedMetadata {
        result: Result<Metadata, ExtractionError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataExtractor for FixedMetadata {
        async fn extract(&self, _text: &str) -> Result<Metadata, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn title(t: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert("title".into(), json!(t));
        m
    }

    fn pipeline(
        text: Result<String, ExtractionError>,
        metadata: Result<Metadata, ExtractionError>,
    ) -> (UploadPipeline, Arc<FixedMetadata>) {
        let meta = Arc::new(FixedMetadata {
            result: metadata,
            calls: AtomicUsize::new(0),
        });
        let p = UploadPipeline::new(Arc::new(FixedText(text)), meta.clone());
        (p, meta)
    }

    #[tokio::test]
    async fn successful_upload_returns_metadata_and_url() {
        let dir = tempfile::tempdir().unwrap();
        let (p, _) = pipeline(Ok("some extracted text".into()), Ok(title("doc title")));

        let out = p
            .handle_upload("test.pdf", b"%PDF-1.4", dir.path(), "http://localhost/")
            .await
            .unwrap();

        assert_eq!(out.metadata["title"], "doc title");
        assert_eq!(out.file_url, "http://localhost/files/test.pdf");
        assert_eq!(std::fs::read(dir.path().join("test.pdf")).unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn repeated_names_get_numbered() {
        let dir = tempfile::tempdir().unwrap();
        let (p, _) = pipeline(Ok("t".into()), Ok(title("x")));

        let mut urls = Vec::new();
        for _ in 0..3 {
            let out = p
                .handle_upload("name.pdf", b"%PDF", dir.path(), "http://h")
                .await
                .unwrap();
            urls.push(out.file_url);
        }
        assert_eq!(
            urls,
            [
                "http://h/files/name.pdf",
                "http://h/files/name_1.pdf",
                "http://h/files/name_2.pdf"
            ]
        );
    }

    #[tokio::test]
    async fn unsupported_type_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (p, meta) = pipeline(Ok("t".into()), Ok(title("x")));

        let err = p
            .handle_upload("badfile.txt", b"hello", dir.path(), "http://h")
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::UnsupportedFileType { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(meta.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unusable_name_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        let (p, _) = pipeline(Ok("t".into()), Ok(title("x")));
        let err = p
            .handle_upload("///", b"%PDF", dir.path(), "http://h")
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn text_failure_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (p, meta) = pipeline(
            Err(ExtractionError::TextExtraction {
                detail: "fail".into(),
            }),
            Ok(title("x")),
        );

        let err = p
            .handle_upload("fail.pdf", b"content", dir.path(), "http://h")
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Failed to extract metadata"));
        assert!(!dir.path().join("fail.pdf").exists());
        assert_eq!(meta.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn metadata_failure_removes_file_and_keeps_cause() {
        let dir = tempfile::tempdir().unwrap();
        let (p, _) = pipeline(
            Ok("t".into()),
            Err(ExtractionError::MalformedResponse {
                detail: "model did not return a JSON object".into(),
            }),
        );

        let err = p
            .handle_upload("fail.pdf", b"content", dir.path(), "http://h")
            .await
            .unwrap_err();

        match &err {
            IntakeError::MetadataExtractionFailed(ExtractionError::MalformedResponse { .. }) => {}
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("model did not return a JSON object"));
        assert!(!dir.path().join("fail.pdf").exists());
    }

    #[tokio::test]
    async fn rollback_leaves_existing_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.pdf"), b"older upload").unwrap();
        let (p, _) = pipeline(
            Err(ExtractionError::TextExtraction {
                detail: "fail".into(),
            }),
            Ok(title("x")),
        );

        p.handle_upload("doc.pdf", b"new", dir.path(), "http://h")
            .await
            .unwrap_err();

        assert_eq!(std::fs::read(dir.path().join("doc.pdf")).unwrap(), b"older upload");
        assert!(!dir.path().join("doc_1.pdf").exists());
    }

    #[test]
    fn file_url_strips_trailing_slashes() {
        assert_eq!(file_url("http://a/", "x.pdf"), "http://a/files/x.pdf");
        assert_eq!(file_url("http://a//", "x.pdf"), "http://a/files/x.pdf");
        assert_eq!(file_url("https://a/api", "x.pdf"), "https://a/api/files/x.pdf");
    }
}
