use std::sync::Arc;

use crate::config::IntakeConfig;
use crate::error::IntakeError;
use crate::pipeline::llm::ChatCompletionExtractor;
use crate::pipeline::text::PdfTextExtractor;
use crate::service::RecordService;
use crate::store::DocumentStore;
use crate::upload::UploadPipeline;

/// Shared handler state. Cloned per request; everything inside is shared.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IntakeConfig>,
    pub records: RecordService,
    pub pipeline: UploadPipeline,
}

impl AppState {
    pub fn new(config: IntakeConfig, records: RecordService, pipeline: UploadPipeline) -> Self {
        Self {
            config: Arc::new(config),
            records,
            pipeline,
        }
    }

    /// Wire the production collaborators: SQLite store, PDF text extractor
    /// and the chat-completion metadata extractor.
    ///
    /// Creates the upload folder if it is missing.
    pub fn from_config(config: IntakeConfig) -> Result<Self, IntakeError> {
        std::fs::create_dir_all(&config.upload_folder).map_err(|source| {
            IntakeError::FileWriteFailed {
                path: config.upload_folder.clone(),
                source,
            }
        })?;

        let store = DocumentStore::open(&config.database_path)?;
        let pipeline = UploadPipeline::new(
            Arc::new(PdfTextExtractor::new()),
            Arc::new(ChatCompletionExtractor::from_config(&config)?),
        );
        if config.api_key.is_none() {
            tracing::warn!(
                "no LLM API key configured; uploads will fail until {} is set",
                crate::config::API_KEY_ENV
            );
        }

        Ok(Self::new(config, RecordService::new(store), pipeline))
    }
}
