//! # pdf-intake
//!
//! Document intake API: accept uploaded PDFs, extract structured metadata with
//! a language model, and store, search and edit the resulting records.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (name, bytes)
//!  │
//!  ├─ 1. Name      sanitise, require .pdf, pick a free file name
//!  ├─ 2. Persist   write the bytes into the upload folder
//!  ├─ 3. Text      PDF → plain text (pdf-extract, spawn_blocking)
//!  ├─ 4. LLM       one chat-completion call → JSON metadata
//!  │               (failure in 3 or 4 deletes the file from step 2)
//!  └─ 5. Output    {metadata, file_url}
//!
//! save ({file_url, metadata}) ──▶ record store (SQLite) ──▶ list / fetch / update
//! ```
//!
//! Upload and save are separate on purpose: the client reviews and edits the
//! extracted metadata before it becomes a record.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_intake::{api, IntakeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IntakeConfig::builder()
//!         .api_key(std::env::var("OPENROUTER_API_KEY")?)
//!         .build()?;
//!     api::serve(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-intake` binary (clap + anyhow + dotenvy + tracing-subscriber) |
//!
//! Disable `cli` when embedding the router in another service:
//! ```toml
//! pdf-intake = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod service;
pub mod store;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{IntakeConfig, IntakeConfigBuilder};
pub use error::{ExtractionError, IntakeError};
pub use output::{DocumentRecord, Metadata, UploadOutcome};
pub use pipeline::llm::{ChatCompletionExtractor, MetadataExtractor};
pub use pipeline::text::{PdfTextExtractor, TextExtractor};
pub use service::RecordService;
pub use store::DocumentStore;
pub use upload::UploadPipeline;
