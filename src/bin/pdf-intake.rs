//! CLI binary for pdf-intake.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `IntakeConfig` and runs the HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use pdf_intake::config::{DEFAULT_LLM_API_BASE, DEFAULT_LLM_MODEL};
use pdf_intake::{api, IntakeConfig};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  POST /upload          multipart field "file" (PDF) → {metadata, file_url}
  GET  /documents       ?page=1&per_page=10&search=  → [{id, metadata, file_url}]
  POST /save            {file_url, metadata}          → {message, id}
  GET  /document/{id}   → {id, metadata, file_url}
  PUT  /document/{id}   {metadata}                    → {message}
  GET  /files/{name}    → stored PDF

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY    API key for the chat-completion endpoint (required for uploads)
  RUST_LOG              Log filter, e.g. pdf_intake=debug,tower_http=info

  A .env file in the working directory is loaded before flags are parsed.
"#;

/// Serve the PDF intake API.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-intake",
    version,
    about = "Upload PDFs, extract metadata with an LLM, and manage the records over HTTP",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "PDF_INTAKE_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Folder uploaded PDFs are stored in and served from.
    #[arg(long, env = "PDF_INTAKE_UPLOAD_FOLDER", default_value = "uploads")]
    upload_folder: PathBuf,

    /// SQLite database file (`:memory:` for a throwaway database).
    #[arg(long, env = "PDF_INTAKE_DATABASE", default_value = "app.db")]
    database: PathBuf,

    /// Public base URL used in returned file URLs. Defaults to the request's Host.
    #[arg(long, env = "PDF_INTAKE_PUBLIC_URL")]
    public_url: Option<String>,

    /// Chat-completion endpoint.
    #[arg(long, env = "PDF_INTAKE_LLM_API_BASE", default_value = DEFAULT_LLM_API_BASE)]
    llm_api_base: String,

    /// Model used for metadata extraction.
    #[arg(long, env = "PDF_INTAKE_LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    model: String,

    /// API key for the chat-completion endpoint.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Timeout for a single LLM call in seconds.
    #[arg(long, env = "PDF_INTAKE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Maximum upload size in bytes.
    #[arg(long, env = "PDF_INTAKE_MAX_UPLOAD_BYTES", default_value_t = 32 * 1024 * 1024)]
    max_upload_bytes: usize,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_INTAKE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_INTAKE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env fallbacks.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli).context("Invalid configuration")?;
    tracing::debug!(?config, "starting");

    // ── Serve ────────────────────────────────────────────────────────────
    api::serve(config).await.context("Server failed")?;
    Ok(())
}

fn build_config(cli: &Cli) -> Result<IntakeConfig> {
    let mut builder = IntakeConfig::builder()
        .bind_addr(cli.bind)
        .upload_folder(&cli.upload_folder)
        .database_path(&cli.database)
        .llm_api_base(&cli.llm_api_base)
        .llm_model(&cli.model)
        .api_timeout_secs(cli.api_timeout)
        .max_upload_bytes(cli.max_upload_bytes);

    if let Some(ref url) = cli.public_url {
        builder = builder.public_base_url(url);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_build_a_valid_config() {
        let cli = Cli::try_parse_from(["pdf-intake"]).unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.upload_folder, PathBuf::from("uploads"));
    }

    #[test]
    fn cli_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "pdf-intake",
            "--bind",
            "0.0.0.0:8080",
            "--public-url",
            "https://docs.example.com",
            "--api-timeout",
            "15",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(
            config.public_base_url.as_deref(),
            Some("https://docs.example.com")
        );
        assert_eq!(config.api_timeout_secs, 15);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cli = Cli::try_parse_from(["pdf-intake", "--api-timeout", "0"]).unwrap();
        assert!(build_config(&cli).is_err());
    }
}
