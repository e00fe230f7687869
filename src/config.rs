//! Configuration for the intake service.
//!
//! Every knob lives in [`IntakeConfig`], built via [`IntakeConfigBuilder`].
//! The binary maps CLI flags and environment variables onto the builder; the
//! library and tests construct it directly.

use crate::error::IntakeError;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default chat-completion endpoint (OpenRouter, OpenAI-compatible).
pub const DEFAULT_LLM_API_BASE: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model used for metadata extraction.
pub const DEFAULT_LLM_MODEL: &str = "mistralai/mistral-7b-instruct:free";

/// Environment variable holding the LLM API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Configuration for the intake service.
///
/// # Example
/// ```rust
/// use pdf_intake::IntakeConfig;
///
/// let config = IntakeConfig::builder()
///     .upload_folder("/var/lib/intake/uploads")
///     .database_path("/var/lib/intake/app.db")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_timeout_secs, 30);
/// ```
#[derive(Clone)]
pub struct IntakeConfig {
    /// Folder uploaded PDFs are written to and served from. Default: `uploads`.
    pub upload_folder: PathBuf,

    /// SQLite database file. `:memory:` opens a private in-memory database.
    /// Default: `app.db`.
    pub database_path: PathBuf,

    /// Externally visible base URL used to build `file_url`.
    ///
    /// When `None`, each upload derives it from the request's `Host` header.
    pub public_base_url: Option<String>,

    /// Chat-completion endpoint URL.
    pub llm_api_base: String,

    /// Model identifier sent with every completion request.
    pub llm_model: String,

    /// Bearer token for the LLM endpoint. Extraction fails with a
    /// configuration error while this is `None`.
    pub api_key: Option<String>,

    /// Timeout for a single LLM call in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Maximum accepted request body for `/upload` in bytes. Default: 32 MiB.
    pub max_upload_bytes: usize,

    /// Address the HTTP server binds to. Default: `127.0.0.1:5000`.
    pub bind_addr: SocketAddr,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            upload_folder: PathBuf::from("uploads"),
            database_path: PathBuf::from("app.db"),
            public_base_url: None,
            llm_api_base: DEFAULT_LLM_API_BASE.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            api_key: None,
            api_timeout_secs: 60,
            max_upload_bytes: 32 * 1024 * 1024,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
        }
    }
}

impl fmt::Debug for IntakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntakeConfig")
            .field("upload_folder", &self.upload_folder)
            .field("database_path", &self.database_path)
            .field("public_base_url", &self.public_base_url)
            .field("llm_api_base", &self.llm_api_base)
            .field("llm_model", &self.llm_model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl IntakeConfig {
    /// Create a new builder for `IntakeConfig`.
    pub fn builder() -> IntakeConfigBuilder {
        IntakeConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IntakeConfig`].
#[derive(Debug)]
pub struct IntakeConfigBuilder {
    config: IntakeConfig,
}

impl IntakeConfigBuilder {
    pub fn upload_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.config.upload_folder = folder.into();
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn public_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.public_base_url = Some(url.into());
        self
    }

    pub fn llm_api_base(mut self, url: impl Into<String>) -> Self {
        self.config.llm_api_base = url.into();
        self
    }

    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm_model = model.into();
        self
    }

    /// Set the API key. Empty strings are treated as "not configured".
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IntakeConfig, IntakeError> {
        let c = &self.config;
        if c.upload_folder.as_os_str().is_empty() {
            return Err(IntakeError::InvalidConfig(
                "upload folder must not be empty".into(),
            ));
        }
        if c.database_path.as_os_str().is_empty() {
            return Err(IntakeError::InvalidConfig(
                "database path must not be empty".into(),
            ));
        }
        if !(c.llm_api_base.starts_with("http://") || c.llm_api_base.starts_with("https://")) {
            return Err(IntakeError::InvalidConfig(format!(
                "LLM API base must be an http(s) URL, got '{}'",
                c.llm_api_base
            )));
        }
        if c.llm_model.trim().is_empty() {
            return Err(IntakeError::InvalidConfig("LLM model must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(IntakeError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(IntakeError::InvalidConfig(
                "upload limit must be ≥ 1 byte".into(),
            ));
        }
        if let Some(ref url) = c.public_base_url {
            if url.trim().is_empty() {
                return Err(IntakeError::InvalidConfig(
                    "public base URL must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_development_server() {
        let config = IntakeConfig::default();
        assert_eq!(config.upload_folder, PathBuf::from("uploads"));
        assert_eq!(config.llm_api_base, DEFAULT_LLM_API_BASE);
        assert_eq!(config.bind_addr.port(), 5000);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = IntakeConfig::builder()
            .api_key("sk-or-secret")
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-or-secret"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn blank_api_key_is_unset() {
        let config = IntakeConfig::builder().api_key("   ").build().unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = IntakeConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, IntakeError::InvalidConfig(_)));
    }

    #[test]
    fn non_http_api_base_rejected() {
        let err = IntakeConfig::builder()
            .llm_api_base("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ftp://example.com"));
    }
}
