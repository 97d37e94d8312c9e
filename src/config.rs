//! Configuration for a [`crate::DocumentEngine`].
//!
//! Everything the engine or a built-in converter needs from the outside
//! world comes in through [`EngineConfig`]: the HTTP client for URL inputs,
//! the caption provider for images, the path to the pdfium library. Nothing
//! is looked up from the environment at conversion time, so two engines with
//! different configs can run side by side in one process.

use crate::error::Doc2MdError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for document conversion.
///
/// Built via [`EngineConfig::builder()`] or using [`EngineConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doc2md::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .download_timeout_secs(30)
///     .keep_data_uris(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct EngineConfig {
    /// Timeout for `http(s):` inputs in seconds. Default: 120.
    ///
    /// Only used when the engine builds its own client; a caller-supplied
    /// [`EngineConfig::http_client`] keeps its own timeouts.
    pub download_timeout_secs: u64,

    /// HTTP client used for `http(s):` inputs. Default: None (one is built).
    pub http_client: Option<reqwest::Client>,

    /// Keep `data:` URIs in rendered HTML verbatim. Default: false.
    ///
    /// Inline images are routinely hundreds of kilobytes of base64 that an
    /// LLM pipeline has no use for; by default they are cut down to
    /// `data:<mime>;base64...`.
    pub keep_data_uris: bool,

    /// Pre-constructed caption provider. Takes precedence over `llm_provider_name`.
    pub llm_provider: Option<Arc<dyn LLMProvider>>,

    /// Caption provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `llm_provider`, images are not captioned.
    pub llm_provider_name: Option<String>,

    /// Caption model identifier. If None, uses [`DEFAULT_CAPTION_MODEL`].
    pub llm_model: Option<String>,

    /// Custom caption prompt. If None, uses the built-in default.
    pub llm_prompt: Option<String>,

    /// Sampling temperature for captions. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens per caption. Default: 1024.
    pub max_tokens: usize,

    /// Retry attempts on a failed caption call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Password for encrypted PDFs.
    pub pdf_password: Option<String>,

    /// Explicit path to the pdfium shared library. Default: None (system library).
    pub pdfium_library_path: Option<PathBuf>,

    /// How many archive levels may be unpacked recursively. Default: 3.
    pub max_nesting_depth: usize,

    /// Observer for dispatch events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

/// Model used for captions when a provider name is given without a model.
pub const DEFAULT_CAPTION_MODEL: &str = "gpt-4.1-nano";

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: 120,
            http_client: None,
            keep_data_uris: false,
            llm_provider: None,
            llm_provider_name: None,
            llm_model: None,
            llm_prompt: None,
            temperature: 0.1,
            max_tokens: 1024,
            max_retries: 3,
            retry_backoff_ms: 500,
            pdf_password: None,
            pdfium_library_path: None,
            max_nesting_depth: 3,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("http_client", &self.http_client.as_ref().map(|_| "<reqwest::Client>"))
            .field("keep_data_uris", &self.keep_data_uris)
            .field("llm_provider", &self.llm_provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("llm_provider_name", &self.llm_provider_name)
            .field("llm_model", &self.llm_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("pdf_password", &self.pdf_password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("max_nesting_depth", &self.max_nesting_depth)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when images should be sent to a caption provider.
    pub fn captions_enabled(&self) -> bool {
        self.llm_provider.is_some() || self.llm_provider_name.is_some()
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.config.http_client = Some(client);
        self
    }

    pub fn keep_data_uris(mut self, v: bool) -> Self {
        self.config.keep_data_uris = v;
        self
    }

    pub fn llm_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.llm_provider = Some(provider);
        self
    }

    pub fn llm_provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.llm_provider_name = Some(name.into());
        self
    }

    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm_model = Some(model.into());
        self
    }

    pub fn llm_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.llm_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.max_nesting_depth = depth;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, Doc2MdError> {
        let c = &self.config;
        if c.download_timeout_secs == 0 {
            return Err(Doc2MdError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Doc2MdError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if matches!(c.llm_provider_name.as_deref(), Some(n) if n.trim().is_empty()) {
            return Err(Doc2MdError::InvalidConfig(
                "LLM provider name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.download_timeout_secs, 120);
        assert_eq!(c.max_nesting_depth, 3);
        assert!(!c.keep_data_uris);
        assert!(!c.captions_enabled());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = EngineConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = EngineConfig::builder().download_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, Doc2MdError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_blank_provider_name() {
        assert!(EngineConfig::builder().llm_provider_name("  ").build().is_err());
        let c = EngineConfig::builder().llm_provider_name("openai").build().unwrap();
        assert!(c.captions_enabled());
    }

    #[test]
    fn debug_redacts_password() {
        let c = EngineConfig::builder().pdf_password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
