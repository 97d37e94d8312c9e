//! The conversion engine: entry points and the dispatch loop.
//!
//! Every entry point (path, stream, reader, bytes, URI, HTTP response)
//! resolves its source to a seekable stream plus a [`StreamInfo`] hint and
//! then calls [`DocumentEngine::dispatch`]. Dispatch works as follows:
//!
//! 1. Remember the stream's start offset and sniff it into an enriched
//!    descriptor.
//! 2. Build the list of descriptor guesses: the enriched descriptor, then an
//!    empty one for converters that decide on content alone.
//! 3. For each guess, walk the registry's candidates in order. Rewind, ask
//!    `accepts`; rewind, run `convert`. The first success is normalised and
//!    returned. Failures are recorded and the walk continues.
//! 4. Out of candidates: `ConversionFailed` with every recorded attempt if
//!    anything accepted, `UnsupportedFormat` otherwise.
//!
//! A converter that already failed is not retried under a later guess.

use crate::config::{EngineConfig, DEFAULT_CAPTION_MODEL};
use crate::converter::{ConversionContext, DocumentConverter, ReadSeek};
use crate::converters;
use crate::error::{Doc2MdError, FailedAttempt};
use crate::output::ConversionResult;
use crate::pipeline::input::{self, SourceKind};
use crate::pipeline::postprocess::normalize_markdown;
use crate::registry::ConverterRegistry;
use crate::sniff;
use crate::stream_info::StreamInfo;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::collections::HashSet;
use std::fmt;
use std::io::{Cursor, Read, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Converts documents to Markdown.
///
/// Build one with [`DocumentEngine::new`] or [`DocumentEngine::builder`] and
/// share it; every `convert*` method takes `&self` and the converter set is
/// fixed once built.
///
/// # Example
/// ```rust,no_run
/// use edgequake_doc2md::{DocumentEngine, EngineConfig, StreamInfo};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = DocumentEngine::new(EngineConfig::default())?;
/// let result = engine.convert("report.html", &StreamInfo::default()).await?;
/// println!("{}", result.markdown);
/// # Ok(())
/// # }
/// ```
pub struct DocumentEngine {
    registry: ConverterRegistry,
    config: EngineConfig,
    llm_provider: Option<Arc<dyn LLMProvider>>,
    http: reqwest::Client,
}

impl fmt::Debug for DocumentEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("llm_provider", &self.llm_provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .finish()
    }
}

impl DocumentEngine {
    /// An engine with the built-in converters.
    pub fn new(config: EngineConfig) -> Result<Self, Doc2MdError> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> DocumentEngineBuilder {
        DocumentEngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// The caption provider resolved at build time, if any.
    pub fn llm_provider(&self) -> Option<&Arc<dyn LLMProvider>> {
        self.llm_provider.as_ref()
    }

    // ── Entry points ─────────────────────────────────────────────────────

    /// Convert a local path or a `file:`, `data:`, `http:` or `https:` URI.
    pub async fn convert(
        &self,
        source: &str,
        hint: &StreamInfo,
    ) -> Result<ConversionResult, Doc2MdError> {
        match input::classify(source) {
            SourceKind::Path => self.convert_path(source, hint).await,
            _ => self.convert_uri(source, hint).await,
        }
    }

    /// Convert a local file. `hint` fields override what the path implies.
    pub async fn convert_path(
        &self,
        path: impl AsRef<Path>,
        hint: &StreamInfo,
    ) -> Result<ConversionResult, Doc2MdError> {
        let path = path.as_ref();
        input::validate_local(path)?;
        info!("Converting file: {}", path.display());

        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => Doc2MdError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Doc2MdError::ReadFailed { source: e },
        })?;
        let info = StreamInfo::from_path(path).merge(hint);
        self.dispatch(&mut Cursor::new(bytes), &info, 0).await
    }

    /// Convert a seekable stream from its current position.
    pub async fn convert_stream(
        &self,
        input: &mut dyn ReadSeek,
        hint: &StreamInfo,
    ) -> Result<ConversionResult, Doc2MdError> {
        self.dispatch(input, hint, 0).await
    }

    /// Convert a non-seekable reader. The whole input is buffered first.
    pub async fn convert_reader<R: Read>(
        &self,
        reader: R,
        hint: &StreamInfo,
    ) -> Result<ConversionResult, Doc2MdError> {
        let bytes = buffer_fully(reader)?;
        self.convert_bytes(bytes, hint).await
    }

    /// Convert an in-memory document.
    pub async fn convert_bytes(
        &self,
        bytes: impl Into<Vec<u8>>,
        hint: &StreamInfo,
    ) -> Result<ConversionResult, Doc2MdError> {
        let mut cursor = Cursor::new(bytes.into());
        self.dispatch(&mut cursor, hint, 0).await
    }

    /// Convert a `file:`, `data:`, `http:` or `https:` URI.
    pub async fn convert_uri(
        &self,
        uri: &str,
        hint: &StreamInfo,
    ) -> Result<ConversionResult, Doc2MdError> {
        match input::classify(uri) {
            SourceKind::FileUri => {
                let path = input::file_uri_to_path(uri)?;
                self.convert_path(path, hint).await
            }
            SourceKind::DataUri => {
                let data = input::parse_data_uri(uri)?;
                debug!(
                    "data: URI with {} bytes, mime type {:?}",
                    data.bytes.len(),
                    data.mime_type
                );
                let info = data.stream_info().merge(hint);
                self.convert_bytes(data.bytes, &info).await
            }
            SourceKind::Http => {
                let response =
                    input::fetch(&self.http, uri, self.config.download_timeout_secs).await?;
                self.convert_response(response, hint).await
            }
            SourceKind::Path => Err(Doc2MdError::InvalidUri {
                uri: uri.to_string(),
                reason: "unsupported scheme; expected file:, data:, http: or https:".to_string(),
            }),
        }
    }

    /// Convert the body of an HTTP response the caller already holds.
    pub async fn convert_response(
        &self,
        response: reqwest::Response,
        hint: &StreamInfo,
    ) -> Result<ConversionResult, Doc2MdError> {
        let (bytes, info) =
            input::read_response(response, self.config.download_timeout_secs).await?;
        let info = info.merge(hint);
        self.convert_bytes(bytes, &info).await
    }

    // ── Dispatch ─────────────────────────────────────────────────────────

    /// Try candidates until one succeeds. `depth` is the archive nesting
    /// level; progress events are only reported for the top level.
    pub(crate) async fn dispatch(
        &self,
        input: &mut dyn ReadSeek,
        hint: &StreamInfo,
        depth: usize,
    ) -> Result<ConversionResult, Doc2MdError> {
        let start = input.stream_position().map_err(read_failed)?;
        let enriched = sniff::enrich_from_stream(input, hint).map_err(read_failed)?;
        debug!("Descriptor (depth {}): {:?}", depth, enriched);

        let progress = self.config.progress_callback.as_ref().filter(|_| depth == 0);
        if let Some(cb) = progress {
            cb.on_conversion_start(&enriched);
        }

        let ctx = ConversionContext::new(self, depth);
        let mut attempts: Vec<FailedAttempt> = Vec::new();
        let mut failed: HashSet<usize> = HashSet::new();

        for guess in descriptor_guesses(&enriched) {
            for reg in self.registry.candidates_for(&guess) {
                if failed.contains(&reg.seq) {
                    continue;
                }
                let converter: &dyn DocumentConverter = reg.converter.as_ref();
                let name = converter.name();

                rewind(input, start)?;
                let accepted = match converter.accepts(input, &guess) {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        debug!("{}: acceptance check errored, treating as no: {}", name, e);
                        false
                    }
                };
                if !accepted {
                    debug!("{}: declined", name);
                    if let Some(cb) = progress {
                        cb.on_candidate_rejected(name);
                    }
                    continue;
                }

                rewind(input, start)?;
                if let Some(cb) = progress {
                    cb.on_attempt_start(name);
                }
                match converter.convert(input, &guess, &ctx).await {
                    Ok(result) => {
                        let result = ConversionResult {
                            markdown: normalize_markdown(&result.markdown),
                            title: result
                                .title
                                .map(|t| t.trim().to_string())
                                .filter(|t| !t.is_empty()),
                        };
                        info!("Converted with {} ({} bytes)", name, result.markdown.len());
                        if let Some(cb) = progress {
                            cb.on_conversion_complete(name, result.markdown.len());
                        }
                        return Ok(result);
                    }
                    Err(error) => {
                        warn!("{} failed: {}", name, error);
                        if let Some(cb) = progress {
                            cb.on_attempt_failed(name, &error.to_string());
                        }
                        failed.insert(reg.seq);
                        attempts.push(FailedAttempt {
                            converter: name.to_string(),
                            error,
                        });
                    }
                }
            }
        }

        if attempts.is_empty() {
            Err(Doc2MdError::UnsupportedFormat {
                mime_type: enriched.mime_type.unwrap_or_default(),
                extension: enriched.extension.unwrap_or_default(),
            })
        } else {
            Err(Doc2MdError::ConversionFailed { attempts })
        }
    }
}

/// The enriched descriptor, then an empty one unless they coincide.
fn descriptor_guesses(enriched: &StreamInfo) -> Vec<StreamInfo> {
    let mut guesses = vec![enriched.clone()];
    if !enriched.is_empty() {
        guesses.push(StreamInfo::default());
    }
    guesses
}

fn rewind(input: &mut dyn ReadSeek, start: u64) -> Result<(), Doc2MdError> {
    input.seek(SeekFrom::Start(start)).map_err(read_failed)?;
    Ok(())
}

fn read_failed(source: std::io::Error) -> Doc2MdError {
    Doc2MdError::ReadFailed { source }
}

fn buffer_fully<R: Read>(mut reader: R) -> Result<Vec<u8>, Doc2MdError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(read_failed)?;
    Ok(bytes)
}

// ── Builder ──────────────────────────────────────────────────────────────────

struct PendingRegistration {
    converter: Arc<dyn DocumentConverter>,
    priority: f64,
    extensions: Option<Vec<String>>,
}

/// Builder for [`DocumentEngine`].
///
/// Built-in converters are registered before any added with
/// [`register`](Self::register), so a custom converter at the same priority
/// as a built-in is tried first.
pub struct DocumentEngineBuilder {
    config: EngineConfig,
    enable_builtins: bool,
    custom: Vec<PendingRegistration>,
}

impl Default for DocumentEngineBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            enable_builtins: true,
            custom: Vec::new(),
        }
    }
}

impl fmt::Debug for DocumentEngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentEngineBuilder")
            .field("config", &self.config)
            .field("enable_builtins", &self.enable_builtins)
            .field(
                "custom",
                &self.custom.iter().map(|p| p.converter.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DocumentEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the built-in converters. Default: true.
    pub fn enable_builtins(mut self, enable: bool) -> Self {
        self.enable_builtins = enable;
        self
    }

    /// Add a converter under the extensions it claims itself.
    pub fn register(mut self, converter: Arc<dyn DocumentConverter>, priority: f64) -> Self {
        self.custom.push(PendingRegistration {
            converter,
            priority,
            extensions: None,
        });
        self
    }

    /// Add a converter under an explicit extension list.
    pub fn register_with_extensions<I, S>(
        mut self,
        converter: Arc<dyn DocumentConverter>,
        priority: f64,
        extensions: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom.push(PendingRegistration {
            converter,
            priority,
            extensions: Some(extensions.into_iter().map(Into::into).collect()),
        });
        self
    }

    pub fn build(self) -> Result<DocumentEngine, Doc2MdError> {
        let llm_provider = resolve_provider(&self.config)?;
        let http = match &self.config.http_client {
            Some(client) => client.clone(),
            None => input::build_http_client(self.config.download_timeout_secs)?,
        };

        let mut registry = ConverterRegistry::new();
        if self.enable_builtins {
            converters::register_builtins(&mut registry)?;
        }
        for pending in self.custom {
            match pending.extensions {
                Some(exts) => {
                    registry.register_with_extensions(pending.converter, pending.priority, exts)?
                }
                None => registry.register(pending.converter, pending.priority)?,
            }
        }
        info!(
            "Engine ready: {} converters, captions {}",
            registry.len(),
            if llm_provider.is_some() { "on" } else { "off" }
        );

        Ok(DocumentEngine {
            registry,
            config: self.config,
            llm_provider,
            http,
        })
    }
}

/// Resolve the caption provider once, at build time.
///
/// 1. **Pre-built provider** (`config.llm_provider`) — used as-is.
/// 2. **Named provider** (`config.llm_provider_name`) — created through
///    [`ProviderFactory::create_llm_provider`] with `config.llm_model` or
///    [`DEFAULT_CAPTION_MODEL`].
/// 3. Neither — no captions.
fn resolve_provider(config: &EngineConfig) -> Result<Option<Arc<dyn LLMProvider>>, Doc2MdError> {
    if let Some(ref provider) = config.llm_provider {
        return Ok(Some(Arc::clone(provider)));
    }
    let Some(ref name) = config.llm_provider_name else {
        return Ok(None);
    };
    let model = config.llm_model.as_deref().unwrap_or(DEFAULT_CAPTION_MODEL);
    debug!("Creating caption provider {} / {}", name, model);
    ProviderFactory::create_llm_provider(name, model)
        .map(Some)
        .map_err(|e| Doc2MdError::ProviderNotConfigured {
            provider: name.clone(),
            hint: format!("{e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_end_with_empty_descriptor() {
        let enriched = StreamInfo::new().with_extension(".csv");
        let guesses = descriptor_guesses(&enriched);
        assert_eq!(guesses, vec![enriched, StreamInfo::default()]);
    }

    #[test]
    fn empty_descriptor_is_not_guessed_twice() {
        assert_eq!(descriptor_guesses(&StreamInfo::default()).len(), 1);
    }

    #[test]
    fn builder_without_builtins_is_empty() {
        let engine = DocumentEngine::builder().enable_builtins(false).build().unwrap();
        assert!(engine.registry().is_empty());
        assert!(engine.llm_provider().is_none());
    }

    #[test]
    fn default_engine_has_builtins() {
        let engine = DocumentEngine::new(EngineConfig::default()).unwrap();
        let names: Vec<&str> = engine
            .registry()
            .registrations()
            .iter()
            .map(|r| r.converter.name())
            .collect();
        assert!(names.contains(&"PdfConverter"));
        assert!(names.contains(&"PlainTextConverter"));
    }

    #[tokio::test]
    async fn convert_uri_rejects_plain_paths() {
        let engine = DocumentEngine::builder().enable_builtins(false).build().unwrap();
        let err = engine
            .convert_uri("notes.txt", &StreamInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2MdError::InvalidUri { .. }));
    }

    #[tokio::test]
    async fn missing_file() {
        let engine = DocumentEngine::builder().enable_builtins(false).build().unwrap();
        let err = engine
            .convert("/no/such/file.txt", &StreamInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2MdError::FileNotFound { .. }));
    }
}
