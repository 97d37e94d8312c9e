//! # edgequake-doc2md
//!
//! Convert documents, byte streams and URLs to Markdown for LLM pipelines.
//!
//! ## Why this crate?
//!
//! RAG and agent pipelines want one text format, and Markdown keeps the
//! structure (headings, tables, lists) that plain text throws away. This
//! crate routes each input to the converter best suited to it, falls back
//! through the others when that fails, and hands back clean Markdown.
//!
//! ## Pipeline Overview
//!
//! ```text
//! path / stream / URI
//!  │
//!  ├─ 1. Input     resolve file:, data:, http(s): or a local path to bytes + hints
//!  ├─ 2. Sniff     magic bytes + charset detection enrich the hints
//!  ├─ 3. Route     registry orders candidates: extension match first, then priority
//!  ├─ 4. Dispatch  first converter that accepts and succeeds wins
//!  └─ 5. Polish    one normalisation pass (line endings, blank lines, trim)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2md::{DocumentEngine, EngineConfig, StreamInfo};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = DocumentEngine::new(EngineConfig::default())?;
//!     let result = engine.convert("report.pdf", &StreamInfo::default()).await?;
//!     println!("{}", result.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Converters
//!
//! Implement [`DocumentConverter`] and register it on the builder. At equal
//! priority the converter registered last is tried first, so a custom
//! converter registered at [`PRIORITY_SPECIFIC_FILE_FORMAT`] overrides the
//! built-in for the same format.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-doc2md = { version = "0.1", default-features = false }
//! ```
//!
//! ## Native Dependencies
//!
//! PDF support binds the pdfium shared library at conversion time. When it
//! cannot be loaded the PDF converter fails like any other converter and
//! the error lists it as a missing dependency; nothing else is affected.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod converter;
pub mod converters;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod registry;
pub mod sniff;
pub mod stream_info;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EngineConfig, EngineConfigBuilder};
pub use convert::{convert, convert_from_bytes, convert_sync, convert_to_file};
pub use converter::{ConversionContext, DocumentConverter, ReadSeek};
pub use engine::{DocumentEngine, DocumentEngineBuilder};
pub use error::{ConverterError, Doc2MdError, FailedAttempt};
pub use output::ConversionResult;
pub use pipeline::layout::{Glyph, PageText};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use registry::{
    ConverterRegistration, ConverterRegistry, PRIORITY_GENERIC_FILE_FORMAT,
    PRIORITY_SPECIFIC_FILE_FORMAT,
};
pub use stream_info::StreamInfo;
