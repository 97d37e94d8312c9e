//! Error types for the edgequake-doc2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Doc2MdError`] — **Fatal**: the conversion call as a whole failed
//!   (bad input path, unreachable URL, no converter accepted the input, or
//!   every converter that accepted it failed). Returned as `Err(Doc2MdError)`
//!   from every `convert*` entry point.
//!
//! * [`ConverterError`] — **Per-candidate**: one converter failed on one
//!   input. The engine records it as a [`FailedAttempt`] and moves on to the
//!   next candidate; it only surfaces to the caller inside
//!   [`Doc2MdError::ConversionFailed`] once every candidate is exhausted.
//!
//! The engine never inspects a `ConverterError` to decide what to do next.
//! A missing native library is one more recorded attempt, exactly like a
//! malformed file.

use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doc2md library.
#[derive(Debug, Error)]
pub enum Doc2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither an existing path nor a supported URI.
    #[error("Invalid input '{input}': not a file path or a file:, data:, http: or https: URI")]
    InvalidInput { input: String },

    /// The URI was recognised but could not be parsed.
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// HTTP URL was syntactically valid but the fetch failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Fetch exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Reading, buffering or seeking the caller's stream failed.
    #[error("Failed to read input stream: {source}")]
    ReadFailed {
        #[source]
        source: std::io::Error,
    },

    // ── Dispatch errors ───────────────────────────────────────────────────
    /// No registered converter accepted the input.
    #[error(
        "Could not convert stream to Markdown: no converter accepted it \
(mime type: {mime_type}, extension: {extension}).\n\
The file type is most likely not supported."
    )]
    UnsupportedFormat {
        mime_type: String,
        extension: String,
    },

    /// At least one converter accepted the input and every one of them failed.
    #[error(
        "File conversion failed after {} attempt(s):\n{}",
        .attempts.len(),
        render_attempts(.attempts)
    )]
    ConversionFailed { attempts: Vec<FailedAttempt> },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured caption provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Doc2MdError {
    /// The recorded attempts when this is a [`Doc2MdError::ConversionFailed`].
    pub fn attempts(&self) -> &[FailedAttempt] {
        match self {
            Doc2MdError::ConversionFailed { attempts } => attempts,
            _ => &[],
        }
    }
}

/// An error raised by a single converter while converting one input.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// A native library or optional collaborator is unavailable.
    #[error("{converter} requires {dependency}, which is not available: {hint}")]
    MissingDependency {
        converter: String,
        dependency: String,
        hint: String,
    },

    /// The input could not be decoded as the format the converter expected.
    #[error("Malformed input: {0}")]
    Malformed(String),

    /// Reading the stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caption provider failed after retries.
    #[error("LLM call failed after {retries} retries: {detail}")]
    Llm { retries: u32, detail: String },

    /// Archive recursion went past `max_nesting_depth`.
    #[error("Nested conversion depth {depth} exceeds the limit of {limit}")]
    NestingTooDeep { depth: usize, limit: usize },

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// One converter that accepted the input and then failed.
#[derive(Debug)]
pub struct FailedAttempt {
    /// The converter's [`crate::converter::DocumentConverter::name`].
    pub converter: String,
    pub error: ConverterError,
}

fn render_attempts(attempts: &[FailedAttempt]) -> String {
    let mut out = String::new();
    for (i, attempt) in attempts.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}: {}", i + 1, attempt.converter, attempt.error);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_failed_lists_every_attempt_in_order() {
        let e = Doc2MdError::ConversionFailed {
            attempts: vec![
                FailedAttempt {
                    converter: "PdfConverter".into(),
                    error: ConverterError::MissingDependency {
                        converter: "PdfConverter".into(),
                        dependency: "libpdfium".into(),
                        hint: "not found".into(),
                    },
                },
                FailedAttempt {
                    converter: "PlainTextConverter".into(),
                    error: ConverterError::Malformed("bad bytes".into()),
                },
            ],
        };
        let msg = e.to_string();
        assert!(msg.contains("2 attempt(s)"), "got: {msg}");
        let pdf = msg.find("1. PdfConverter").expect("first attempt listed");
        let txt = msg.find("2. PlainTextConverter").expect("second attempt listed");
        assert!(pdf < txt);
        assert!(msg.contains("libpdfium"));
        assert_eq!(e.attempts().len(), 2);
    }

    #[test]
    fn unsupported_format_display() {
        let e = Doc2MdError::UnsupportedFormat {
            mime_type: "application/octet-stream".into(),
            extension: ".bin".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains(".bin"));
        assert!(e.attempts().is_empty());
    }

    #[test]
    fn nesting_display() {
        let e = ConverterError::NestingTooDeep { depth: 4, limit: 3 };
        assert!(e.to_string().contains("limit of 3"));
    }
}
