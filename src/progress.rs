//! Progress-callback trait for dispatch events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::EngineConfigBuilder::progress_callback`] to watch the
//! engine work through its candidate list: which converters declined the
//! input, which were tried, which failed and which one won.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2md::{ConversionProgressCallback, EngineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     failures: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_attempt_failed(&self, converter: &str, error: &str) {
//!         self.failures.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{converter} failed: {error}");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { failures: AtomicUsize::new(0) });
//! let config = EngineConfig::builder()
//!     .progress_callback(cb as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::stream_info::StreamInfo;
use std::sync::Arc;

/// Called by the dispatch loop as it works through candidates.
///
/// One engine may serve several conversions at once, so implementations
/// must be `Send + Sync`. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once per top-level conversion, after sniffing.
    ///
    /// # Arguments
    /// * `info` — the enriched descriptor that drives candidate ordering
    fn on_conversion_start(&self, info: &StreamInfo) {
        let _ = info;
    }

    /// A candidate's acceptance test said no (or errored).
    fn on_candidate_rejected(&self, converter: &str) {
        let _ = converter;
    }

    /// A candidate accepted and its conversion is about to run.
    fn on_attempt_start(&self, converter: &str) {
        let _ = converter;
    }

    /// A candidate's conversion failed; the loop moves on.
    fn on_attempt_failed(&self, converter: &str, error: &str) {
        let _ = (converter, error);
    }

    /// A candidate succeeded.
    ///
    /// # Arguments
    /// * `converter`    — the winner
    /// * `markdown_len` — byte length of the normalised Markdown
    fn on_conversion_complete(&self, converter: &str, markdown_len: usize) {
        let _ = (converter, markdown_len);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::EngineConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(&StreamInfo::default());
        cb.on_candidate_rejected("PdfConverter");
        cb.on_attempt_start("PlainTextConverter");
        cb.on_attempt_failed("PlainTextConverter", "bad bytes");
        cb.on_conversion_complete("HtmlConverter", 42);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_attempt_start("CsvConverter");
    }
}
