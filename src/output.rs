//! Output type produced by a successful conversion.

use serde::{Deserialize, Serialize};

/// The Markdown rendering of one input.
///
/// Produced by exactly one converter per top-level call. The engine
/// normalises `markdown` (see [`crate::pipeline::postprocess`]) after the
/// winning converter returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub markdown: String,
    /// Document title when the format carries one (HTML `<title>`, PDF metadata, …).
    pub title: Option<String>,
}

impl ConversionResult {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
