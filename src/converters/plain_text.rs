//! Plain text, Markdown and JSON: passed through after decoding.

use super::{decode_text, matches_info, read_all};
use crate::converter::{ConversionContext, DocumentConverter, ReadSeek};
use crate::error::ConverterError;
use crate::output::ConversionResult;
use crate::stream_info::StreamInfo;
use async_trait::async_trait;

const EXTENSIONS: &[&str] = &[".txt", ".text", ".md", ".markdown", ".json", ".jsonl"];

const MIME_PREFIXES: &[&str] = &[
    "text/",
    "application/json",
    "application/x-ndjson",
    "application/markdown",
];

/// Anything that decodes as text.
///
/// Accepts every descriptor that carries a charset, which is what makes this
/// the catch-all for unknown text formats. It is registered as generic so
/// any more specific text format (CSV, HTML, notebooks) is tried first.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextConverter;

#[async_trait]
impl DocumentConverter for PlainTextConverter {
    fn name(&self) -> &str {
        "PlainTextConverter"
    }

    fn claimed_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn accepts(&self, _input: &mut dyn ReadSeek, info: &StreamInfo) -> Result<bool, ConverterError> {
        Ok(info.charset.is_some() || matches_info(info, EXTENSIONS, MIME_PREFIXES))
    }

    async fn convert(
        &self,
        input: &mut dyn ReadSeek,
        info: &StreamInfo,
        _ctx: &ConversionContext<'_>,
    ) -> Result<ConversionResult, ConverterError> {
        let bytes = read_all(input)?;
        Ok(ConversionResult::new(decode_text(&bytes, info.charset.as_deref())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::test_support::{accepts, bare_engine, run};

    #[test]
    fn accepts_by_charset_extension_or_mime() {
        let c = PlainTextConverter;
        assert!(accepts(&c, b"", &StreamInfo::new().with_charset("UTF-8")));
        assert!(accepts(&c, b"", &StreamInfo::new().with_extension("md")));
        assert!(accepts(&c, b"", &StreamInfo::new().with_mime_type("application/json")));
        assert!(!accepts(&c, b"", &StreamInfo::new().with_mime_type("application/pdf")));
        assert!(!accepts(&c, b"hello", &StreamInfo::default()));
    }

    #[tokio::test]
    async fn decodes_with_charset() {
        let engine = bare_engine();
        let info = StreamInfo::new().with_charset("windows-1252");
        let out = run(&PlainTextConverter, &engine, b"na\xefve", &info).await.unwrap();
        assert_eq!(out.markdown, "naïve");
        assert!(out.title.is_none());
    }
}
