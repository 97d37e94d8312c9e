//! HTML → Markdown via `html2md`.
//!
//! The page is parsed with `scraper` first. `<script>`, `<style>` and
//! `<noscript>` elements are detached from the tree, the `<title>` becomes the
//! result title, and only the body is rendered.

use super::{decode_text, matches_info, read_all};
use crate::converter::{ConversionContext, DocumentConverter, ReadSeek};
use crate::error::ConverterError;
use crate::output::ConversionResult;
use crate::stream_info::StreamInfo;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

const EXTENSIONS: &[&str] = &[".html", ".htm"];
const MIME_PREFIXES: &[&str] = &["text/html", "application/xhtml"];

static SEL_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static SEL_BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static SEL_DROPPED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("head, script, style, noscript").unwrap());

static RE_DATA_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data:([A-Za-z0-9.+/-]+);base64,[A-Za-z0-9+/=%]+").unwrap());

/// HTML pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlConverter;

#[async_trait]
impl DocumentConverter for HtmlConverter {
    fn name(&self) -> &str {
        "HtmlConverter"
    }

    fn claimed_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn accepts(&self, _input: &mut dyn ReadSeek, info: &StreamInfo) -> Result<bool, ConverterError> {
        Ok(matches_info(info, EXTENSIONS, MIME_PREFIXES))
    }

    async fn convert(
        &self,
        input: &mut dyn ReadSeek,
        info: &StreamInfo,
        ctx: &ConversionContext<'_>,
    ) -> Result<ConversionResult, ConverterError> {
        let bytes = read_all(input)?;
        let html = decode_text(&bytes, info.charset.as_deref());
        Ok(html_to_markdown(&html, ctx.config().keep_data_uris))
    }
}

/// Render an HTML document. Exposed for converters that embed HTML.
pub fn html_to_markdown(html: &str, keep_data_uris: bool) -> ConversionResult {
    let mut document = Html::parse_document(html);
    let title = extract_title(&document);
    strip_non_content(&mut document);

    let body = document
        .select(&SEL_BODY)
        .next()
        .map(|body| body.inner_html())
        .unwrap_or_else(|| document.root_element().html());

    let mut markdown = html2md::parse_html(&body);
    if markdown.trim().is_empty() {
        debug!("html2md produced nothing; falling back to element text");
        markdown = document
            .root_element()
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
    }
    if !keep_data_uris {
        markdown = truncate_data_uris(&markdown);
    }

    let result = ConversionResult::new(markdown);
    match title {
        Some(t) => result.with_title(t),
        None => result,
    }
}

/// Text of the first `<title>` element, whitespace collapsed.
fn extract_title(document: &Html) -> Option<String> {
    let element = document.select(&SEL_TITLE).next()?;
    let text = element.text().collect::<String>();
    let title = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

fn strip_non_content(document: &mut Html) {
    let ids: Vec<_> = document.select(&SEL_DROPPED).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// `data:image/png;base64,iVBOR…` → `data:image/png;base64...`
fn truncate_data_uris(markdown: &str) -> String {
    RE_DATA_URI
        .replace_all(markdown, "data:$1;base64...")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::converters::test_support::{accepts, bare_engine, run};
    use crate::engine::DocumentEngine;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>  Quarterly
  Report &amp; Notes </title><style>body { color: red }</style></head>
<body>
<h1>Results</h1>
<script>alert("nope")</script>
<p>Revenue grew.</p>
<img src="data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==" alt="chart">
</body></html>"#;

    #[test]
    fn accepts_html_only() {
        assert!(accepts(&HtmlConverter, b"", &StreamInfo::new().with_extension(".htm")));
        assert!(accepts(&HtmlConverter, b"", &StreamInfo::new().with_mime_type("text/html")));
        assert!(!accepts(&HtmlConverter, b"<html>", &StreamInfo::new().with_extension(".txt")));
    }

    fn title_of(html: &str) -> Option<String> {
        extract_title(&Html::parse_document(html))
    }

    #[test]
    fn title_is_collapsed_and_unescaped() {
        assert_eq!(title_of(PAGE).as_deref(), Some("Quarterly Report & Notes"));
        assert_eq!(title_of("<p>no title</p>"), None);
    }

    #[test]
    fn title_decodes_named_and_numeric_entities() {
        assert_eq!(
            title_of("<html><head><title>Caf&eacute; &#8212; Menu</title></head></html>").as_deref(),
            Some("Café — Menu")
        );
    }

    #[test]
    fn title_markup_inside_script_is_ignored() {
        let html = r#"<html><head>
<script>document.write("<title>fake</title>")</script>
<title>Real</title>
</head><body><p>x</p></body></html>"#;
        assert_eq!(title_of(html).as_deref(), Some("Real"));

        let out = html_to_markdown(html, false);
        assert_eq!(out.title.as_deref(), Some("Real"));
        assert!(!out.markdown.contains("fake"));
        assert!(!out.markdown.contains("document.write"));
    }

    #[tokio::test]
    async fn renders_body_without_scripts() {
        let engine = bare_engine();
        let out = run(&HtmlConverter, &engine, PAGE.as_bytes(), &StreamInfo::default())
            .await
            .unwrap();
        assert_eq!(out.title.as_deref(), Some("Quarterly Report & Notes"));
        assert!(out.markdown.contains("Results"));
        assert!(out.markdown.contains("Revenue grew."));
        assert!(!out.markdown.contains("alert"));
        assert!(!out.markdown.contains("color: red"));
        assert!(!out.markdown.contains("iVBOR"));
    }

    #[tokio::test]
    async fn keeps_data_uris_when_asked() {
        let config = EngineConfig::builder().keep_data_uris(true).build().unwrap();
        let engine = DocumentEngine::builder()
            .config(config)
            .enable_builtins(false)
            .build()
            .unwrap();
        let out = run(&HtmlConverter, &engine, PAGE.as_bytes(), &StreamInfo::default())
            .await
            .unwrap();
        assert!(out.markdown.contains("iVBORw0KGgo"));
    }

    #[test]
    fn data_uri_truncation() {
        assert_eq!(
            truncate_data_uris("![x](data:image/jpeg;base64,/9j/4AAQSkZJRg==)"),
            "![x](data:image/jpeg;base64...)"
        );
    }
}
