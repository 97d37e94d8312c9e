//! PDF text extraction through pdfium, with layout reconstruction.
//!
//! pdfium hands back one positioned glyph per character. Those go through
//! [`crate::pipeline::layout`] page by page to recover lines and paragraphs.
//! Pages without any positioned glyphs fall back to pdfium's own text
//! extraction.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is not safe
//! to call from async contexts. `tokio::task::spawn_blocking` moves the work
//! onto the blocking pool so Tokio workers don't stall on large documents.

use super::{matches_info, read_all, read_prefix};
use crate::converter::{ConversionContext, DocumentConverter, ReadSeek};
use crate::error::ConverterError;
use crate::output::ConversionResult;
use crate::pipeline::layout::{assemble_pages, Glyph, PageText};
use crate::stream_info::StreamInfo;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

const EXTENSIONS: &[&str] = &[".pdf"];
const MIME_PREFIXES: &[&str] = &["application/pdf", "application/x-pdf"];
const NAME: &str = "PdfConverter";

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfConverter;

#[async_trait]
impl DocumentConverter for PdfConverter {
    fn name(&self) -> &str {
        NAME
    }

    fn claimed_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn accepts(&self, input: &mut dyn ReadSeek, info: &StreamInfo) -> Result<bool, ConverterError> {
        if matches_info(info, EXTENSIONS, MIME_PREFIXES) {
            return Ok(true);
        }
        Ok(read_prefix(input, 5)? == b"%PDF-")
    }

    async fn convert(
        &self,
        input: &mut dyn ReadSeek,
        _info: &StreamInfo,
        ctx: &ConversionContext<'_>,
    ) -> Result<ConversionResult, ConverterError> {
        let bytes = read_all(input)?;
        let library = ctx.config().pdfium_library_path.clone();
        let password = ctx.config().pdf_password.clone();

        let extracted = tokio::task::spawn_blocking(move || {
            extract_blocking(bytes, library, password.as_deref())
        })
        .await
        .map_err(|e| ConverterError::Other(format!("PDF task panicked: {}", e)))??;

        info!("PDF: {} pages", extracted.pages.len());
        let result = ConversionResult::new(assemble_pages(&extracted.pages));
        Ok(match extracted.title {
            Some(t) => result.with_title(t),
            None => result,
        })
    }
}

struct Extracted {
    pages: Vec<PageText>,
    title: Option<String>,
}

fn bind(library: Option<&PathBuf>) -> Result<Pdfium, ConverterError> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    };
    bindings.map(Pdfium::new).map_err(|e| ConverterError::MissingDependency {
        converter: NAME.to_string(),
        dependency: "pdfium".to_string(),
        hint: match library {
            Some(path) => format!("could not load {}: {:?}", path.display(), e),
            None => format!(
                "no system pdfium library ({:?}); pass --pdfium-lib or set pdfium_library_path",
                e
            ),
        },
    })
}

/// Blocking implementation of text extraction.
fn extract_blocking(
    bytes: Vec<u8>,
    library: Option<PathBuf>,
    password: Option<&str>,
) -> Result<Extracted, ConverterError> {
    let pdfium = bind(library.as_ref())?;

    let document = pdfium.load_pdf_from_byte_vec(bytes, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.to_lowercase().contains("password") {
            ConverterError::Malformed(format!(
                "PDF is encrypted and the password is {}: {}",
                if password.is_some() { "wrong" } else { "missing" },
                err_str
            ))
        } else {
            ConverterError::Malformed(format!("Cannot open PDF: {}", err_str))
        }
    })?;

    let title = document
        .metadata()
        .get(PdfDocumentMetadataTagType::Title)
        .map(|t| t.value().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page.text().map_err(|e| {
            ConverterError::Malformed(format!("Cannot read text of page {}: {:?}", idx + 1, e))
        })?;

        let glyphs: Vec<Glyph> = text
            .chars()
            .iter()
            .filter_map(|ch| {
                let s = ch.unicode_string()?;
                if s.trim().is_empty() {
                    return None;
                }
                let rect = ch.loose_bounds().ok()?;
                let glyph = Glyph::new(
                    s,
                    rect.left().value as f64,
                    rect.bottom().value as f64,
                    rect.right().value as f64,
                    rect.top().value as f64,
                );
                glyph.has_geometry().then_some(glyph)
            })
            .collect();

        debug!("Page {}: {} glyphs", idx + 1, glyphs.len());
        pages.push(PageText::new(glyphs, text.all()));
    }

    Ok(Extracted { pages, title })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::converters::test_support::{accepts, run};
    use crate::engine::DocumentEngine;

    #[test]
    fn accepts_pdf() {
        assert!(accepts(&PdfConverter, b"", &StreamInfo::new().with_extension("PDF")));
        assert!(accepts(&PdfConverter, b"%PDF-1.7", &StreamInfo::default()));
        assert!(!accepts(&PdfConverter, b"%!PS", &StreamInfo::default()));
    }

    #[tokio::test]
    async fn unloadable_library_is_missing_dependency() {
        let config = EngineConfig::builder()
            .pdfium_library_path("/nonexistent/libpdfium.so")
            .build()
            .unwrap();
        let engine = DocumentEngine::builder()
            .config(config)
            .enable_builtins(false)
            .build()
            .unwrap();
        let err = run(&PdfConverter, &engine, b"%PDF-1.4\n%%EOF", &StreamInfo::default())
            .await
            .unwrap_err();
        match err {
            ConverterError::MissingDependency { converter, dependency, .. } => {
                assert_eq!(converter, "PdfConverter");
                assert_eq!(dependency, "pdfium");
            }
            other => panic!("expected MissingDependency, got {other:?}"),
        }
    }
}
