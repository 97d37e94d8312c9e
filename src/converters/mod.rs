//! Built-in format converters.
//!
//! | Converter | Claims | Priority |
//! |-----------|--------|----------|
//! | [`PdfConverter`] | `.pdf` | specific |
//! | [`CsvConverter`] | `.csv` | specific |
//! | [`IpynbConverter`] | `.ipynb` | specific |
//! | [`ImageConverter`] | `.jpg` `.jpeg` `.png` | specific |
//! | [`HtmlConverter`] | `.html` `.htm` | generic |
//! | [`ZipConverter`] | `.zip` | generic |
//! | [`PlainTextConverter`] | `.txt` `.md` `.json` … | generic |
//!
//! Generic converters are registered in reverse order of preference so the
//! later-registered-wins tie-break puts HTML ahead of plain text.

use crate::converter::ReadSeek;
use crate::error::{ConverterError, Doc2MdError};
use crate::registry::{ConverterRegistry, PRIORITY_GENERIC_FILE_FORMAT, PRIORITY_SPECIFIC_FILE_FORMAT};
use crate::stream_info::StreamInfo;
use encoding_rs::{Encoding, UTF_8};
use std::io::Read;
use std::sync::Arc;

pub mod csv;
pub mod html;
pub mod image;
pub mod ipynb;
pub mod pdf;
pub mod plain_text;
pub mod zip;

pub use self::csv::CsvConverter;
pub use self::html::HtmlConverter;
pub use self::image::ImageConverter;
pub use self::ipynb::IpynbConverter;
pub use self::pdf::PdfConverter;
pub use self::plain_text::PlainTextConverter;
pub use self::zip::ZipConverter;

/// Register every built-in converter at its default priority.
pub fn register_builtins(registry: &mut ConverterRegistry) -> Result<(), Doc2MdError> {
    registry.register(Arc::new(PlainTextConverter), PRIORITY_GENERIC_FILE_FORMAT)?;
    registry.register(Arc::new(ZipConverter), PRIORITY_GENERIC_FILE_FORMAT)?;
    registry.register(Arc::new(HtmlConverter), PRIORITY_GENERIC_FILE_FORMAT)?;

    registry.register(Arc::new(ImageConverter), PRIORITY_SPECIFIC_FILE_FORMAT)?;
    registry.register(Arc::new(IpynbConverter), PRIORITY_SPECIFIC_FILE_FORMAT)?;
    registry.register(Arc::new(CsvConverter), PRIORITY_SPECIFIC_FILE_FORMAT)?;
    registry.register(Arc::new(PdfConverter), PRIORITY_SPECIFIC_FILE_FORMAT)?;
    Ok(())
}

// ── Shared helpers ───────────────────────────────────────────────────────────

pub(crate) fn read_all(input: &mut dyn ReadSeek) -> Result<Vec<u8>, ConverterError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Read at most `limit` bytes from the current position.
pub(crate) fn read_prefix(input: &mut dyn ReadSeek, limit: usize) -> Result<Vec<u8>, ConverterError> {
    let mut buf = Vec::with_capacity(limit);
    input.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Decode with the descriptor's charset; UTF-8 when absent or unknown.
/// A BOM, if present, wins over the label.
pub(crate) fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// True if the extension or the mime type matches.
pub(crate) fn matches_info(info: &StreamInfo, extensions: &[&str], mime_prefixes: &[&str]) -> bool {
    let ext = info.extension_or_empty();
    if !ext.is_empty() && extensions.contains(&ext) {
        return true;
    }
    let mime = info.mime_essence();
    !mime.is_empty() && mime_prefixes.iter().any(|p| mime.starts_with(p))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::converter::{ConversionContext, DocumentConverter};
    use crate::engine::DocumentEngine;
    use crate::error::ConverterError;
    use crate::output::ConversionResult;
    use crate::stream_info::StreamInfo;
    use std::io::Cursor;

    pub fn bare_engine() -> DocumentEngine {
        DocumentEngine::builder().enable_builtins(false).build().unwrap()
    }

    pub fn accepts(conv: &dyn DocumentConverter, bytes: &[u8], info: &StreamInfo) -> bool {
        conv.accepts(&mut Cursor::new(bytes.to_vec()), info).unwrap_or(false)
    }

    /// Run one converter directly, outside the dispatch loop.
    pub async fn run(
        conv: &dyn DocumentConverter,
        engine: &DocumentEngine,
        bytes: &[u8],
        info: &StreamInfo,
    ) -> Result<ConversionResult, ConverterError> {
        let ctx = ConversionContext::new(engine, 0);
        conv.convert(&mut Cursor::new(bytes.to_vec()), info, &ctx).await
    }
}
