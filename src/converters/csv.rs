//! CSV → GFM table. The first record is the header row.

use super::{decode_text, matches_info, read_all};
use crate::converter::{ConversionContext, DocumentConverter, ReadSeek};
use crate::error::ConverterError;
use crate::output::ConversionResult;
use crate::stream_info::StreamInfo;
use async_trait::async_trait;
use tracing::debug;

const EXTENSIONS: &[&str] = &[".csv"];
const MIME_PREFIXES: &[&str] = &["text/csv", "application/csv"];

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvConverter;

#[async_trait]
impl DocumentConverter for CsvConverter {
    fn name(&self) -> &str {
        "CsvConverter"
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
        _ctx: &ConversionContext<'_>,
    ) -> Result<ConversionResult, ConverterError> {
        let bytes = read_all(input)?;
        let text = decode_text(&bytes, info.charset.as_deref());
        let rows = read_records(&text)?;
        debug!("CSV: {} records", rows.len());
        Ok(ConversionResult::new(render_table(rows)))
    }
}

fn read_records(text: &str) -> Result<Vec<Vec<String>>, ConverterError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(text.as_bytes());

    reader
        .records()
        .map(|result| {
            result
                .map(|record| record.iter().map(str::to_string).collect())
                .map_err(|e| ConverterError::Malformed(format!("Failed to read CSV record: {e}")))
        })
        .collect()
}

/// Render rows as a pipe table; short rows are padded to the widest.
pub(crate) fn render_table(mut rows: Vec<Vec<String>>) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }
    for row in rows.iter_mut() {
        row.resize(width, String::new());
    }

    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        out.push_str("| ");
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");
        if i == 0 {
            out.push('|');
            out.push_str(&" --- |".repeat(width));
            out.push('\n');
        }
    }
    out
}

fn escape_cell(cell: &str) -> String {
    cell.trim()
        .replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}
