//! Jupyter notebooks.
//!
//! Markdown cells are copied verbatim, code cells are fenced with the
//! kernel language, raw cells are fenced without one. Outputs are not
//! rendered.

use super::{matches_info, read_all, read_prefix};
use crate::converter::{ConversionContext, DocumentConverter, ReadSeek};
use crate::error::ConverterError;
use crate::output::ConversionResult;
use crate::stream_info::StreamInfo;
use async_trait::async_trait;
use serde_json::Value;

const EXTENSIONS: &[&str] = &[".ipynb"];
const MIME_PREFIXES: &[&str] = &["application/x-ipynb"];

/// How far into a generic JSON stream to look for notebook keys.
const PROBE_LEN: usize = 4096;

#[derive(Debug, Default, Clone, Copy)]
pub struct IpynbConverter;

#[async_trait]
impl DocumentConverter for IpynbConverter {
    fn name(&self) -> &str {
        "IpynbConverter"
    }

    fn claimed_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn accepts(&self, input: &mut dyn ReadSeek, info: &StreamInfo) -> Result<bool, ConverterError> {
        if matches_info(info, EXTENSIONS, MIME_PREFIXES) {
            return Ok(true);
        }
        if info.mime_essence() == "application/json" {
            let probe = read_prefix(input, PROBE_LEN)?;
            let probe = String::from_utf8_lossy(&probe);
            return Ok(probe.contains("\"nbformat\"") && probe.contains("\"nbformat_minor\""));
        }
        Ok(false)
    }

    async fn convert(
        &self,
        input: &mut dyn ReadSeek,
        _info: &StreamInfo,
        _ctx: &ConversionContext<'_>,
    ) -> Result<ConversionResult, ConverterError> {
        let bytes = read_all(input)?;
        let notebook: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ConverterError::Malformed(format!("Invalid notebook JSON: {e}")))?;
        notebook_to_markdown(&notebook)
    }
}

fn notebook_to_markdown(notebook: &Value) -> Result<ConversionResult, ConverterError> {
    let cells = notebook
        .get("cells")
        .and_then(Value::as_array)
        .ok_or_else(|| ConverterError::Malformed("Notebook has no 'cells' array".into()))?;

    let metadata = notebook.get("metadata");
    let language = metadata
        .and_then(|m| {
            m.pointer("/kernelspec/language")
                .or_else(|| m.pointer("/language_info/name"))
        })
        .and_then(Value::as_str)
        .unwrap_or("python");

    let mut title = metadata
        .and_then(|m| m.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut parts = Vec::with_capacity(cells.len());
    for cell in cells {
        let source = cell_source(cell);
        match cell.get("cell_type").and_then(Value::as_str) {
            Some("markdown") => {
                if title.is_none() {
                    title = source
                        .lines()
                        .find_map(|l| l.strip_prefix("# "))
                        .map(|t| t.trim().to_string());
                }
                parts.push(source);
            }
            Some("code") => parts.push(format!("```{language}\n{}\n```", source.trim_end())),
            Some("raw") => parts.push(format!("```\n{}\n```", source.trim_end())),
            _ => {}
        }
    }

    let result = ConversionResult::new(parts.join("\n\n"));
    Ok(match title.filter(|t| !t.is_empty()) {
        Some(t) => result.with_title(t),
        None => result,
    })
}

/// `source` is either one string or a list of line strings.
fn cell_source(cell: &Value) -> String {
    match cell.get("source") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(lines)) => lines.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::test_support::{accepts, bare_engine, run};
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "cells": [
                {"cell_type": "markdown", "source": ["# Sales analysis\n", "Loads the data."]},
                {"cell_type": "code", "source": "import pandas as pd\n", "outputs": []},
                {"cell_type": "raw", "source": ["%%raw"]}
            ],
            "metadata": {"kernelspec": {"language": "python", "name": "python3"}},
            "nbformat": 4,
            "nbformat_minor": 5
        })
    }

    #[test]
    fn accepts_by_extension_or_notebook_json() {
        let bytes = serde_json::to_vec(&sample()).unwrap();
        assert!(accepts(&IpynbConverter, b"", &StreamInfo::new().with_extension(".ipynb")));
        let json_info = StreamInfo::new().with_mime_type("application/json");
        assert!(accepts(&IpynbConverter, &bytes, &json_info));
        assert!(!accepts(&IpynbConverter, br#"{"a": 1}"#, &json_info));
    }

    #[tokio::test]
    async fn renders_cells_in_order() {
        let engine = bare_engine();
        let bytes = serde_json::to_vec(&sample()).unwrap();
        let out = run(&IpynbConverter, &engine, &bytes, &StreamInfo::default()).await.unwrap();
        assert_eq!(out.title.as_deref(), Some("Sales analysis"));
        assert_eq!(
            out.markdown,
            "# Sales analysis\nLoads the data.\n\n```python\nimport pandas as pd\n```\n\n```\n%%raw\n```"
        );
    }

    #[test]
    fn metadata_title_wins() {
        let mut nb = sample();
        nb["metadata"]["title"] = json!("From metadata");
        let out = notebook_to_markdown(&nb).unwrap();
        assert_eq!(out.title.as_deref(), Some("From metadata"));
    }

    #[tokio::test]
    async fn not_a_notebook() {
        let engine = bare_engine();
        let err = run(&IpynbConverter, &engine, br#"{"x": []}"#, &StreamInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::Malformed(_)));
    }
}
