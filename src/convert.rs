//! One-shot conversion entry points.
//!
//! Each call builds a [`DocumentEngine`] from the given config, converts one
//! input and drops the engine. Build a [`DocumentEngine`] yourself when
//! converting many inputs; it is cheap to share and resolves the caption
//! provider only once.

use crate::config::EngineConfig;
use crate::engine::DocumentEngine;
use crate::error::Doc2MdError;
use crate::output::ConversionResult;
use crate::stream_info::StreamInfo;
use std::path::Path;
use tracing::info;

/// Convert a local path or a `file:`, `data:`, `http:` or `https:` URI.
///
/// # Example
/// ```rust,no_run
/// use edgequake_doc2md::{convert, EngineConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let result = convert("notes/meeting.html", &EngineConfig::default()).await?;
/// println!("{}", result.markdown);
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    input: impl AsRef<str>,
    config: &EngineConfig,
) -> Result<ConversionResult, Doc2MdError> {
    let engine = DocumentEngine::new(config.clone())?;
    engine.convert(input.as_ref(), &StreamInfo::default()).await
}

/// Convert in-memory bytes. `hint` carries whatever the caller knows
/// (extension, mime type, charset).
///
/// # Example
/// ```rust,no_run
/// use edgequake_doc2md::{convert_from_bytes, EngineConfig, StreamInfo};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = b"name,qty\nwidget,3\n";
/// let hint = StreamInfo::new().with_extension(".csv");
/// let result = convert_from_bytes(bytes, &hint, &EngineConfig::default()).await?;
/// assert!(result.markdown.starts_with("| name | qty |"));
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    hint: &StreamInfo,
    config: &EngineConfig,
) -> Result<ConversionResult, Doc2MdError> {
    let engine = DocumentEngine::new(config.clone())?;
    engine.convert_bytes(bytes, hint).await
}

/// Convert and write the Markdown directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &EngineConfig,
) -> Result<ConversionResult, Doc2MdError> {
    let result = convert(input, config).await?;
    write_atomic(output_path.as_ref(), &result.markdown).await?;
    Ok(result)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<str>,
    config: &EngineConfig,
) -> Result<ConversionResult, Doc2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Doc2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

/// Write `contents` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), Doc2MdError> {
    let write_err = |e| Doc2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    info!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out.md");
        write_atomic(&out, "# Hi\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "# Hi\n");
        assert!(!out.with_extension("md.tmp").exists());
    }

    #[test]
    fn convert_sync_reports_missing_file() {
        let err = convert_sync("/no/such/input.txt", &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, Doc2MdError::FileNotFound { .. }));
    }
}
