//! Input resolution: turn a path, URI or HTTP response into bytes plus hints.
//!
//! Every entry point on [`crate::DocumentEngine`] ends up calling the same
//! dispatch loop with a seekable stream and a [`StreamInfo`]. This module
//! does the scheme-specific work in front of that:
//!
//! | Source | Stream | Hints taken from |
//! |--------|--------|------------------|
//! | local path | the opened file | path, file name, extension |
//! | `file:` URI | the opened file | as for a local path |
//! | `data:` URI | decoded payload | media type and `charset=` parameter |
//! | `http(s):` | response body | `Content-Type`, `Content-Disposition`, final URL |

use crate::error::Doc2MdError;
use crate::stream_info::{extension_of, StreamInfo};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use percent_encoding::percent_decode_str;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// What kind of source string the caller handed us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    FileUri,
    DataUri,
    Http,
    Path,
}

/// Classify a source string by its scheme (case-insensitive).
pub fn classify(source: &str) -> SourceKind {
    let lower = source.get(..8).unwrap_or(source).to_ascii_lowercase();
    if lower.starts_with("file:") {
        SourceKind::FileUri
    } else if lower.starts_with("data:") {
        SourceKind::DataUri
    } else if lower.starts_with("http://") || lower.starts_with("https://") {
        SourceKind::Http
    } else {
        SourceKind::Path
    }
}

/// Check that a local path exists and is readable.
pub fn validate_local(path: &Path) -> Result<(), Doc2MdError> {
    if !path.exists() {
        return Err(Doc2MdError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    if path.is_dir() {
        return Err(Doc2MdError::InvalidInput {
            input: path.display().to_string(),
        });
    }
    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Doc2MdError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(Doc2MdError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

// ── file: ────────────────────────────────────────────────────────────────────

/// Local path named by a `file:` URI. Only empty or `localhost` hosts.
pub fn file_uri_to_path(uri: &str) -> Result<PathBuf, Doc2MdError> {
    let url = reqwest::Url::parse(uri).map_err(|e| Doc2MdError::InvalidUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    match url.host_str() {
        None | Some("") | Some("localhost") => {}
        Some(host) => {
            return Err(Doc2MdError::InvalidUri {
                uri: uri.to_string(),
                reason: format!("unsupported host '{host}' in file URI"),
            })
        }
    }
    url.to_file_path().map_err(|_| Doc2MdError::InvalidUri {
        uri: uri.to_string(),
        reason: "not a local file path".to_string(),
    })
}

// ── data: ────────────────────────────────────────────────────────────────────

/// A decoded `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: Option<String>,
    /// Remaining `key=value` parameters, keys lowercased.
    pub attributes: Vec<(String, String)>,
    pub bytes: Vec<u8>,
}

impl DataUri {
    pub fn charset(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == "charset")
            .map(|(_, v)| v.as_str())
    }

    /// Hints carried by the URI header.
    pub fn stream_info(&self) -> StreamInfo {
        StreamInfo {
            mime_type: self.mime_type.clone(),
            charset: self.charset().map(str::to_string),
            ..StreamInfo::default()
        }
    }
}

/// Parse `data:[<media type>][;key=value]*[;base64],<payload>`.
pub fn parse_data_uri(uri: &str) -> Result<DataUri, Doc2MdError> {
    let invalid = |reason: &str| Doc2MdError::InvalidUri {
        uri: truncate_for_error(uri),
        reason: reason.to_string(),
    };

    let rest = uri
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("data:"))
        .map(|_| &uri[5..])
        .ok_or_else(|| invalid("not a data URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing ',' before the payload"))?;

    let mut mime_type = None;
    let mut attributes = Vec::new();
    let mut is_base64 = false;
    for (i, part) in header.split(';').map(str::trim).enumerate() {
        if part.is_empty() {
            continue;
        }
        if part.eq_ignore_ascii_case("base64") {
            is_base64 = true;
        } else if let Some((k, v)) = part.split_once('=') {
            attributes.push((k.trim().to_ascii_lowercase(), v.trim().to_string()));
        } else if i == 0 && part.contains('/') {
            mime_type = Some(part.to_ascii_lowercase());
        }
    }

    let bytes = if is_base64 {
        let raw = percent_decode_str(payload).decode_utf8_lossy();
        let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| invalid(&format!("invalid base64 payload: {e}")))?
    } else {
        percent_decode_str(payload).collect()
    };

    Ok(DataUri {
        mime_type,
        attributes,
        bytes,
    })
}

fn truncate_for_error(uri: &str) -> String {
    const MAX: usize = 64;
    match uri.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &uri[..idx]),
        None => uri.to_string(),
    }
}

// ── http(s): ─────────────────────────────────────────────────────────────────

/// Build the client used when the caller didn't supply one.
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, Doc2MdError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Doc2MdError::Internal(format!("Failed to build HTTP client: {e}")))
}

fn map_reqwest_error(url: &str, timeout_secs: u64, e: reqwest::Error) -> Doc2MdError {
    if e.is_timeout() {
        Doc2MdError::DownloadTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        }
    } else {
        Doc2MdError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// GET `url` with `client`.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<reqwest::Response, Doc2MdError> {
    info!("Downloading: {}", url);
    client
        .get(url)
        .send()
        .await
        .map_err(|e| map_reqwest_error(url, timeout_secs, e))
}

/// Read a response body and the hints its headers carry.
///
/// Non-2xx statuses are an error; the body is not read.
pub async fn read_response(
    response: reqwest::Response,
    timeout_secs: u64,
) -> Result<(Vec<u8>, StreamInfo), Doc2MdError> {
    let url = response.url().to_string();
    if !response.status().is_success() {
        return Err(Doc2MdError::DownloadFailed {
            url,
            reason: format!("HTTP {}", response.status()),
        });
    }

    let (mime_type, charset) = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(parse_content_type)
        .unwrap_or((None, None));

    let filename = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_disposition)
        .or_else(|| filename_from_url(response.url()));

    let info = StreamInfo {
        mime_type,
        charset,
        extension: filename.as_deref().and_then(extension_of),
        filename,
        source_url: Some(url.clone()),
        ..StreamInfo::default()
    };

    let bytes = response
        .bytes()
        .await
        .map_err(|e| map_reqwest_error(&url, timeout_secs, e))?;
    debug!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok((bytes.to_vec(), info))
}

/// `text/html; charset=ISO-8859-1` → (`text/html`, `ISO-8859-1`).
pub fn parse_content_type(value: &str) -> (Option<String>, Option<String>) {
    let mut parts = value.split(';').map(str::trim);
    let mime = parts
        .next()
        .filter(|m| !m.is_empty())
        .map(str::to_ascii_lowercase);
    let charset = parts
        .filter_map(|p| p.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|c| !c.is_empty());
    (mime, charset)
}

/// File name from a `Content-Disposition` header. `filename*=` (RFC 5987)
/// wins over `filename=`.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for part in header_params(value) {
        let Some((key, val)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let val = val.trim();
        if key == "filename*" {
            // charset'lang'percent-encoded
            let encoded = val.splitn(3, '\'').nth(2).unwrap_or(val);
            let decoded = percent_decode_str(encoded).decode_utf8_lossy().into_owned();
            if !decoded.is_empty() {
                return Some(decoded);
            }
        } else if key == "filename" {
            let name = val.trim_matches('"');
            if !name.is_empty() {
                plain = Some(name.to_string());
            }
        }
    }
    plain
}

/// Split a header value on `;` outside double quotes. A backslash escapes the
/// next character inside quotes.
fn header_params(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(value[start..].trim());
    parts
}

fn filename_from_url(url: &reqwest::Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    Some(percent_decode_str(last).decode_utf8_lossy().into_owned())
}
