//! Partially-known metadata about a byte stream.
//!
//! A [`StreamInfo`] starts life as whatever hints the caller has (a path, a
//! `Content-Type` header, an explicit `--extension` flag) and is enriched by
//! [`crate::sniff`] before dispatch. It is a plain value: every enrichment
//! step produces a new one, and [`StreamInfo::merge`] only ever fills or
//! overrides fields, never clears them.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the engine believes about a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// e.g. `application/pdf`
    pub mime_type: Option<String>,
    /// Lowercase and dot-prefixed, e.g. `.pdf`
    pub extension: Option<String>,
    /// `encoding_rs` label, e.g. `UTF-8`
    pub charset: Option<String>,
    pub filename: Option<String>,
    pub local_path: Option<String>,
    pub source_url: Option<String>,
}

impl StreamInfo {
    /// An empty descriptor; equivalent to `StreamInfo::default()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe a local file: path, file name and extension.
    pub fn from_path(path: &Path) -> Self {
        Self {
            local_path: Some(path.to_string_lossy().into_owned()),
            filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            extension: extension_of(&path.to_string_lossy()),
            ..Self::default()
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Accepts `pdf`, `.pdf` or `.PDF`; stored normalised.
    pub fn with_extension(mut self, ext: impl AsRef<str>) -> Self {
        self.extension = normalize_extension(ext.as_ref());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    pub fn with_local_path(mut self, path: impl Into<String>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Combine with a more specific descriptor.
    ///
    /// Every field set in `other` wins; every field `other` leaves unset is
    /// kept from `self`.
    pub fn merge(&self, other: &StreamInfo) -> StreamInfo {
        StreamInfo {
            mime_type: other.mime_type.clone().or_else(|| self.mime_type.clone()),
            extension: other.extension.clone().or_else(|| self.extension.clone()),
            charset: other.charset.clone().or_else(|| self.charset.clone()),
            filename: other.filename.clone().or_else(|| self.filename.clone()),
            local_path: other.local_path.clone().or_else(|| self.local_path.clone()),
            source_url: other.source_url.clone().or_else(|| self.source_url.clone()),
        }
    }

    /// True when no field is known.
    pub fn is_empty(&self) -> bool {
        *self == StreamInfo::default()
    }

    /// Lowercased mime type without parameters, or `""`.
    pub fn mime_essence(&self) -> String {
        self.mime_type
            .as_deref()
            .map(|m| m.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Normalised extension, or `""`.
    pub fn extension_or_empty(&self) -> &str {
        self.extension.as_deref().unwrap_or("")
    }
}

/// Normalise an extension to lowercase with a leading dot; `None` for empty input.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{}", trimmed.to_ascii_lowercase()))
    }
}

/// Extension of the last path segment of a file name, path or URL path.
pub fn extension_of(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match last.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < last.len() => normalize_extension(&last[idx + 1..]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> StreamInfo {
        StreamInfo::new()
            .with_mime_type("text/plain")
            .with_extension("txt")
            .with_charset("UTF-8")
            .with_filename("a.txt")
            .with_local_path("/tmp/a.txt")
            .with_source_url("https://example.org/a.txt")
    }

    #[test]
    fn merge_with_empty_keeps_everything() {
        let a = full();
        assert_eq!(a.merge(&StreamInfo::default()), a);
    }

    #[test]
    fn merge_fills_absent_fields_from_other() {
        let a = StreamInfo::new().with_extension(".pdf");
        let b = StreamInfo::new().with_mime_type("application/pdf").with_charset("UTF-8");
        let m = a.merge(&b);
        assert_eq!(m.extension.as_deref(), Some(".pdf"));
        assert_eq!(m.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(m.charset.as_deref(), Some("UTF-8"));
        assert!(m.filename.is_none());
    }

    #[test]
    fn merge_never_clears_a_known_field() {
        let samples = [
            StreamInfo::default(),
            StreamInfo::new().with_mime_type("x/y"),
            StreamInfo::new().with_extension("md").with_filename("r.md"),
            full(),
        ];
        for a in &samples {
            for b in &samples {
                let m = a.merge(b);
                let pairs = [
                    (&a.mime_type, &b.mime_type, &m.mime_type),
                    (&a.extension, &b.extension, &m.extension),
                    (&a.charset, &b.charset, &m.charset),
                    (&a.filename, &b.filename, &m.filename),
                    (&a.local_path, &b.local_path, &m.local_path),
                    (&a.source_url, &b.source_url, &m.source_url),
                ];
                for (fa, fb, fm) in pairs {
                    if fa.is_some() {
                        assert!(fm.is_some(), "merge cleared a field: {a:?} + {b:?}");
                    }
                    if fa.is_none() && fb.is_some() {
                        assert_eq!(fm, fb);
                    }
                }
            }
        }
    }

    #[test]
    fn extension_normalisation() {
        assert_eq!(normalize_extension("PDF").as_deref(), Some(".pdf"));
        assert_eq!(normalize_extension(".Docx").as_deref(), Some(".docx"));
        assert_eq!(normalize_extension(""), None);
        assert_eq!(normalize_extension("."), None);
    }

    #[test]
    fn extension_of_paths() {
        assert_eq!(extension_of("/a/b/report.PDF").as_deref(), Some(".pdf"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some(".gz"));
        assert_eq!(extension_of(".bashrc"), None);
        assert_eq!(extension_of("Makefile"), None);
        assert_eq!(extension_of("dir.d/noext"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn from_path_fills_name_and_extension() {
        let info = StreamInfo::from_path(Path::new("/data/Slides.PPTX"));
        assert_eq!(info.filename.as_deref(), Some("Slides.PPTX"));
        assert_eq!(info.extension.as_deref(), Some(".pptx"));
        assert_eq!(info.local_path.as_deref(), Some("/data/Slides.PPTX"));
    }
}
