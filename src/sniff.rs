//! Content sniffing: guess what a stream is from its first bytes.
//!
//! [`sniff`] applies a short list of first-match-wins rules to a ≤512-byte
//! prefix. [`enrich`] folds that guess into the caller's [`StreamInfo`],
//! letting a known extension beat a generic container guess: every `.docx`,
//! `.xlsx` and `.pptx` starts with the `PK` zip signature, and routing them
//! to an archive converter on magic bytes alone would be wrong.
//!
//! Both functions are pure. [`enrich_from_stream`] is the I/O wrapper that
//! reads the prefix and restores the stream position afterwards.

use crate::stream_info::{normalize_extension, extension_of, StreamInfo};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use std::io::{self, Read, Seek, SeekFrom};

/// Bytes inspected by [`sniff`].
pub const SNIFF_PREFIX_LEN: usize = 512;

/// Bytes fed to the charset detector.
pub const CHARSET_SAMPLE_LEN: usize = 4096;

/// Minimum share of printable bytes for the plain-text rule.
const TEXT_RATIO: f64 = 0.8;

/// Mime types too generic to override an extension hint.
const GENERIC_MIME_TYPES: &[&str] = &["application/zip", "application/octet-stream"];

/// Preferred mappings, consulted before `mime_guess` so common types get
/// one stable answer (`mime_guess` lists several extensions for
/// `text/plain`, for instance).
const PREFERRED: &[(&str, &str)] = &[
    (".pdf", "application/pdf"),
    (".zip", "application/zip"),
    (".html", "text/html"),
    (".htm", "text/html"),
    (".json", "application/json"),
    (".jsonl", "application/jsonl"),
    (".txt", "text/plain"),
    (".md", "text/markdown"),
    (".markdown", "text/markdown"),
    (".csv", "text/csv"),
    (".ipynb", "application/x-ipynb+json"),
    (".docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    (".xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    (".pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
    (".epub", "application/epub+zip"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".png", "image/png"),
    (".xml", "application/xml"),
    (".rss", "application/rss+xml"),
    (".bin", "application/octet-stream"),
];

/// Result of [`sniff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffGuess {
    pub mime_type: &'static str,
    pub extension: &'static str,
    pub is_text: bool,
}

impl SniffGuess {
    const fn new(mime_type: &'static str, extension: &'static str, is_text: bool) -> Self {
        Self {
            mime_type,
            extension,
            is_text,
        }
    }
}

/// Guess the content type from a byte prefix.
///
/// Only the first [`SNIFF_PREFIX_LEN`] bytes are considered.
pub fn sniff(prefix: &[u8]) -> Option<SniffGuess> {
    let prefix = &prefix[..prefix.len().min(SNIFF_PREFIX_LEN)];
    if prefix.is_empty() {
        return None;
    }

    if prefix.starts_with(b"%PDF") {
        return Some(SniffGuess::new("application/pdf", ".pdf", false));
    }
    if prefix.starts_with(b"PK") {
        return Some(SniffGuess::new("application/zip", ".zip", false));
    }

    let decoded = String::from_utf8_lossy(prefix);
    if decoded.to_lowercase().contains("<html") {
        return Some(SniffGuess::new("text/html", ".html", true));
    }
    let trimmed = decoded.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(SniffGuess::new("application/json", ".json", true));
    }

    let printable = prefix.iter().filter(|&&b| is_texty_byte(b)).count();
    if printable as f64 / prefix.len() as f64 >= TEXT_RATIO {
        return Some(SniffGuess::new("text/plain", ".txt", true));
    }
    None
}

fn is_texty_byte(b: u8) -> bool {
    matches!(b, 0x20..=0x7E | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

/// Detect the character set of a text sample.
///
/// Order: byte-order mark, then UTF-8 validity, then `chardetng`. Always
/// returns an `encoding_rs` name; UTF-8 when nothing better is known.
pub fn detect_charset(sample: &[u8]) -> String {
    let sample = &sample[..sample.len().min(CHARSET_SAMPLE_LEN)];
    if let Some((encoding, _)) = Encoding::for_bom(sample) {
        return encoding.name().to_string();
    }
    match std::str::from_utf8(sample) {
        Ok(_) => return UTF_8.name().to_string(),
        // A multi-byte sequence cut off by the sample boundary is still UTF-8.
        Err(e) if e.error_len().is_none() => return UTF_8.name().to_string(),
        Err(_) => {}
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    let encoding = detector.guess(None, true);
    // chardetng never answers UTF-16; anything it says is a legacy single- or
    // multi-byte encoding.
    if encoding == UTF_16LE || encoding == UTF_16BE {
        return UTF_8.name().to_string();
    }
    encoding.name().to_string()
}

/// Well-known mime type for a normalised extension.
pub fn mime_for_extension(ext: &str) -> Option<String> {
    let ext = normalize_extension(ext)?;
    if let Some((_, mime)) = PREFERRED.iter().find(|(e, _)| *e == ext) {
        return Some((*mime).to_string());
    }
    mime_guess::from_ext(ext.trim_start_matches('.'))
        .first()
        .map(|m| m.essence_str().to_string())
}

/// Preferred extension for a mime type (parameters ignored).
pub fn extension_for_mime(mime: &str) -> Option<String> {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if essence.is_empty() {
        return None;
    }
    if let Some((ext, _)) = PREFERRED.iter().find(|(_, m)| *m == essence) {
        return Some((*ext).to_string());
    }
    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|exts| exts.first())
        .and_then(|e| normalize_extension(e))
}

/// Mime types whose payload is character data.
pub fn is_text_mime(mime: &str) -> bool {
    let m = mime.to_ascii_lowercase();
    m.starts_with("text/")
        || m.contains("json")
        || m.ends_with("+xml")
        || m == "application/xml"
        || m == "application/markdown"
}

fn is_generic_mime(mime: &str) -> bool {
    GENERIC_MIME_TYPES.contains(&mime)
}

/// Fold a sniffer guess and a detected charset into the caller's hints.
///
/// Fields the caller supplied are never replaced. Among the rest:
/// * a known extension's mime type beats any sniffed mime type, unless the
///   extension only maps to a generic type (`.bin` → octet-stream);
/// * a missing extension is derived from the file name, then from the
///   chosen mime type, then from the guess;
/// * `charset` is only filled in for text content.
pub fn enrich(hint: &StreamInfo, guess: Option<&SniffGuess>, charset: Option<String>) -> StreamInfo {
    let extension = hint
        .extension
        .as_deref()
        .and_then(normalize_extension)
        .or_else(|| hint.filename.as_deref().and_then(extension_of))
        .or_else(|| hint.local_path.as_deref().and_then(extension_of));

    let ext_mime = extension.as_deref().and_then(mime_for_extension);
    let specific_ext_mime = ext_mime.clone().filter(|m| !is_generic_mime(m));

    let mime_type = hint
        .mime_type
        .clone()
        .or(specific_ext_mime)
        .or_else(|| guess.map(|g| g.mime_type.to_string()))
        .or(ext_mime);

    let extension = extension
        .or_else(|| mime_type.as_deref().and_then(extension_for_mime))
        .or_else(|| guess.map(|g| g.extension.to_string()));

    let is_text = guess.is_some_and(|g| g.is_text)
        || mime_type.as_deref().is_some_and(is_text_mime);
    let charset = hint
        .charset
        .clone()
        .or_else(|| if is_text { charset } else { None });

    hint.merge(&StreamInfo {
        mime_type,
        extension,
        charset,
        ..StreamInfo::default()
    })
}

/// Sniff a seekable stream and enrich `hint` with the result.
///
/// Reads at most [`CHARSET_SAMPLE_LEN`] bytes and seeks back to the
/// position the stream had on entry, so the caller's view is unchanged.
pub fn enrich_from_stream<R: Read + Seek + ?Sized>(
    input: &mut R,
    hint: &StreamInfo,
) -> io::Result<StreamInfo> {
    let start = input.stream_position()?;
    let sample = read_up_to(input, CHARSET_SAMPLE_LEN);
    input.seek(SeekFrom::Start(start))?;
    let sample = sample?;

    let guess = sniff(&sample);
    let charset = if hint.charset.is_none() {
        Some(detect_charset(&sample))
    } else {
        None
    };
    Ok(enrich(hint, guess.as_ref(), charset))
}

fn read_up_to<R: Read + ?Sized>(input: &mut R, limit: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(limit);
    input.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
