//! Zip archives: every member is converted through the engine.
//!
//! Members go through the full dispatch loop one nesting level deeper, so a
//! PDF inside a zip is handled by the PDF converter and so on. Members no
//! converter can handle are skipped.

use super::{matches_info, read_all};
use crate::converter::{ConversionContext, DocumentConverter, ReadSeek};
use crate::error::{ConverterError, Doc2MdError};
use crate::output::ConversionResult;
use crate::stream_info::{extension_of, StreamInfo};
use ::zip::ZipArchive;
use async_trait::async_trait;
use std::io::{Cursor, Read};
use tracing::{debug, warn};

const EXTENSIONS: &[&str] = &[".zip"];
const MIME_PREFIXES: &[&str] = &["application/zip", "application/x-zip"];

/// Members larger than this are skipped.
const MAX_MEMBER_SIZE: u64 = 100 * 1024 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct ZipConverter;

#[async_trait]
impl DocumentConverter for ZipConverter {
    fn name(&self) -> &str {
        "ZipConverter"
    }

    fn claimed_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    /// Declared zips only. Office documents, EPUB and JAR share the
    /// container magic and must not be unpacked as plain archives.
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
        let members = extract_members(bytes)?;
        debug!("Zip: {} members", members.len());

        let archive_name = info.filename.as_deref().unwrap_or("archive.zip");
        let mut markdown = format!("Content from the zip file `{archive_name}`:\n\n");

        for member in members {
            let hint = member_hint(&member.name);
            match ctx.convert_nested(member.bytes, hint).await? {
                Ok(result) => {
                    markdown.push_str(&format!("## File: {}\n\n", member.name));
                    markdown.push_str(&result.markdown);
                    markdown.push_str("\n\n");
                }
                Err(Doc2MdError::UnsupportedFormat { .. }) => {
                    debug!("Zip: skipping unsupported member {}", member.name);
                }
                Err(e) => {
                    warn!("Zip: skipping member {}: {}", member.name, e);
                }
            }
        }

        Ok(ConversionResult::new(markdown))
    }
}

struct Member {
    name: String,
    bytes: Vec<u8>,
}

/// Read every file member into memory, in archive order.
fn extract_members(bytes: Vec<u8>) -> Result<Vec<Member>, ConverterError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ConverterError::Malformed(format!("Invalid zip archive: {e}")))?;

    let mut members = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ConverterError::Malformed(format!("Invalid zip entry {i}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        if entry.size() > MAX_MEMBER_SIZE {
            warn!("Zip: skipping {} ({} bytes)", entry.name(), entry.size());
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        members.push(Member {
            name: entry.name().to_string(),
            bytes: data,
        });
    }
    Ok(members)
}

fn member_hint(name: &str) -> StreamInfo {
    let base = name.rsplit('/').next().unwrap_or(name);
    StreamInfo {
        filename: Some(base.to_string()),
        extension: extension_of(name),
        ..StreamInfo::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::test_support::accepts;
    use std::io::Write;
    use ::zip::write::SimpleFileOptions;
    use ::zip::ZipWriter;

    fn archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut w = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in files {
            w.start_file(*name, SimpleFileOptions::default()).unwrap();
            w.write_all(data).unwrap();
        }
        w.finish().unwrap().into_inner()
    }

    #[test]
    fn accepts_declared_zips_only() {
        let bytes = archive(&[("a.txt", b"a")]);
        assert!(accepts(&ZipConverter, b"", &StreamInfo::new().with_extension("zip")));
        assert!(accepts(&ZipConverter, &bytes, &StreamInfo::new().with_mime_type("application/zip")));
        assert!(!accepts(&ZipConverter, &bytes, &StreamInfo::default()));
        assert!(!accepts(
            &ZipConverter,
            &bytes,
            &StreamInfo::new()
                .with_extension(".docx")
                .with_mime_type("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        ));
    }

    #[test]
    fn members_in_archive_order() {
        let bytes = archive(&[("docs/b.txt", b"bee"), ("a.csv", b"x,y")]);
        let members = extract_members(bytes).unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["docs/b.txt", "a.csv"]);
        assert_eq!(members[0].bytes, b"bee");
    }

    #[test]
    fn member_hint_uses_base_name() {
        let hint = member_hint("docs/Report.PDF");
        assert_eq!(hint.filename.as_deref(), Some("Report.PDF"));
        assert_eq!(hint.extension.as_deref(), Some(".pdf"));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            extract_members(b"PK\x03\x04 nope".to_vec()),
            Err(ConverterError::Malformed(_))
        ));
    }
}
