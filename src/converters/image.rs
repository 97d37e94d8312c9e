//! JPEG and PNG images: dimensions plus an optional LLM caption.
//!
//! Without a caption provider the output is just the `ImageSize:` line. With
//! one, the image is sent to the VLM and the answer appended under
//! `# Description:`.

use super::{matches_info, read_all, read_prefix};
use crate::converter::{ConversionContext, DocumentConverter, ReadSeek};
use crate::error::ConverterError;
use crate::output::ConversionResult;
use crate::pipeline::{encode, llm};
use crate::stream_info::StreamInfo;
use ::image::ImageFormat;
use async_trait::async_trait;
use tracing::{debug, info};

const EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];
const MIME_PREFIXES: &[&str] = &["image/jpeg", "image/png"];

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageConverter;

#[async_trait]
impl DocumentConverter for ImageConverter {
    fn name(&self) -> &str {
        "ImageConverter"
    }

    fn claimed_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn accepts(&self, input: &mut dyn ReadSeek, info: &StreamInfo) -> Result<bool, ConverterError> {
        if matches_info(info, EXTENSIONS, MIME_PREFIXES) {
            return Ok(true);
        }
        let magic = read_prefix(input, 16)?;
        Ok(matches!(
            ::image::guess_format(&magic),
            Ok(ImageFormat::Png | ImageFormat::Jpeg)
        ))
    }

    async fn convert(
        &self,
        input: &mut dyn ReadSeek,
        info: &StreamInfo,
        ctx: &ConversionContext<'_>,
    ) -> Result<ConversionResult, ConverterError> {
        let bytes = read_all(input)?;
        let img = ::image::load_from_memory(&bytes)
            .map_err(|e| ConverterError::Malformed(format!("Cannot decode image: {e}")))?;
        debug!("Image: {}x{}", img.width(), img.height());

        let mut markdown = format!("ImageSize: {}x{}\n", img.width(), img.height());

        if let Some(provider) = ctx.llm_provider() {
            let payload = encode::encode_for_caption(&bytes, &img)
                .map_err(|e| ConverterError::Malformed(format!("Cannot re-encode image: {e}")))?;
            info!("Captioning {}", info.filename.as_deref().unwrap_or("image"));
            let caption =
                llm::caption_image(provider, payload, info.filename.as_deref(), ctx.config())
                    .await?;
            if !caption.is_empty() {
                markdown.push_str("\n# Description:\n");
                markdown.push_str(&caption);
                markdown.push('\n');
            }
        }

        Ok(ConversionResult::new(markdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::test_support::{accepts, bare_engine, run};
    use ::image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 128, 255, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn accepts_by_extension_or_magic() {
        assert!(accepts(&ImageConverter, b"", &StreamInfo::new().with_extension(".JPG")));
        assert!(accepts(&ImageConverter, &png(2, 2), &StreamInfo::default()));
        assert!(!accepts(&ImageConverter, b"GIF89a......", &StreamInfo::default()));
    }

    #[tokio::test]
    async fn reports_size_without_caption() {
        let engine = bare_engine();
        let out = run(&ImageConverter, &engine, &png(7, 3), &StreamInfo::default())
            .await
            .unwrap();
        assert_eq!(out.markdown, "ImageSize: 7x3\n");
    }

    #[tokio::test]
    async fn corrupt_image_is_malformed() {
        let engine = bare_engine();
        let info = StreamInfo::new().with_extension(".png");
        let err = run(&ImageConverter, &engine, b"\x89PNG\r\n\x1a\nbroken", &info)
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::Malformed(_)));
    }
}
