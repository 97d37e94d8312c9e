//! Image encoding: raw image bytes → base64 `ImageData` for the caption call.
//!
//! VLM APIs (OpenAI, Anthropic, Gemini) accept images as base64 data-URIs
//! embedded in the JSON request body. JPEG and PNG are passed through
//! unchanged; anything else `image` can decode is re-encoded as PNG first.
//! `detail: "high"` asks GPT-4-class models for the full tile budget so
//! small text inside the image survives.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Wrap already-encoded image bytes.
pub fn encode_bytes(bytes: &[u8], mime_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime_type, b64.len());
    ImageData::new(b64, mime_type).with_detail("high")
}

/// Encode a decoded image as base64 PNG.
pub fn encode_png(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(encode_bytes(&buf, "image/png"))
}

/// Best payload for `bytes`: pass-through for formats every provider takes,
/// PNG re-encode for the rest.
pub fn encode_for_caption(bytes: &[u8], img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok(encode_bytes(bytes, "image/png")),
        Ok(ImageFormat::Jpeg) => Ok(encode_bytes(bytes, "image/jpeg")),
        _ => encode_png(img),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_small_image() {
        let data = encode_png(&red_square()).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[..4], b"\x89PNG");
    }

    #[test]
    fn png_bytes_pass_through() {
        let png = STANDARD.decode(encode_png(&red_square()).unwrap().data).unwrap();
        let data = encode_for_caption(&png, &red_square()).unwrap();
        assert_eq!(data.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&data.data).unwrap(), png);
    }
}
