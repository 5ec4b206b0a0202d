//! Conversions between decoded rasters and the encoded forms that cross the
//! process boundary. Everything leaving the pipeline is base64 PNG.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};

use crate::error::CodecError;

pub const PNG_MIME: &str = "image/png";

/// Decodes any supported raster format; the format is sniffed from the bytes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    image::load_from_memory(bytes).map_err(CodecError::Decode)
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(CodecError::Encode)?;
    Ok(buffer.into_inner())
}

pub fn encode(image: &DynamicImage) -> Result<String, CodecError> {
    Ok(BASE64.encode(encode_png(image)?))
}

pub fn to_data_url(image: &DynamicImage) -> Result<String, CodecError> {
    Ok(format!("data:{PNG_MIME};base64,{}", encode(image)?))
}

/// Accepts a bare base64 payload or a `data:<mime>;base64,<payload>` URL.
pub fn decode_base64(payload: &str) -> Result<DynamicImage, CodecError> {
    let trimmed = payload.trim();
    let data = match trimmed.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => trimmed,
    };
    let bytes = BASE64.decode(data.as_bytes())?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;

    fn white_square(size: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(size, size, Rgb([255, 255, 255])))
    }

    #[test]
    fn encode_then_decode_keeps_dimensions() -> anyhow::Result<()> {
        let original = DynamicImage::ImageRgba8(RgbaImage::from_pixel(37, 19, Rgba([10, 20, 30, 255])));
        let encoded = encode(&original)?;
        let decoded = decode_base64(&encoded)?;
        assert_eq!(decoded.dimensions(), (37, 19));
        Ok(())
    }

    #[test]
    fn encode_png_writes_png_signature() -> anyhow::Result<()> {
        let bytes = encode_png(&white_square(4))?;
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        Ok(())
    }

    #[test]
    fn decode_rejects_non_image_bytes() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn decode_base64_accepts_data_urls() -> anyhow::Result<()> {
        let url = to_data_url(&white_square(8))?;
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_base64(&url)?.dimensions(), (8, 8));
        Ok(())
    }

    #[test]
    fn decode_base64_rejects_bad_payload() {
        let err = decode_base64("@@not-base64@@").unwrap_err();
        assert!(matches!(err, CodecError::Base64(_)));
    }

    #[test]
    fn decode_reads_jpeg_uploads() -> anyhow::Result<()> {
        let mut buffer = Cursor::new(Vec::new());
        white_square(16).write_to(&mut buffer, ImageFormat::Jpeg)?;
        assert_eq!(decode(buffer.get_ref())?.dimensions(), (16, 16));
        Ok(())
    }
}
