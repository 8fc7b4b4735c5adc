//! Normalize any decodable image to baseline JPEG.

use crate::error::{Error, Result};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;

pub const CANONICAL_MIME: &str = "image/jpeg";
pub const CANONICAL_EXTENSION: &str = "jpg";

const JPEG_QUALITY: u8 = 85;

/// Decode `raw` as any supported image format and re-encode it as JPEG.
///
/// Alpha is dropped. Output is not byte-stable across encoder versions, but
/// always decodes as JPEG.
pub fn transcode(raw: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(raw)
        .map_err(|e| Error::Transcode(format!("input is not a decodable image: {e}")))?;

    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut encoded = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY))
        .map_err(|e| Error::Transcode(format!("jpeg encoding failed: {e}")))?;

    Ok(encoded)
}
