//! Normalizes receipt images before they are sent to the model.

use crate::error::Res;
use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;

const JPEG_QUALITY: u8 = 85;

/// Decodes `bytes` as any supported raster format and re-encodes the image as an RGB JPEG.
/// Transparency is dropped.
pub(crate) fn to_jpeg(bytes: &[u8]) -> Res<Vec<u8>> {
    let format = image::guess_format(bytes).context("The file is not a supported image format")?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .with_context(|| format!("Unable to decode the {format:?} image"))?;
    let rgb = decoded.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .context("Unable to encode the image as JPEG")?;
    Ok(jpeg)
}
