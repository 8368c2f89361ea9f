use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use std::io::Cursor;

/// JPEG quality for all uploaded artifacts (print-quality output)
pub const JPEG_QUALITY: u8 = 95;

/// Asynchronously load an image from bytes using spawn_blocking.
///
/// Image decoding is CPU-intensive, especially for large images.
pub async fn load_image_from_memory_async(bytes: Vec<u8>) -> Result<DynamicImage> {
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes).context("Failed to load image from memory")
    })
    .await
    .context("Failed to spawn blocking task for image loading")?
}

/// Asynchronously encode an image to JPEG bytes using spawn_blocking.
///
/// JPEG encoding is CPU-intensive and can block the async runtime if done
/// synchronously.
pub async fn encode_jpeg_async(img: DynamicImage) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || encode_jpeg_sync(&img))
        .await
        .context("Failed to spawn blocking task for JPEG encoding")?
}

/// Synchronous JPEG encode at the fixed upload quality.
pub fn encode_jpeg_sync(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut jpeg_bytes = Vec::new();
    let mut cursor = Cursor::new(&mut jpeg_bytes);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    // JPEG has no alpha channel
    img.to_rgb8()
        .write_with_encoder(encoder)
        .context("Failed to encode image as JPEG")?;
    Ok(jpeg_bytes)
}

/// Scale contrast by `factor` about the image's mean grayscale value,
/// clamping to [0, 255].
///
/// The pivot is the mean of the ITU-R 601-2 luma over all pixels, so the
/// adjustment is content-dependent: a bright canvas pivots high and its
/// background barely moves. `imageops::contrast` takes a percentage
/// adjustment, not a multiplier, so this is applied by hand.
pub fn boost_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let pixel_count = (img.width() as u64) * (img.height() as u64);
    if pixel_count == 0 {
        return img.clone();
    }

    let luma_sum: u64 = img
        .pixels()
        .map(|p| (299 * p[0] as u64 + 587 * p[1] as u64 + 114 * p[2] as u64) / 1000)
        .sum();
    let pivot = (luma_sum as f32 / pixel_count as f32).round();

    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            let adjusted = (*channel as f32 - pivot) * factor + pivot;
            *channel = adjusted.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
