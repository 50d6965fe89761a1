//! Canonical encoding: RGB, JPEG, bounded size.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::normalizer::{self, ImageSubmission, SourceType};

use super::PipelineError;

/// Quality used for every stored JPEG.
pub const JPEG_QUALITY: u8 = 75;

/// An image ready to be analyzed and stored.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub filename: String,
    pub source: SourceType,
    pub jpeg: Vec<u8>,
}

/// Drops any alpha channel. No compositing against a background.
pub fn flatten(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, PipelineError> {
    let rgb = image.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| PipelineError::Encode(e.to_string()))?;
    Ok(jpeg)
}

/// Normalize, flatten, encode, then enforce `limit` on the encoded size.
///
/// CPU bound; callers run it on the blocking pool.
pub fn prepare(submission: ImageSubmission, limit: u64) -> Result<PreparedImage, PipelineError> {
    let normalized = normalizer::normalize(submission)?;
    let jpeg = encode_jpeg(&flatten(normalized.image))?;

    let size = jpeg.len() as u64;
    if size > limit {
        return Err(PipelineError::TooLarge { size, limit });
    }

    Ok(PreparedImage {
        filename: normalized.filename,
        source: normalized.source,
        jpeg,
    })
}
