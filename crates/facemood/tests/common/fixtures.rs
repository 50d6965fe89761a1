//! Image fixtures and a deterministic face model.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use facemood::analyzer::model::{emotion_report, face_region, FaceModel, FaceReport, EMOTION_LABELS};
use facemood::error::AnalyzeError;
use facemood::normalizer::data_uri;
use facemood::AnalyzerSettings;

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).expect("fixture encodes");
    buf.into_inner()
}

pub fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

pub fn jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(&solid(width, height, color), ImageFormat::Jpeg)
}

pub fn png_data_uri(width: u32, height: u32, color: [u8; 3]) -> String {
    data_uri::encode("image/png", &encode(&solid(width, height, color), ImageFormat::Png))
}

pub fn jpeg_data_uri(width: u32, height: u32, color: [u8; 3]) -> String {
    data_uri::encode("image/jpeg", &jpeg(width, height, color))
}

/// Calls bright faces happy and dark faces sad, with 95% confidence.
pub struct BrightnessModel;

impl BrightnessModel {
    fn probabilities(label: &str) -> Vec<f32> {
        let mut p = vec![0.05 / 7.0; EMOTION_LABELS.len()];
        if let Some(i) = EMOTION_LABELS.iter().position(|l| *l == label) {
            p[i] = 0.95;
        }
        p
    }
}

impl FaceModel for BrightnessModel {
    fn detect(
        &self,
        image: &DynamicImage,
        settings: &AnalyzerSettings,
    ) -> Result<Vec<FaceReport>, AnalyzeError> {
        let luma = image.to_luma8();
        let pixels = luma.as_raw();
        let mean = pixels.iter().map(|&p| p as u64).sum::<u64>() / pixels.len().max(1) as u64;
        let label = if mean > 127 { "happy" } else { "sad" };

        let region = face_region(image.width(), image.height(), settings.backend);
        Ok(emotion_report(region, &Self::probabilities(label), settings)
            .into_iter()
            .collect())
    }
}
