//! In-process face models.
//!
//! The ONNX emotion classifier is compiled with the "onnx" feature flag.
//! When the feature is disabled, a stub model is provided that reports every
//! image as inconclusive.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;

use crate::analyzer::AnalyzerSettings;
use crate::config::DetectorBackend;
use crate::error::AnalyzeError;

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(not(feature = "onnx"))]
pub mod stub;

#[cfg(feature = "onnx")]
pub use onnx::OnnxFaceModel;

#[cfg(not(feature = "onnx"))]
pub use stub::DisabledFaceModel;

/// Emotion labels in classifier output order.
pub const EMOTION_LABELS: [&str; 8] = [
    "neutral", "happy", "surprise", "sad", "angry", "disgust", "fear", "contempt",
];

/// A model that finds faces in a decoded image and describes them.
pub trait FaceModel: Send + Sync {
    fn detect(
        &self,
        image: &DynamicImage,
        settings: &AnalyzerSettings,
    ) -> Result<Vec<FaceReport>, AnalyzeError>;
}

/// Pixel rectangle of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// One analyzed face.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceReport {
    pub region: FaceRegion,
    pub face_confidence: f32,
    pub dominant_emotion: String,
    /// Per-label score in percent.
    pub emotion: BTreeMap<String, f32>,
}

/// Loads the face model configured by `FACE_MODEL_PATH`.
///
/// Without a path (or without the onnx feature) the stub model is used and
/// every analysis comes back inconclusive.
pub fn load_face_model(model_path: Option<&Path>) -> Result<Arc<dyn FaceModel>, AnalyzeError> {
    match model_path {
        #[cfg(feature = "onnx")]
        Some(path) => Ok(Arc::new(OnnxFaceModel::load(path)?)),
        #[cfg(not(feature = "onnx"))]
        Some(path) => Ok(Arc::new(DisabledFaceModel::load(path)?)),
        None => {
            log::warn!("FACE_MODEL_PATH not set; face analysis is disabled");
            Ok(Arc::new(NoModel))
        }
    }
}

/// Stand-in when no model file is configured.
struct NoModel;

impl FaceModel for NoModel {
    fn detect(
        &self,
        _image: &DynamicImage,
        _settings: &AnalyzerSettings,
    ) -> Result<Vec<FaceReport>, AnalyzeError> {
        Err(AnalyzeError::Model("no face model configured".to_string()))
    }
}

/// Region handed to the classifier for a `width` x `height` frame.
pub fn face_region(width: u32, height: u32, backend: DetectorBackend) -> FaceRegion {
    match backend {
        DetectorBackend::Skip => FaceRegion {
            x: 0,
            y: 0,
            w: width,
            h: height,
        },
        DetectorBackend::Opencv => {
            // Centred square covering 80% of the shorter side.
            let side = ((width.min(height) as f32) * 0.8).round().max(1.0) as u32;
            let side = side.min(width).min(height).max(1);
            FaceRegion {
                x: (width.saturating_sub(side)) / 2,
                y: (height.saturating_sub(side)) / 2,
                w: side,
                h: side,
            }
        }
    }
}

pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![0.0; scores.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Builds the report for one face from class probabilities.
///
/// Returns `None` when detection is enforced and the top probability is
/// below the configured threshold.
pub fn emotion_report(
    region: FaceRegion,
    probabilities: &[f32],
    settings: &AnalyzerSettings,
) -> Option<FaceReport> {
    let (best, confidence) = probabilities
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    if settings.enforce_detection && confidence < settings.threshold {
        return None;
    }

    let emotion = EMOTION_LABELS
        .iter()
        .zip(probabilities)
        .map(|(label, p)| (label.to_string(), p * 100.0))
        .collect();

    Some(FaceReport {
        region,
        face_confidence: confidence,
        dominant_emotion: EMOTION_LABELS.get(best).unwrap_or(&"unknown").to_string(),
        emotion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(enforce: bool, threshold: f32) -> AnalyzerSettings {
        AnalyzerSettings {
            enforce_detection: enforce,
            threshold,
            ..AnalyzerSettings::default()
        }
    }

    #[test]
    fn test_face_region_skip_is_full_frame() {
        let region = face_region(640, 480, DetectorBackend::Skip);
        assert_eq!(region, FaceRegion { x: 0, y: 0, w: 640, h: 480 });
    }

    #[test]
    fn test_face_region_center_square() {
        let region = face_region(640, 480, DetectorBackend::Opencv);
        assert_eq!(region.w, 384);
        assert_eq!(region.h, 384);
        assert_eq!(region.x, 128);
        assert_eq!(region.y, 48);
    }

    #[test]
    fn test_face_region_tiny_image() {
        let region = face_region(1, 1, DetectorBackend::Opencv);
        assert_eq!(region, FaceRegion { x: 0, y: 0, w: 1, h: 1 });
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_report_picks_dominant_emotion() {
        let mut probs = vec![0.0; 8];
        probs[1] = 0.95;
        probs[0] = 0.05;
        let region = FaceRegion { x: 0, y: 0, w: 10, h: 10 };

        let report = emotion_report(region, &probs, &settings(true, 0.9)).unwrap();
        assert_eq!(report.dominant_emotion, "happy");
        assert!((report.emotion["happy"] - 95.0).abs() < 1e-3);
    }

    #[test]
    fn test_report_below_threshold() {
        let probs = vec![0.125; 8];
        let region = FaceRegion { x: 0, y: 0, w: 10, h: 10 };

        assert!(emotion_report(region, &probs, &settings(true, 0.9)).is_none());
        assert!(emotion_report(region, &probs, &settings(false, 0.9)).is_some());
    }
}
