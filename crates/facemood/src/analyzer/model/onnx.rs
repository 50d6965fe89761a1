//! FER+ style emotion classifier run through ONNX Runtime.
//!
//! Expects a model taking a `[1, 1, 64, 64]` grayscale tensor (0-255) and
//! producing 8 unnormalised scores in [`EMOTION_LABELS`] order.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use crate::analyzer::model::{
    emotion_report, face_region, softmax, FaceModel, FaceReport, EMOTION_LABELS,
};
use crate::analyzer::AnalyzerSettings;
use crate::config::AnalysisAttribute;
use crate::error::AnalyzeError;

const INPUT_SIZE: u32 = 64;

pub struct OnnxFaceModel {
    session: Mutex<Session>,
}

impl OnnxFaceModel {
    pub fn load(model_path: &Path) -> Result<Self, AnalyzeError> {
        let session = Session::builder()
            .map_err(|e| AnalyzeError::Model(format!("Failed to create ONNX session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AnalyzeError::Model(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(1)
            .map_err(|e| AnalyzeError::Model(format!("Failed to set thread count: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| {
                AnalyzeError::Model(format!(
                    "Failed to load ONNX model from {}: {e}",
                    model_path.display()
                ))
            })?;

        log::info!("Loaded face model from {}", model_path.display());

        Ok(Self {
            session: Mutex::new(session),
        })
    }

    fn classify(&self, face: &DynamicImage) -> Result<Vec<f32>, AnalyzeError> {
        let gray = face
            .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
            .to_luma8();
        let size = INPUT_SIZE as usize;
        let input = Array4::from_shape_fn((1, 1, size, size), |(_, _, y, x)| {
            gray.get_pixel(x as u32, y as u32)[0] as f32
        });

        let mut session = self
            .session
            .lock()
            .map_err(|e| AnalyzeError::Model(format!("Failed to lock ONNX session: {e}")))?;

        let tensor = TensorRef::from_array_view(&input)
            .map_err(|e| AnalyzeError::Model(format!("Failed to create input tensor: {e}")))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| AnalyzeError::Model(format!("ONNX inference failed: {e}")))?;

        let (_shape, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AnalyzeError::Model(format!("Failed to extract output tensor: {e}")))?;

        if scores.len() != EMOTION_LABELS.len() {
            return Err(AnalyzeError::Model(format!(
                "Expected {} emotion scores, model produced {}",
                EMOTION_LABELS.len(),
                scores.len()
            )));
        }

        Ok(softmax(scores))
    }
}

impl FaceModel for OnnxFaceModel {
    fn detect(
        &self,
        image: &DynamicImage,
        settings: &AnalyzerSettings,
    ) -> Result<Vec<FaceReport>, AnalyzeError> {
        if !settings.attributes.contains(&AnalysisAttribute::Emotion) {
            return Err(AnalyzeError::Model(
                "emotion model cannot serve the requested attributes".to_string(),
            ));
        }

        let region = face_region(image.width(), image.height(), settings.backend);
        let face = image.crop_imm(region.x, region.y, region.w, region.h);
        let probabilities = self.classify(&face)?;

        Ok(emotion_report(region, &probabilities, settings)
            .into_iter()
            .collect())
    }
}
