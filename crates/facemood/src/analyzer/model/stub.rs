//! Face model used when the "onnx" feature is disabled.

use std::path::Path;

use image::DynamicImage;

use crate::analyzer::model::{FaceModel, FaceReport};
use crate::analyzer::AnalyzerSettings;
use crate::error::AnalyzeError;

/// Fails every detection so the analyzer reports an inconclusive result.
#[derive(Debug, Default)]
pub struct DisabledFaceModel;

impl DisabledFaceModel {
    /// Mirrors the ONNX model constructor; the path is only logged.
    pub fn load(path: &Path) -> Result<Self, AnalyzeError> {
        log::warn!(
            "Face model at {} ignored: built without the onnx feature",
            path.display()
        );
        Ok(Self)
    }
}

impl FaceModel for DisabledFaceModel {
    fn detect(
        &self,
        _image: &DynamicImage,
        _settings: &AnalyzerSettings,
    ) -> Result<Vec<FaceReport>, AnalyzeError> {
        Err(AnalyzeError::Model("onnx feature not enabled".to_string()))
    }
}
