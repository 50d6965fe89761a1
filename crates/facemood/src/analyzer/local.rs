//! In-process analyzer over a [`FaceModel`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::analyzer::model::FaceModel;
use crate::analyzer::{Analysis, Analyzer, AnalyzerSettings};
use crate::error::AnalyzeError;

/// Runs the face model on the blocking pool.
///
/// Detector failures and "no face" both come back as [`Analysis::empty`];
/// only a crashed blocking task is an error.
pub struct LocalAnalyzer {
    model: Arc<dyn FaceModel>,
    settings: Arc<AnalyzerSettings>,
}

impl LocalAnalyzer {
    pub fn new(model: Arc<dyn FaceModel>, settings: AnalyzerSettings) -> Self {
        Self {
            model,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }
}

#[async_trait]
impl Analyzer for LocalAnalyzer {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn analyze(&self, jpeg: &[u8]) -> Result<Analysis, AnalyzeError> {
        let model = Arc::clone(&self.model);
        let settings = Arc::clone(&self.settings);
        let bytes = jpeg.to_vec();

        tokio::task::spawn_blocking(move || {
            let image = match image::load_from_memory(&bytes) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("Analysis failed: image could not be decoded: {}", e);
                    return Analysis::empty();
                }
            };

            match model.detect(&image, &settings) {
                Ok(faces) if faces.is_empty() => Analysis::empty(),
                Ok(faces) => match serde_json::to_value(&faces) {
                    Ok(value) => Analysis(value),
                    Err(e) => {
                        log::error!("Failed to serialize face reports: {}", e);
                        Analysis::empty()
                    }
                },
                Err(e) => {
                    log::warn!("Analysis failed: {}", e);
                    Analysis::empty()
                }
            }
        })
        .await
        .map_err(|e| AnalyzeError::Internal(e.to_string()))
    }
}
