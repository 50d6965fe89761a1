//! Facial attribute analysis behind one trait.
//!
//! [`RemoteAnalyzer`] posts images to the analysis service over HTTP;
//! [`LocalAnalyzer`] runs a [`FaceModel`] in-process.

pub mod local;
pub mod model;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{AnalysisAttribute, DetectorBackend, Settings};
use crate::error::AnalyzeError;

pub use local::LocalAnalyzer;
pub use model::{FaceModel, FaceRegion, FaceReport};
pub use remote::RemoteAnalyzer;

/// Raw analyzer output, stored and returned as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Analysis(pub serde_json::Value);

impl Analysis {
    /// The inconclusive result: no face found.
    pub fn empty() -> Self {
        Analysis(serde_json::Value::Array(Vec::new()))
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => true,
            serde_json::Value::Array(items) => items.is_empty(),
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn analyze(&self, jpeg: &[u8]) -> Result<Analysis, AnalyzeError>;
}

/// Fixed analysis parameters. Taken from configuration, never from a request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSettings {
    pub attributes: Vec<AnalysisAttribute>,
    pub backend: DetectorBackend,
    pub threshold: f32,
    pub enforce_detection: bool,
}

impl AnalyzerSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            attributes: settings.deepface_models.clone(),
            backend: settings.deepface_backend,
            threshold: settings.detector_threshold,
            enforce_detection: settings.enforce_detection,
        }
    }

    pub fn model_names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.as_str().to_string()).collect()
    }
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_analysis() {
        assert!(Analysis::empty().is_empty());
        assert!(Analysis(serde_json::Value::Null).is_empty());
        assert!(Analysis(serde_json::json!({})).is_empty());
        assert!(!Analysis(serde_json::json!("No result")).is_empty());
        assert!(!Analysis(serde_json::json!([{"dominant_emotion": "sad"}])).is_empty());
    }

    #[test]
    fn test_settings_from_config() {
        let analyzer_settings = AnalyzerSettings::default();
        assert_eq!(analyzer_settings.model_names(), vec!["age", "gender", "emotion"]);
        assert!(analyzer_settings.enforce_detection);
        assert_eq!(analyzer_settings.backend, DetectorBackend::Opencv);
    }
}
