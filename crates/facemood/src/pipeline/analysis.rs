use std::sync::Arc;

use chrono::Utc;
use tracing::{info, info_span, Instrument};

use crate::analyzer::Analyzer;
use crate::normalizer::ImageSubmission;
use crate::store::{
    AnalysisRecord, DocumentStatus, DocumentStore, ImageDocument, Prediction, JPEG_CONTENT_TYPE,
};

use super::encode;
use super::PipelineError;

/// Strict variant used by the analysis service: an inconclusive result is an
/// error, and nothing is stored unless a face was found.
pub struct AnalysisPipeline {
    store: Arc<dyn DocumentStore>,
    analyzer: Arc<dyn Analyzer>,
    models: Vec<String>,
    max_image_size: u64,
}

impl AnalysisPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        analyzer: Arc<dyn Analyzer>,
        models: Vec<String>,
        max_image_size: u64,
    ) -> Self {
        Self {
            store,
            analyzer,
            models,
            max_image_size,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn analyze(
        &self,
        submission: ImageSubmission,
    ) -> Result<AnalysisRecord, PipelineError> {
        let span = info_span!("analysis", analyzer = self.analyzer.name());
        async move {
            let limit = self.max_image_size;
            let prepared = tokio::task::spawn_blocking(move || encode::prepare(submission, limit))
                .instrument(info_span!("prepare"))
                .await
                .map_err(|e| PipelineError::Task(e.to_string()))??;

            let analysis = self
                .analyzer
                .analyze(&prepared.jpeg)
                .instrument(info_span!("analyze"))
                .await?;

            if analysis.is_empty() {
                info!("No faces detected in {}", prepared.filename);
                return Err(PipelineError::NoFaceDetected);
            }

            let scheme = self.store.id_scheme();
            let now = Utc::now();
            let results = analysis.into_value();

            let image = ImageDocument {
                id: scheme.generate(),
                filename: prepared.filename,
                data: prepared.jpeg,
                content_type: JPEG_CONTENT_TYPE.to_string(),
                upload_date: now,
                status: DocumentStatus::Complete,
                prediction: Some(Prediction::Result(results.clone())),
            };

            let record = AnalysisRecord {
                analysis_id: scheme.generate(),
                image_id: image.id.clone(),
                results,
                models: self.models.clone(),
                timestamp: now,
            };

            self.store
                .put_analysis(&image, &record)
                .instrument(info_span!("store", analysis_id = %record.analysis_id))
                .await?;

            info!(
                analysis_id = %record.analysis_id,
                image_id = %record.image_id,
                "Analysis stored"
            );

            Ok(record)
        }
        .instrument(span)
        .await
    }
}
