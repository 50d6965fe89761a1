use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::analyzer::Analyzer;
use crate::config::AnalysisMode;
use crate::normalizer::ImageSubmission;
use crate::store::{
    DocumentId, DocumentStatus, DocumentStore, ImageDocument, Prediction, JPEG_CONTENT_TYPE,
};

use super::encode::{self, PreparedImage};
use super::PipelineError;

/// What the web app reports back after an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReceipt {
    pub id: DocumentId,
    pub filename: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

/// normalize -> JPEG -> size gate -> analyze -> store.
///
/// Analyzer failures do not abort an upload; they are stored as the
/// prediction. Only input errors, the size gate and store failures reject it.
pub struct UploadPipeline {
    store: Arc<dyn DocumentStore>,
    analyzer: Arc<dyn Analyzer>,
    mode: AnalysisMode,
    max_image_size: u64,
}

impl UploadPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        analyzer: Arc<dyn Analyzer>,
        mode: AnalysisMode,
        max_image_size: u64,
    ) -> Self {
        Self {
            store,
            analyzer,
            mode,
            max_image_size,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn upload(&self, submission: ImageSubmission) -> Result<UploadReceipt, PipelineError> {
        let span = info_span!("upload", mode = ?self.mode, analyzer = self.analyzer.name());
        async move {
            let limit = self.max_image_size;
            let prepared = tokio::task::spawn_blocking(move || encode::prepare(submission, limit))
                .instrument(info_span!("prepare"))
                .await
                .map_err(|e| PipelineError::Task(e.to_string()))?
                .inspect_err(|e| debug!("Upload rejected: {}", e))?;

            let (status, prediction) = match self.mode {
                AnalysisMode::Sync => {
                    let prediction = self
                        .predict(&prepared)
                        .instrument(info_span!("analyze"))
                        .await;
                    (DocumentStatus::Complete, Some(prediction))
                }
                AnalysisMode::Queued => (DocumentStatus::Pending, None),
            };

            let source = prepared.source;
            let doc = ImageDocument {
                id: self.store.id_scheme().generate(),
                filename: prepared.filename,
                data: prepared.jpeg,
                content_type: JPEG_CONTENT_TYPE.to_string(),
                upload_date: Utc::now(),
                status,
                prediction,
            };

            self.store
                .put_image(&doc)
                .instrument(info_span!("store", id = %doc.id))
                .await?;

            info!(
                id = %doc.id,
                filename = %doc.filename,
                source = ?source,
                bytes = doc.data.len(),
                status = %doc.status,
                "Image stored"
            );

            Ok(UploadReceipt {
                id: doc.id,
                filename: doc.filename,
                status: doc.status,
                prediction: doc.prediction,
            })
        }
        .instrument(span)
        .await
    }

    async fn predict(&self, prepared: &PreparedImage) -> Prediction {
        match self.analyzer.analyze(&prepared.jpeg).await {
            Ok(analysis) => Prediction::Result(analysis.into_value()),
            Err(e) => {
                warn!("Prediction failed for {}: {}", prepared.filename, e);
                Prediction::Error(e.to_string())
            }
        }
    }
}
