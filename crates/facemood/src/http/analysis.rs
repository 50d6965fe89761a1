//! Analysis service handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::NormalizeError;
use crate::pipeline::PipelineError;
use crate::store::{AnalysisRecord, DocumentId};

use super::error::ApiError;
use super::extract::ImageUpload;
use super::AnalysisState;

pub const ANALYSIS_NOT_FOUND: &str = "Analysis not found";

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: DocumentId,
    pub results: serde_json::Value,
    pub models: Vec<String>,
}

/// POST / and POST /analyze
pub async fn post_analyze(
    State(state): State<AnalysisState>,
    upload: ImageUpload,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let record = state
        .pipeline
        .analyze(upload.submission)
        .await
        .map_err(analysis_error)?;

    Ok(Json(AnalyzeResponse {
        analysis_id: record.analysis_id,
        results: record.results,
        models: record.models,
    }))
}

/// GET /analysis/{id}
pub async fn get_analysis(
    State(state): State<AnalysisState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisRecord>, ApiError> {
    state
        .pipeline
        .store()
        .get_analysis(&id)
        .await
        .map_err(|e| ApiError::from_lookup(e, ANALYSIS_NOT_FOUND))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(ANALYSIS_NOT_FOUND))
}

/// The analysis service reports input problems with fixed messages.
fn analysis_error(err: PipelineError) -> ApiError {
    match err {
        PipelineError::Normalize(e) => {
            tracing::info!("Analysis request rejected: {}", e);
            ApiError::bad_request(match e {
                NormalizeError::Missing | NormalizeError::EmptyFilename => "No file provided",
                NormalizeError::UnsupportedType(_) => "Unsupported image type",
                NormalizeError::MalformedDataUri | NormalizeError::InvalidBase64(_) => {
                    "Invalid base64 encoding"
                }
                NormalizeError::InvalidImage(_) => "Invalid image format",
            })
        }
        PipelineError::NoFaceDetected => ApiError::bad_request("No faces detected"),
        other => ApiError::from(other),
    }
}
