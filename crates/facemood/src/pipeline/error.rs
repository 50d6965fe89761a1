use thiserror::Error;

use crate::error::{AnalyzeError, NormalizeError, StoreError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Normalize(#[from] NormalizeError),

    #[error("Failed to encode JPEG: {0}")]
    Encode(String),

    #[error("Uploaded image is {size} bytes, exceeding the {limit} byte limit, and cannot be stored")]
    TooLarge { size: u64, limit: u64 },

    #[error("No faces detected")]
    NoFaceDetected,

    #[error("Analysis failed: {0}")]
    Analyzer(#[from] AnalyzeError),

    #[error("Storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline task failed: {0}")]
    Task(String),
}
