use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacemoodError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Analysis error: {0}")]
    Analyze(#[from] AnalyzeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Unknown analysis attribute '{0}' (expected age, gender, emotion or race)")]
    UnknownAttribute(String),
}

/// Reasons an inbound image is rejected before any analyzer or store call.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("No file selected")]
    Missing,

    #[error("No file selected (empty filename)")]
    EmptyFilename,

    #[error("Invalid image format: {0}")]
    InvalidImage(String),

    #[error("Invalid captured image data: missing ',' separator")]
    MalformedDataUri,

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
}

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Error during prediction: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error during prediction: analyzer responded with HTTP {status}")]
    Status { status: u16, body: String },

    #[error("Error decoding ML response: {0}")]
    Decode(String),

    #[error("Face model error: {0}")]
    Model(String),

    #[error("Analyzer task failed: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Malformed document id '{0}'")]
    MalformedId(String),

    #[error("Document store unavailable: {0}")]
    Unavailable(#[from] crate::db::DatabaseError),

    #[error("Stored document '{id}' is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Store task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Lookups with an id that cannot exist are reported to callers the same
    /// way as lookups of an absent document.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::MalformedId(_))
    }
}

pub type Result<T> = std::result::Result<T, FacemoodError>;
