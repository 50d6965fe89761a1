use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::store::DocumentId;

/// Content type of every canonical image document.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Lifecycle of an image document. Never leaves `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Complete,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "complete" => Ok(DocumentStatus::Complete),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Outcome of analyzing an image: `{"result": ...}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    Result(serde_json::Value),
    Error(String),
}

impl Prediction {
    pub fn is_error(&self) -> bool {
        matches!(self, Prediction::Error(_))
    }
}

/// A stored image with its (optional) prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDocument {
    pub id: DocumentId,
    pub filename: String,
    pub data: Vec<u8>,
    pub content_type: String,
    pub upload_date: DateTime<Utc>,
    pub status: DocumentStatus,
    pub prediction: Option<Prediction>,
}

/// Result of a synchronous analysis request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub analysis_id: DocumentId,
    pub image_id: DocumentId,
    pub results: serde_json::Value,
    pub models: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Proof of a successful claim. Only the holder of the current lease can
/// release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub id: DocumentId,
    pub claimed_at: String,
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}
