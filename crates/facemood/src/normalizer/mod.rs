//! Turns an inbound submission into a decoded bitmap.
//!
//! Pure: nothing here touches the store or the analyzer.

pub mod data_uri;

use image::DynamicImage;
use serde::Serialize;

use crate::error::NormalizeError;

/// Filename given to images that arrive as a data-URI.
pub const CAPTURED_FILENAME: &str = "captured.jpg";

/// A file part from a multipart form.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Everything a client sent that could carry an image.
#[derive(Debug, Clone, Default)]
pub struct ImageSubmission {
    pub upload: Option<FileUpload>,
    pub data_uri: Option<String>,
}

impl ImageSubmission {
    pub fn from_upload(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            upload: Some(FileUpload {
                filename: filename.into(),
                bytes,
            }),
            data_uri: None,
        }
    }

    pub fn from_data_uri(uri: impl Into<String>) -> Self {
        Self {
            upload: None,
            data_uri: Some(uri.into()),
        }
    }
}

/// Where the accepted image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Upload,
    DataUri,
}

#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub image: DynamicImage,
    pub filename: String,
    pub source: SourceType,
}

/// Picks the image out of a submission and decodes it.
///
/// A named file upload takes precedence over a data-URI. An upload without
/// a filename counts as "nothing selected" unless a data-URI is present.
pub fn normalize(submission: ImageSubmission) -> Result<NormalizedImage, NormalizeError> {
    let ImageSubmission { upload, data_uri } = submission;

    let upload_without_name = matches!(&upload, Some(file) if file.filename.trim().is_empty());

    if let Some(file) = upload.filter(|file| !file.filename.trim().is_empty()) {
        let image = decode(&file.bytes)?;
        return Ok(NormalizedImage {
            image,
            filename: file.filename,
            source: SourceType::Upload,
        });
    }

    if let Some(uri) = data_uri.filter(|uri| !uri.trim().is_empty()) {
        let parsed = data_uri::parse(&uri)?;
        let image = decode(&parsed.payload)?;
        return Ok(NormalizedImage {
            image,
            filename: CAPTURED_FILENAME.to_string(),
            source: SourceType::DataUri,
        });
    }

    if upload_without_name {
        Err(NormalizeError::EmptyFilename)
    } else {
        Err(NormalizeError::Missing)
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, NormalizeError> {
    image::load_from_memory(bytes).map_err(|e| NormalizeError::InvalidImage(e.to_string()))
}
