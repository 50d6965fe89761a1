//! Request extractor for image submissions.
//!
//! Accepts `multipart/form-data` (a file part named `image` or `file`, or a
//! text part `captured_image`/`image` carrying a data-URI) and JSON
//! `{"image": "<data-uri>"}`.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};

use crate::normalizer::{FileUpload, ImageSubmission};

use super::error::ApiError;

/// Message returned when the body is neither JSON nor a form.
pub const NOT_JSON: &str = "Request must be JSON";

const FILE_FIELDS: &[&str] = &["image", "file"];
const DATA_URI_FIELDS: &[&str] = &["captured_image", "image"];

/// How the client sent the image; decides the success response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Json,
    Form,
}

#[derive(Debug)]
pub struct ImageUpload {
    pub submission: ImageSubmission,
    pub kind: SubmissionKind,
}

impl<S> FromRequest<S> for ImageUpload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            let submission = read_form(multipart).await?;
            return Ok(Self {
                submission,
                kind: SubmissionKind::Form,
            });
        }

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<serde_json::Value>::from_request(req, state)
                .await
                .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
            let data_uri = body
                .get("image")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            return Ok(Self {
                submission: ImageSubmission {
                    upload: None,
                    data_uri,
                },
                kind: SubmissionKind::Json,
            });
        }

        Err(ApiError::bad_request(NOT_JSON))
    }
}

async fn read_form(mut multipart: Multipart) -> Result<ImageSubmission, ApiError> {
    let mut submission = ImageSubmission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        match file_name {
            Some(filename) if FILE_FIELDS.contains(&name.as_str()) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                if submission.upload.is_none() || !filename.is_empty() {
                    submission.upload = Some(FileUpload {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            None if DATA_URI_FIELDS.contains(&name.as_str()) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                if !text.trim().is_empty() {
                    submission.data_uri = Some(text);
                }
            }
            _ => {
                tracing::debug!("Ignoring form field '{}'", name);
            }
        }
    }

    Ok(submission)
}
