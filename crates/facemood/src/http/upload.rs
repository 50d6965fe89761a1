//! Web app handlers: upload, image download, document metadata.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::{DocumentId, DocumentStatus, ImageDocument, Prediction};

use super::error::ApiError;
use super::extract::{ImageUpload, SubmissionKind};
use super::WebState;

pub const IMAGE_NOT_FOUND: &str = "Image not found";

/// Document metadata without the image bytes.
#[derive(Debug, Serialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
    pub upload_date: DateTime<Utc>,
    pub status: DocumentStatus,
    pub prediction: Option<Prediction>,
}

impl From<ImageDocument> for DocumentView {
    fn from(doc: ImageDocument) -> Self {
        Self {
            size: doc.data.len(),
            id: doc.id,
            filename: doc.filename,
            content_type: doc.content_type,
            upload_date: doc.upload_date,
            status: doc.status,
            prediction: doc.prediction,
        }
    }
}

/// POST / and POST /upload
///
/// JSON clients get the receipt; form posts are redirected to the
/// document page.
pub async fn post_upload(
    State(state): State<WebState>,
    upload: ImageUpload,
) -> Result<Response, ApiError> {
    let receipt = state.pipeline.upload(upload.submission).await?;

    Ok(match upload.kind {
        SubmissionKind::Json => (StatusCode::OK, Json(receipt)).into_response(),
        SubmissionKind::Form => {
            Redirect::to(&format!("/documents/{}", receipt.id)).into_response()
        }
    })
}

/// GET /uploads/{id}
pub async fn get_upload(
    State(state): State<WebState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = find(&state, &id).await?;

    let content_type = HeaderValue::from_str(&doc.content_type)
        .unwrap_or(HeaderValue::from_static("image/jpeg"));
    let disposition = HeaderValue::from_str(&format!(
        "inline; filename=\"{}\"",
        header_safe_filename(&doc.filename)
    ))
    .unwrap_or(HeaderValue::from_static("inline"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        doc.data,
    )
        .into_response())
}

/// GET /documents/{id}
pub async fn get_document(
    State(state): State<WebState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentView>, ApiError> {
    let doc = find(&state, &id).await?;
    Ok(Json(DocumentView::from(doc)))
}

async fn find(state: &WebState, id: &str) -> Result<ImageDocument, ApiError> {
    state
        .pipeline
        .store()
        .get_image(id)
        .await
        .map_err(|e| ApiError::from_lookup(e, IMAGE_NOT_FOUND))?
        .ok_or_else(|| ApiError::not_found(IMAGE_NOT_FOUND))
}

/// Printable ASCII only, no quotes or backslashes.
fn header_safe_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    if cleaned.trim().is_empty() {
        "image.jpg".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_safe_filename() {
        assert_eq!(header_safe_filename("face.jpg"), "face.jpg");
        assert_eq!(header_safe_filename("a\"b\r\n.jpg"), "a_b__.jpg");
        assert_eq!(header_safe_filename("gesicht-ä.jpg"), "gesicht-_.jpg");
        assert_eq!(header_safe_filename(""), "image.jpg");
    }
}
