//! Document store: image documents and analysis records addressed by
//! [`DocumentId`].

mod id;
mod model;
mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;

pub use id::{DocumentId, IdScheme};
pub use model::{
    AnalysisRecord, DocumentStatus, ImageDocument, Lease, Prediction, JPEG_CONTENT_TYPE,
};
pub use sqlite::SqliteStore;

pub(crate) use model::{format_timestamp, parse_timestamp};

/// Persistence seam shared by the upload pipeline, the analysis service and
/// the worker.
///
/// Lookups take the raw id as received from a caller; an id the configured
/// scheme rejects yields [`StoreError::MalformedId`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The scheme new ids must be generated with.
    fn id_scheme(&self) -> IdScheme;

    async fn put_image(&self, doc: &ImageDocument) -> Result<(), StoreError>;

    async fn get_image(&self, id: &str) -> Result<Option<ImageDocument>, StoreError>;

    /// Stores the analyzed image and its record atomically.
    async fn put_analysis(
        &self,
        image: &ImageDocument,
        record: &AnalysisRecord,
    ) -> Result<(), StoreError>;

    async fn get_analysis(&self, id: &str) -> Result<Option<AnalysisRecord>, StoreError>;

    /// Documents waiting for analysis, including ones whose claim lease expired.
    async fn list_pending(&self) -> Result<Vec<ImageDocument>, StoreError>;

    /// Takes the processing lease on a document. `None` if someone else holds it.
    async fn claim(&self, id: &DocumentId) -> Result<Option<Lease>, StoreError>;

    /// Puts the document back to `pending`. `false` if the lease expired and
    /// was taken over, in which case the new holder is left alone.
    async fn release(&self, lease: &Lease) -> Result<bool, StoreError>;

    /// Writes the prediction once and marks the document `complete`.
    async fn mark_complete(
        &self,
        id: &DocumentId,
        prediction: &Prediction,
    ) -> Result<bool, StoreError>;
}
