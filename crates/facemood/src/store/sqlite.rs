//! SQLite implementation of [`DocumentStore`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::db::analysis_repo::{self, AnalysisRow};
use crate::db::image_repo::{self, ImageRow};
use crate::db::Database;
use crate::error::StoreError;
use crate::store::{
    format_timestamp, parse_timestamp, AnalysisRecord, DocumentId, DocumentStatus,
    DocumentStore, IdScheme, ImageDocument, Lease, Prediction,
};

/// Document store backed by the shared [`Database`] handle.
///
/// rusqlite is blocking, so every call is moved onto the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
    scheme: IdScheme,
    lease: chrono::Duration,
}

impl SqliteStore {
    pub fn new(db: Database, scheme: IdScheme, claim_lease: Duration) -> Self {
        let lease = chrono::Duration::from_std(claim_lease)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        Self { db, scheme, lease }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn run<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn lease_cutoff(&self) -> String {
        format_timestamp(&(Utc::now() - self.lease))
    }
}

fn image_to_row(doc: &ImageDocument) -> Result<ImageRow, StoreError> {
    let prediction = doc
        .prediction
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StoreError::Corrupt {
            id: doc.id.to_string(),
            reason: e.to_string(),
        })?;

    Ok(ImageRow {
        id: doc.id.to_string(),
        filename: doc.filename.clone(),
        data: doc.data.clone(),
        content_type: doc.content_type.clone(),
        upload_date: format_timestamp(&doc.upload_date),
        status: doc.status.as_str().to_string(),
        prediction,
        claimed_at: None,
    })
}

fn row_to_image(row: ImageRow) -> Result<ImageDocument, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        id: row.id.clone(),
        reason,
    };

    let upload_date = parse_timestamp(&row.upload_date)
        .map_err(|e| corrupt(format!("bad upload_date: {}", e)))?;
    let status = row.status.parse::<DocumentStatus>().map_err(&corrupt)?;
    let prediction = row
        .prediction
        .as_deref()
        .map(serde_json::from_str::<Prediction>)
        .transpose()
        .map_err(|e| corrupt(format!("bad prediction: {}", e)))?;

    Ok(ImageDocument {
        id: DocumentId::from_stored(row.id),
        filename: row.filename,
        data: row.data,
        content_type: row.content_type,
        upload_date,
        status,
        prediction,
    })
}

fn record_to_row(record: &AnalysisRecord) -> Result<AnalysisRow, StoreError> {
    let corrupt = |e: serde_json::Error| StoreError::Corrupt {
        id: record.analysis_id.to_string(),
        reason: e.to_string(),
    };

    Ok(AnalysisRow {
        analysis_id: record.analysis_id.to_string(),
        image_id: record.image_id.to_string(),
        results: serde_json::to_string(&record.results).map_err(corrupt)?,
        models: serde_json::to_string(&record.models).map_err(corrupt)?,
        timestamp: format_timestamp(&record.timestamp),
    })
}

fn row_to_record(row: AnalysisRow) -> Result<AnalysisRecord, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        id: row.analysis_id.clone(),
        reason,
    };

    let results = serde_json::from_str(&row.results)
        .map_err(|e| corrupt(format!("bad results: {}", e)))?;
    let models = serde_json::from_str(&row.models)
        .map_err(|e| corrupt(format!("bad models: {}", e)))?;
    let timestamp = parse_timestamp(&row.timestamp)
        .map_err(|e| corrupt(format!("bad timestamp: {}", e)))?;

    Ok(AnalysisRecord {
        analysis_id: DocumentId::from_stored(row.analysis_id),
        image_id: DocumentId::from_stored(row.image_id),
        results,
        models,
        timestamp,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn id_scheme(&self) -> IdScheme {
        self.scheme
    }

    async fn put_image(&self, doc: &ImageDocument) -> Result<(), StoreError> {
        let row = image_to_row(doc)?;
        self.run(move |db| Ok(image_repo::insert(db, &row)?)).await
    }

    async fn get_image(&self, id: &str) -> Result<Option<ImageDocument>, StoreError> {
        let id = self.scheme.parse(id)?;
        self.run(move |db| {
            image_repo::find_by_id(db, id.as_str())?
                .map(row_to_image)
                .transpose()
        })
        .await
    }

    async fn put_analysis(
        &self,
        image: &ImageDocument,
        record: &AnalysisRecord,
    ) -> Result<(), StoreError> {
        let image_row = image_to_row(image)?;
        let analysis_row = record_to_row(record)?;
        self.run(move |db| Ok(analysis_repo::insert_with_image(db, &image_row, &analysis_row)?))
            .await
    }

    async fn get_analysis(&self, id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        let id = self.scheme.parse(id)?;
        self.run(move |db| {
            analysis_repo::find_by_id(db, id.as_str())?
                .map(row_to_record)
                .transpose()
        })
        .await
    }

    async fn list_pending(&self) -> Result<Vec<ImageDocument>, StoreError> {
        let cutoff = self.lease_cutoff();
        self.run(move |db| {
            let docs = image_repo::list_claimable(db, &cutoff)?
                .into_iter()
                .filter_map(|row| match row_to_image(row) {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        log::warn!("Skipping unreadable pending document: {}", e);
                        None
                    }
                })
                .collect();
            Ok(docs)
        })
        .await
    }

    async fn claim(&self, id: &DocumentId) -> Result<Option<Lease>, StoreError> {
        let id = id.clone();
        let now = format_timestamp(&Utc::now());
        let cutoff = self.lease_cutoff();
        self.run(move |db| {
            let taken = image_repo::claim(db, id.as_str(), &now, &cutoff)?;
            Ok(taken.then(|| Lease { id, claimed_at: now }))
        })
        .await
    }

    async fn release(&self, lease: &Lease) -> Result<bool, StoreError> {
        let lease = lease.clone();
        self.run(move |db| {
            Ok(image_repo::release(
                db,
                lease.id.as_str(),
                &lease.claimed_at,
            )?)
        })
        .await
    }

    async fn mark_complete(
        &self,
        id: &DocumentId,
        prediction: &Prediction,
    ) -> Result<bool, StoreError> {
        let id = id.clone();
        let prediction = serde_json::to_string(prediction).map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        self.run(move |db| Ok(image_repo::complete(db, id.as_str(), &prediction)?))
            .await
    }
}
