//! Analysis repository: operations on the `analyses` table.

use rusqlite::{params, Row};

use super::image_repo::{self, ImageRow};
use super::{Database, DatabaseError};

/// A raw analysis row. `results` and `models` hold JSON text.
#[derive(Debug, Clone)]
pub struct AnalysisRow {
    pub analysis_id: String,
    pub image_id: String,
    pub results: String,
    pub models: String,
    pub timestamp: String,
}

impl AnalysisRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            analysis_id: row.get("analysis_id")?,
            image_id: row.get("image_id")?,
            results: row.get("results")?,
            models: row.get("models")?,
            timestamp: row.get("timestamp")?,
        })
    }
}

/// Inserts the analyzed image and its analysis record in one transaction.
pub fn insert_with_image(
    db: &Database,
    image: &ImageRow,
    analysis: &AnalysisRow,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.transaction()?;
        image_repo::insert_with(&tx, image)?;
        tx.execute(
            "INSERT INTO analyses (analysis_id, image_id, results, models, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                analysis.analysis_id,
                analysis.image_id,
                analysis.results,
                analysis.models,
                analysis.timestamp,
            ],
        )?;
        tx.commit()?;
        Ok(())
    })
}

/// Finds an analysis by its ID.
pub fn find_by_id(db: &Database, analysis_id: &str) -> Result<Option<AnalysisRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM analyses WHERE analysis_id = ?1")?;
        let mut rows = stmt.query_map(params![analysis_id], AnalysisRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}
