//! Image repository: operations on the `images` table.
//!
//! Status transitions are conditional updates so that a row can only move
//! `pending -> processing -> complete`, with `processing -> pending` as the
//! lease release. A `complete` row is never touched again.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw image row from the database.
#[derive(Debug, Clone)]
pub struct ImageRow {
    pub id: String,
    pub filename: String,
    pub data: Vec<u8>,
    pub content_type: String,
    pub upload_date: String,
    pub status: String,
    pub prediction: Option<String>,
    pub claimed_at: Option<String>,
}

impl ImageRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            data: row.get("data")?,
            content_type: row.get("content_type")?,
            upload_date: row.get("upload_date")?,
            status: row.get("status")?,
            prediction: row.get("prediction")?,
            claimed_at: row.get("claimed_at")?,
        })
    }
}

/// Inserts a new image row.
pub fn insert(db: &Database, image: &ImageRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_with(conn, image))
}

pub(crate) fn insert_with(
    conn: &rusqlite::Connection,
    image: &ImageRow,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO images (id, filename, data, content_type, upload_date, status,
         prediction, claimed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            image.id,
            image.filename,
            image.data,
            image.content_type,
            image.upload_date,
            image.status,
            image.prediction,
            image.claimed_at,
        ],
    )?;
    Ok(())
}

/// Finds an image by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<ImageRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM images WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], ImageRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists rows the worker may claim: every `pending` row, plus `processing`
/// rows whose lease was taken before `lease_cutoff`. Oldest first.
pub fn list_claimable(db: &Database, lease_cutoff: &str) -> Result<Vec<ImageRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM images
             WHERE status = 'pending'
                OR (status = 'processing' AND (claimed_at IS NULL OR claimed_at < ?1))
             ORDER BY upload_date ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![lease_cutoff], ImageRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Atomically moves a claimable row to `processing`.
///
/// Returns `false` when another worker holds a live lease or the row is
/// already complete.
pub fn claim(
    db: &Database,
    id: &str,
    claimed_at: &str,
    lease_cutoff: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE images SET status = 'processing', claimed_at = ?2
             WHERE id = ?1
               AND (status = 'pending'
                    OR (status = 'processing' AND (claimed_at IS NULL OR claimed_at < ?3)))",
            params![id, claimed_at, lease_cutoff],
        )?;
        Ok(changed == 1)
    })
}

/// Returns a `processing` row to `pending` and drops its lease, provided
/// the lease is still the one stamped at `claimed_at`.
pub fn release(db: &Database, id: &str, claimed_at: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE images SET status = 'pending', claimed_at = NULL
             WHERE id = ?1 AND status = 'processing' AND claimed_at = ?2",
            params![id, claimed_at],
        )?;
        Ok(changed == 1)
    })
}

/// Records the prediction and marks the row `complete`.
///
/// The prediction is write-once: rows that are already complete or already
/// carry a prediction are left untouched and `false` is returned.
pub fn complete(db: &Database, id: &str, prediction: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE images SET status = 'complete', prediction = ?2, claimed_at = NULL
             WHERE id = ?1 AND status != 'complete' AND prediction IS NULL",
            params![id, prediction],
        )?;
        Ok(changed == 1)
    })
}

/// Counts all stored images.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM images", [], |r| r.get(0))?;
        Ok(count)
    })
}
