//! Process plumbing shared by the `facemood-web` and `facemood-analyzer`
//! binaries.

pub mod shutdown;
pub mod telemetry;

use facemood::db::{image_repo, Database};
use facemood::{Settings, SqliteStore};

/// Opens the configured database and wraps it as a document store.
pub fn open_store(settings: &Settings) -> facemood::Result<SqliteStore> {
    let db = Database::open(&settings.database_file())?;
    tracing::info!(
        documents = image_repo::count(&db)?,
        id_scheme = ?settings.id_scheme,
        "Document store ready"
    );
    Ok(SqliteStore::new(db, settings.id_scheme, settings.claim_lease()))
}
