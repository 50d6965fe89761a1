//! SQLite persistence for images and analyses.
//!
//! One `Database` handle per process; every statement goes through the
//! connection mutex. The repo modules hold the SQL, `store::SqliteStore`
//! puts them behind the async `DocumentStore` trait.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;

pub mod analysis_repo;
pub mod error;
pub mod image_repo;
pub mod migrations;

pub use error::DatabaseError;

/// How long a statement waits on another process's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle on a single rusqlite connection. Clones share the connection.
///
/// The web app and the analysis service may open the same file; WAL mode
/// and the busy timeout let them write alternately.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens or creates the database file, creating parent directories,
    /// and migrates it.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                std::fs::create_dir_all(dir).map_err(|source| DatabaseError::DataDir {
                    path: dir.to_path_buf(),
                    source,
                })?
            }
            _ => {}
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self::prepare(conn)?;

        log::info!(
            "Database {} ready (schema v{})",
            path.display(),
            db.schema_version()?
        );
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_all(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn schema_version(&self) -> Result<u32, DatabaseError> {
        self.with_conn(|conn| migrations::schema_version(conn))
    }

    /// Runs `f` while holding the connection lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut Connection) -> Result<T, DatabaseError>,
    {
        let mut guard = self.conn.lock().map_err(|_| DatabaseError::Poisoned)?;
        f(&mut guard)
    }
}

/// `DATABASE_PATH` + `DATABASE_NAME` -> `<path>/<name>.db`.
pub fn database_file(directory: &Path, name: &str) -> PathBuf {
    directory.join(format!("{}.db", name))
}
