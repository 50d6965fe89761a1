//! Schema migrations for the document store.
//!
//! Applied versions are recorded in `_migrations`. Each pending step runs in
//! its own transaction together with its bookkeeping row, so a failed step
//! leaves no trace and is retried on the next open.

use rusqlite::{params, Connection, OptionalExtension};

use super::error::DatabaseError;

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
    /// Set for `ALTER TABLE .. ADD COLUMN` steps: `(table, column)`.
    /// The step is recorded without running when the column is already there.
    adds_column: Option<(&'static str, &'static str)>,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "create_images_table",
        sql: include_str!("sql/001_create_images.sql"),
        adds_column: None,
    },
    Step {
        version: 2,
        name: "create_analyses_table",
        sql: include_str!("sql/002_create_analyses.sql"),
        adds_column: None,
    },
    Step {
        version: 3,
        name: "add_claimed_at_to_images",
        sql: include_str!("sql/003_add_claimed_at.sql"),
        adds_column: Some(("images", "claimed_at")),
    },
];

/// Highest applied version, 0 for an empty database.
pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM _migrations", [], |r| r.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

/// Brings the schema up to the latest version.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );",
    )?;

    let applied = schema_version(conn)?;
    for step in STEPS.iter().filter(|s| s.version > applied) {
        apply(conn, step)?;
    }
    Ok(())
}

fn apply(conn: &Connection, step: &Step) -> Result<(), DatabaseError> {
    let failed = |e: rusqlite::Error| DatabaseError::Migration {
        version: step.version,
        reason: e.to_string(),
    };

    let present = match step.adds_column {
        Some((table, column)) => has_column(conn, table, column)?,
        None => false,
    };

    let tx = conn.unchecked_transaction().map_err(failed)?;
    if present {
        log::debug!("Migration v{} already reflected in schema", step.version);
    } else {
        log::info!("Applying migration v{} ({})", step.version, step.name);
        tx.execute_batch(step.sql).map_err(failed)?;
    }
    tx.execute(
        "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
        params![step.version, step.name],
    )
    .map_err(failed)?;
    tx.commit().map_err(failed)
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    // PRAGMA arguments cannot be bound.
    if table.is_empty() || !table.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(DatabaseError::Migration {
            version: 0,
            reason: format!("Invalid table name: {}", table),
        });
    }
    let mut stmt = conn.prepare(&format!("SELECT name FROM pragma_table_info('{}')", table))?;
    let mut names = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(names.any(|name| name.map(|n| n == column).unwrap_or(false)))
}
