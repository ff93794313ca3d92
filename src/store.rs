//! Measurement persistence over SQLite
//!
//! Trees are created lazily the first time a measurement for their name
//! arrives. Measurements are append-only; nothing here ever mutates or
//! deletes an existing row. `UNIQUE(tree_id, captured_at)` enforces the
//! strictly-increasing-timestamps invariant at the database.

use crate::error::StoreError;
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One stored observation of a tree
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub tree_id: i64,
    pub height: f64,
    pub rank: u32,
    pub captured_at: i64,
}

/// Store for tree measurements
///
/// The interface performs its own get-or-create on the tree name, so
/// callers never assume they are the only writer.
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Append one measurement, creating the tree on first sight.
    ///
    /// Fails with [`StoreError::DuplicateMeasurement`] when the tree
    /// already has a row at `captured_at`. Not retried here; the caller
    /// decides what the failure means for its cycle.
    async fn record(
        &self,
        tree_name: &str,
        height: f64,
        rank: u32,
        captured_at: i64,
    ) -> Result<Measurement, StoreError>;

    /// Full measurement history for a tree, oldest first.
    ///
    /// Unknown names yield an empty history, not an error.
    async fn history(&self, tree_name: &str) -> Result<Vec<Measurement>, StoreError>;
}

/// Embedded schema, applied in filename order (see `/sql/` directory)
const SCHEMA_FILES: &[(&str, &str)] = &[
    ("01_trees.sql", include_str!("../sql/01_trees.sql")),
    ("02_measurements.sql", include_str!("../sql/02_measurements.sql")),
];

/// Run schema migrations against an open connection
///
/// Idempotent: every statement uses IF NOT EXISTS, so running at each
/// startup is safe. Also switches the database to WAL mode.
pub fn run_schema_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    log::info!("📊 Enabled WAL mode for SQLite database");

    log::info!("🔧 Running schema migrations");
    for (filename, sql) in SCHEMA_FILES {
        log::info!("   ├─ Executing: {}", filename);
        conn.execute_batch(sql)?;
    }
    log::info!("✅ All schema migrations completed");

    Ok(())
}

/// SQLite implementation of MeasurementStore
pub struct SqliteMeasurementStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMeasurementStore {
    /// Open a store over an existing database file.
    ///
    /// Does not create the schema; run [`run_schema_migrations`] first.
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl MeasurementStore for SqliteMeasurementStore {
    async fn record(
        &self,
        tree_name: &str,
        height: f64,
        rank: u32,
        captured_at: i64,
    ) -> Result<Measurement, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        // Get-or-create inside the transaction so concurrent callers
        // cannot race the name into existence twice
        tx.execute(
            "INSERT OR IGNORE INTO trees (name, created_at) VALUES (?1, ?2)",
            rusqlite::params![tree_name, captured_at],
        )?;
        let tree_id: i64 = tx.query_row(
            "SELECT id FROM trees WHERE name = ?1",
            [tree_name],
            |row| row.get(0),
        )?;

        let inserted = tx.execute(
            "INSERT INTO measurements (tree_id, height, rank, captured_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![tree_id, height, rank, captured_at],
        );
        if let Err(e) = inserted {
            if is_constraint_violation(&e) {
                return Err(StoreError::DuplicateMeasurement {
                    tree: tree_name.to_string(),
                    captured_at,
                });
            }
            return Err(e.into());
        }

        tx.commit()?;

        Ok(Measurement {
            tree_id,
            height,
            rank,
            captured_at,
        })
    }

    async fn history(&self, tree_name: &str) -> Result<Vec<Measurement>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT m.tree_id, m.height, m.rank, m.captured_at
             FROM measurements m
             JOIN trees t ON t.id = m.tree_id
             WHERE t.name = ?1
             ORDER BY m.captured_at ASC",
        )?;

        let rows = stmt.query_map([tree_name], |row| {
            Ok(Measurement {
                tree_id: row.get(0)?,
                height: row.get(1)?,
                rank: row.get(2)?,
                captured_at: row.get(3)?,
            })
        })?;

        let mut history = Vec::new();
        for measurement in rows {
            history.push(measurement?);
        }
        Ok(history)
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
