//! Registry — SQLite store for manifests and quiz attempts
//!
//! - One short-lived connection per operation
//! - WAL mode so readers never block the single writer
//! - Payloads stored as opaque JSON text; structure belongs to [`crate::types`]
//! - Append-only: there is no update or delete

use rusqlite::{params, Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::types::{new_id, now_ts, Attempt, Manifest, QuizResult, Timestamp};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Listing entry for a registered manifest (no payload)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSummary {
    pub id: String,
    pub cell_index: i64,
    pub name: String,
    pub created_at: Timestamp,
}

/// Row counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub manifests: u64,
    pub attempts: u64,
}

/// Durable keyed store for cell agents
#[derive(Debug, Clone)]
pub struct Registry {
    db_path: PathBuf,
}

impl Registry {
    /// Open (or create) the database and its schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let registry = Self {
            db_path: path.to_path_buf(),
        };
        registry.migrate()?;
        tracing::debug!("Registry opened at {}", path.display());
        Ok(registry)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Idempotent DDL
    fn migrate(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- One row per built cell agent (immutable)
            CREATE TABLE IF NOT EXISTS cell_agents (
                id            TEXT PRIMARY KEY,
                cell_index    INTEGER NOT NULL,
                manifest_json TEXT NOT NULL,
                created_at    REAL NOT NULL
            );

            -- One row per graded quiz submission (append-only)
            CREATE TABLE IF NOT EXISTS attempts (
                id               TEXT PRIMARY KEY,
                cell_id          TEXT NOT NULL,
                ts               REAL NOT NULL,
                quiz_result_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_attempts_cell
                ON attempts(cell_id, ts);
            ",
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Manifests
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist `manifest`, assigning an id when it has none.
    ///
    /// The id and the stored `created_at` are stamped into the payload and
    /// into `manifest` once the insert commits. `created_at` is raised to the
    /// newest stored value when it would go backwards. Duplicate `cell_index`
    /// values are kept as separate rows.
    pub fn register(&self, cell_index: i64, manifest: &mut Manifest) -> Result<String> {
        let id = match manifest.id() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => new_id(),
        };

        let mut conn = self.connect()?;
        // IMMEDIATE takes the write lock before reading the floor
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let floor: f64 = tx.query_row(
            "SELECT COALESCE(MAX(created_at), 0.0) FROM cell_agents",
            [],
            |row| row.get(0),
        )?;

        let mut stored = manifest.clone();
        stored.id = Some(id.clone());
        stored.created_at = stored.created_at.max(floor);
        let payload = serde_json::to_string(&stored)?;

        tx.execute(
            "INSERT INTO cell_agents (id, cell_index, manifest_json, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, cell_index, payload, stored.created_at],
        )?;
        tx.commit()?;

        manifest.id = stored.id;
        manifest.created_at = stored.created_at;
        tracing::info!("Registered cell agent {} for cell {}", id, cell_index);
        Ok(id)
    }

    /// Raw stored JSON for `id`, exactly as written
    pub fn manifest_payload(&self, id: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let result = conn.query_row(
            "SELECT manifest_json FROM cell_agents WHERE id = ?1",
            params![id],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(payload) => Ok(Some(payload)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Manifest registered under `id`, or `None` if the key is absent
    pub fn get_manifest(&self, id: &str) -> Result<Option<Manifest>> {
        match self.manifest_payload(id)? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Most recent manifests first
    pub fn list_manifests(&self, limit: usize) -> Result<Vec<ManifestSummary>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, cell_index, COALESCE(json_extract(manifest_json, '$.name'), ''), created_at
             FROM cell_agents
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(ManifestSummary {
                id: row.get(0)?,
                cell_index: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attempts
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist one graded quiz. `cell_id` is not checked against `cell_agents`.
    pub fn store_attempt(&self, cell_id: &str, result: &QuizResult) -> Result<String> {
        let id = new_id();
        let payload = serde_json::to_string(result)?;

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO attempts (id, cell_id, ts, quiz_result_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, cell_id, now_ts(), payload],
        )?;

        tracing::info!(
            "Stored attempt {} for cell {} ({}/{})",
            id,
            cell_id,
            result.score,
            result.total
        );
        Ok(id)
    }

    pub fn get_attempt(&self, id: &str) -> Result<Option<Attempt>> {
        let conn = self.connect()?;
        let result = conn.query_row(
            "SELECT id, cell_id, ts, quiz_result_json FROM attempts WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        );

        match result {
            Ok(row) => Ok(Some(attempt_from_row(row)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Attempts recorded for `cell_id`, oldest first
    pub fn attempts_for_cell(&self, cell_id: &str) -> Result<Vec<Attempt>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, cell_id, ts, quiz_result_json
             FROM attempts
             WHERE cell_id = ?1
             ORDER BY rowid ASC",
        )?;

        let rows = stmt
            .query_map(params![cell_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(attempt_from_row).collect()
    }

    /// Row counts for both tables
    pub fn stats(&self) -> Result<RegistryStats> {
        let conn = self.connect()?;
        let (manifests, attempts): (i64, i64) = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM cell_agents), (SELECT COUNT(*) FROM attempts)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(RegistryStats {
            manifests: manifests as u64,
            attempts: attempts as u64,
        })
    }
}

fn attempt_from_row(
    (id, cell_id, ts, payload): (String, String, f64, String),
) -> Result<Attempt> {
    Ok(Attempt {
        id,
        cell_id,
        ts,
        quiz_result: serde_json::from_str(&payload)?,
    })
}
