use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};

pub mod backend;
pub mod helpers;
mod migrations;
pub mod records;
pub mod store;

pub use backend::{KeyValueBackend, KeyWrite, MemoryBackend};
pub use store::{keys, AnalyticsStore, KeyedStore, StoreUpdate};

use migrations::run_migrations;

/// SQLite-backed keyed storage.
pub struct Database {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(&db_path).context("failed to open SQLite database")?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {err}");
        }

        let database = Self::init(conn, Some(db_path))?;
        if let Some(path) = database.path() {
            info!("Database initialized at {}", path.display());
        }
        Ok(database)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::init(conn, None)
    }

    fn init(mut conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        run_migrations(&mut conn).context("failed to run database migrations")?;
        Ok(Self { conn, db_path })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl KeyValueBackend for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to read {key}"))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        upsert(&self.conn, key, value, &Utc::now().to_rfc3339())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        delete(&self.conn, key)
    }

    fn write_batch(&mut self, writes: &[KeyWrite<'_>]) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        let tx = self
            .conn
            .transaction()
            .context("failed to open write transaction")?;

        for (key, value) in writes {
            match value {
                Some(value) => upsert(&tx, key, value, &updated_at)?,
                None => delete(&tx, key)?,
            }
        }

        // Dropping `tx` on an early return rolls the batch back
        tx.commit().context("failed to commit write batch")
    }
}

fn upsert(conn: &Connection, key: &str, value: &str, updated_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO storage (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_at = excluded.updated_at",
        params![key, value, updated_at],
    )
    .with_context(|| format!("failed to write {key}"))?;
    Ok(())
}

fn delete(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM storage WHERE key = ?1", params![key])
        .with_context(|| format!("failed to remove {key}"))?;
    Ok(())
}
