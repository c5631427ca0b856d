// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Catalog store: the SQLite `channels` table of mini-app listings

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::{CuratorError, Result};

/// Narrow view of the catalog the curation pipeline needs
pub trait CatalogStore {
    /// Entries whose screenshot field is non-null and non-empty
    fn list_entries_with_screenshots(&self) -> Result<Vec<ScreenshotRow>>;

    /// Overwrite only the screenshot field of one entry; `false` if no row matched
    fn update_screenshots(&self, id: &str, screenshots: &str) -> Result<bool>;
}

/// An entry id with its raw persisted screenshot field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotRow {
    pub id: String,
    pub screenshots: String,
}

/// A catalog listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub url: String,
    pub is_verified: bool,
    pub rating: f64,
    pub category: Option<String>,
    pub screenshots: Option<String>,
}

/// Catalog statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    pub entry_count: i64,
    pub with_screenshots: i64,
    pub reference_count: usize,
}

/// Database handle for the catalog (thread-safe wrapper)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open an existing catalog; a missing file is an error, never created
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CuratorError::StoreUnavailable(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory catalog with the base `channels` table (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(r#"
            CREATE TABLE channels (
                idminiapp TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT DEFAULT '',
                icon TEXT DEFAULT '',
                url TEXT DEFAULT '',
                is_verified INTEGER DEFAULT 0,
                rating REAL DEFAULT 0
            );
        "#)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CuratorError::Config("Database lock poisoned".to_string()))
    }

    /// Add `category` and `screenshots_path` columns when absent.
    ///
    /// Idempotent; run once at startup before any catalog access. Returns the
    /// names of the columns that were added.
    pub fn migrate(&self, default_category: &str) -> Result<Vec<&'static str>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("PRAGMA table_info(channels)")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        if columns.is_empty() {
            return Err(CuratorError::Schema("table `channels` not found".to_string()));
        }

        let mut added = Vec::new();
        if !columns.iter().any(|c| c == "category") {
            let default = default_category.replace('\'', "''");
            conn.execute_batch(&format!(
                "ALTER TABLE channels ADD COLUMN category TEXT DEFAULT '{}'",
                default
            ))?;
            added.push("category");
        }
        if !columns.iter().any(|c| c == "screenshots_path") {
            conn.execute_batch("ALTER TABLE channels ADD COLUMN screenshots_path TEXT")?;
            added.push("screenshots_path");
        }

        if !added.is_empty() {
            info!("Catalog migrated, added columns: {:?}", added);
        }
        Ok(added)
    }

    /// Insert a listing (used by intake tooling and tests)
    pub fn insert_entry(&self, entry: &CatalogEntry) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"INSERT INTO channels (idminiapp, title, description, icon, url, is_verified, rating, category, screenshots_path)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                entry.id,
                entry.title,
                entry.description,
                entry.icon,
                entry.url,
                entry.is_verified,
                entry.rating,
                entry.category,
                entry.screenshots,
            ],
        )?;
        Ok(())
    }

    /// Get one listing by id
    pub fn get_entry(&self, id: &str) -> Result<Option<CatalogEntry>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            r#"SELECT idminiapp, title, COALESCE(description, ''), COALESCE(icon, ''), COALESCE(url, ''),
                      COALESCE(is_verified, 0), COALESCE(rating, 0), category, screenshots_path
               FROM channels WHERE idminiapp = ?1"#,
            params![id],
            |row| {
                Ok(CatalogEntry {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    icon: row.get(3)?,
                    url: row.get(4)?,
                    is_verified: row.get(5)?,
                    rating: row.get(6)?,
                    category: row.get(7)?,
                    screenshots: row.get(8)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    /// Get catalog statistics
    pub fn get_stats(&self) -> Result<CatalogStats> {
        let entry_count: i64 = {
            let conn = self.lock_conn()?;
            conn.query_row("SELECT COUNT(*) FROM channels", [], |row| row.get(0))?
        };
        let rows = self.list_entries_with_screenshots()?;
        let reference_count = rows
            .iter()
            .map(|r| crate::references::split_references(&r.screenshots).len())
            .sum();
        Ok(CatalogStats {
            entry_count,
            with_screenshots: rows.len() as i64,
            reference_count,
        })
    }
}

impl CatalogStore for Database {
    fn list_entries_with_screenshots(&self) -> Result<Vec<ScreenshotRow>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT idminiapp, screenshots_path FROM channels
               WHERE screenshots_path IS NOT NULL AND screenshots_path != ''
               ORDER BY rowid"#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ScreenshotRow {
                    id: row.get(0)?,
                    screenshots: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn update_screenshots(&self, id: &str, screenshots: &str) -> Result<bool> {
        let conn = self.lock_conn()?;
        let affected = conn.execute(
            "UPDATE channels SET screenshots_path = ?1 WHERE idminiapp = ?2",
            params![screenshots, id],
        )?;
        Ok(affected > 0)
    }
}
