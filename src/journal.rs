// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Journal of screenshot-field rewrites, for undo

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::db::CatalogStore;
use crate::Result;

/// Which pipeline produced a rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Curate,
    Dedupe,
}

/// A single rewrite of one entry's screenshot field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub entry_id: String,
    pub operation: Operation,
    pub before: String,
    pub after: String,
    pub undone: bool,
}

impl JournalEntry {
    pub fn new(entry_id: &str, operation: Operation, before: &str, after: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            entry_id: entry_id.to_string(),
            operation,
            before: before.to_string(),
            after: after.to_string(),
            undone: false,
        }
    }
}

/// Append-only JSONL journal
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the journal
    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all journal entries, oldest first
    pub fn read_all(&self) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse journal entry: {}", e);
                }
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<JournalEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Mark entries as undone, rewriting the file
    pub fn mark_undone(&self, ids: &[String]) -> Result<()> {
        let entries = self.read_all()?;

        let file = File::create(&self.path)?;
        let mut writer = std::io::BufWriter::new(file);

        for mut entry in entries {
            if ids.contains(&entry.id) {
                entry.undone = true;
            }
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Restore the `before` value of the `count` newest entries not yet undone.
    ///
    /// Returns the entries that were restored. An entry whose row no longer
    /// exists, or whose update fails, is skipped and stays undoable.
    pub fn undo<S: CatalogStore>(&self, store: &S, count: usize, dry_run: bool) -> Result<Vec<JournalEntry>> {
        let candidates: Vec<_> = self
            .read_all()?
            .into_iter()
            .rev()
            .filter(|e| !e.undone)
            .take(count)
            .collect();

        let mut restored = Vec::new();
        for entry in candidates {
            if dry_run {
                restored.push(entry);
                continue;
            }
            match store.update_screenshots(&entry.entry_id, &entry.before) {
                Ok(true) => restored.push(entry),
                Ok(false) => {
                    tracing::warn!("Entry {} no longer in catalog, cannot undo", entry.entry_id);
                }
                Err(e) => {
                    tracing::warn!("Failed to restore entry {}: {}", entry.entry_id, e);
                }
            }
        }

        if !dry_run && !restored.is_empty() {
            let ids: Vec<String> = restored.iter().map(|e| e.id.clone()).collect();
            self.mark_undone(&ids)?;
        }
        Ok(restored)
    }

    /// Clear the journal
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Get journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
