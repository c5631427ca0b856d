// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Catalog-wide screenshot curation
//!
//! Two strengths of cleanup are offered:
//!
//! * [`Curator::curate`] resolves every reference in the asset directory,
//!   drops missing files and anomalies, deduplicates and caps.
//! * [`dedupe`] only deduplicates and caps, never looking at files. Use it when
//!   asset content cannot be inspected yet.
//!
//! Both read the full entry set before writing anything, write each entry's
//! list as a single update, and keep going when one update fails.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::assets::AssetStore;
use crate::classifier::{AnomalyReason, AssetClassifier, Classification};
use crate::config::AppConfig;
use crate::db::CatalogStore;
use crate::journal::{Journal, JournalEntry, Operation};
use crate::references::{join_references, normalize, split_references};
use crate::{CuratorError, Result};

/// Run-level settings shared by both operations
#[derive(Debug, Clone)]
pub struct CurationOptions {
    pub max_screenshots: usize,
    pub decode_timeout: Duration,
    /// Compute the report without writing to the catalog or journal
    pub dry_run: bool,
}

impl CurationOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_screenshots: config.curation.max_screenshots,
            decode_timeout: config.curation.decode_timeout(),
            dry_run: false,
        }
    }
}

impl Default for CurationOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// What happened to one candidate reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetOutcome {
    Kept,
    Duplicate,
    Missing,
    Anomalous,
}

/// Change computed for one entry
#[derive(Debug, Clone, Serialize)]
pub struct EntryOutcome {
    pub id: String,
    pub before: usize,
    pub after: usize,
    pub old_value: String,
    pub new_value: String,
    pub written: bool,
}

/// Aggregate result of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CurationReport {
    pub dry_run: bool,
    pub entries_seen: usize,
    /// Entries rewritten (or that would be, in a dry run)
    pub updated: usize,
    pub anomalies_removed: usize,
    pub missing_assets: usize,
    pub duplicates_dropped: usize,
    /// Entries whose update failed or matched no row
    pub failed: usize,
    pub entries: Vec<EntryOutcome>,
}

impl CurationReport {
    pub fn summary(&self) -> String {
        format!(
            "updated: {}, anomalies removed: {}",
            self.updated, self.anomalies_removed
        )
    }
}

/// Resolves, classifies, deduplicates and caps screenshot references
pub struct Curator {
    classifier: Arc<dyn AssetClassifier>,
    assets: AssetStore,
    options: CurationOptions,
    journal: Option<Journal>,
}

impl Curator {
    pub fn new(classifier: Arc<dyn AssetClassifier>, assets: AssetStore, options: CurationOptions) -> Self {
        Self {
            classifier,
            assets,
            options,
            journal: None,
        }
    }

    /// Record every rewrite in `journal`
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Curate every entry with a non-empty screenshot field.
    ///
    /// Fails only when the asset directory or the catalog cannot be read;
    /// per-asset and per-entry problems end up in the report.
    pub async fn curate<S: CatalogStore>(&self, store: &S) -> Result<CurationReport> {
        if !self.assets.exists() {
            return Err(CuratorError::AssetsUnavailable(self.assets.dir().to_path_buf()));
        }

        let rows = store.list_entries_with_screenshots()?;
        info!(
            "Curating {} entries with {} ({} max per entry)",
            rows.len(),
            self.classifier.name(),
            self.options.max_screenshots
        );

        let mut report = CurationReport {
            dry_run: self.options.dry_run,
            ..CurationReport::default()
        };

        for row in rows {
            let candidates = split_references(&row.screenshots);
            if candidates.is_empty() {
                continue;
            }
            report.entries_seen += 1;

            let mut seen = HashSet::new();
            let mut kept: Vec<&str> = Vec::new();
            for &reference in &candidates {
                if kept.len() >= self.options.max_screenshots {
                    break;
                }
                let outcome = if seen.insert(reference) {
                    self.assess(reference).await
                } else {
                    AssetOutcome::Duplicate
                };
                match outcome {
                    AssetOutcome::Kept => kept.push(reference),
                    AssetOutcome::Duplicate => report.duplicates_dropped += 1,
                    AssetOutcome::Missing => report.missing_assets += 1,
                    AssetOutcome::Anomalous => report.anomalies_removed += 1,
                }
            }

            let new_value = join_references(&kept);
            write_back(
                store,
                self.journal.as_ref(),
                &self.options,
                Operation::Curate,
                &row.id,
                &row.screenshots,
                &new_value,
                (candidates.len(), kept.len()),
                &mut report,
            );
        }

        info!("Curation finished: {}", report.summary());
        Ok(report)
    }

    async fn assess(&self, reference: &str) -> AssetOutcome {
        let Some(path) = self.assets.locate(reference) else {
            debug!("Asset {} not found, dropping reference", reference);
            return AssetOutcome::Missing;
        };

        let classifier = Arc::clone(&self.classifier);
        let task = tokio::task::spawn_blocking(move || classifier.classify(&path));
        let classification = match tokio::time::timeout(self.options.decode_timeout, task).await {
            Ok(Ok(classification)) => classification,
            Ok(Err(e)) => Classification::Anomalous(AnomalyReason::Undecodable(e.to_string())),
            Err(_) => Classification::Anomalous(AnomalyReason::TimedOut),
        };

        match classification {
            Classification::Valid => AssetOutcome::Kept,
            Classification::Anomalous(reason) => {
                info!("Dropping {}: {}", reference, reason);
                AssetOutcome::Anomalous
            }
        }
    }
}

/// Deduplicate and cap every entry without checking files or content
pub fn dedupe<S: CatalogStore>(
    store: &S,
    options: &CurationOptions,
    journal: Option<&Journal>,
) -> Result<CurationReport> {
    let rows = store.list_entries_with_screenshots()?;
    info!("Deduplicating {} entries", rows.len());

    let mut report = CurationReport {
        dry_run: options.dry_run,
        ..CurationReport::default()
    };

    for row in rows {
        let candidates = split_references(&row.screenshots);
        let kept = normalize(&candidates, options.max_screenshots);
        let distinct: HashSet<_> = candidates.iter().collect();
        report.entries_seen += 1;
        report.duplicates_dropped += candidates.len() - distinct.len();

        let new_value = join_references(&kept);
        write_back(
            store,
            journal,
            options,
            Operation::Dedupe,
            &row.id,
            &row.screenshots,
            &new_value,
            (candidates.len(), kept.len()),
            &mut report,
        );
    }

    info!("Deduplication finished: updated {}", report.updated);
    Ok(report)
}

/// Persist `new_value` when it differs from the trimmed original
#[allow(clippy::too_many_arguments)]
fn write_back<S: CatalogStore>(
    store: &S,
    journal: Option<&Journal>,
    options: &CurationOptions,
    operation: Operation,
    id: &str,
    old_value: &str,
    new_value: &str,
    (before, after): (usize, usize),
    report: &mut CurationReport,
) {
    let old_value = old_value.trim();
    if new_value == old_value {
        return;
    }

    let mut outcome = EntryOutcome {
        id: id.to_string(),
        before,
        after,
        old_value: old_value.to_string(),
        new_value: new_value.to_string(),
        written: false,
    };

    if options.dry_run {
        report.updated += 1;
        report.entries.push(outcome);
        return;
    }

    match store.update_screenshots(id, new_value) {
        Ok(true) => {
            outcome.written = true;
            report.updated += 1;
            if let Some(journal) = journal {
                let record = JournalEntry::new(id, operation, old_value, new_value);
                if let Err(e) = journal.append(&record) {
                    warn!("Failed to journal update of {}: {}", id, e);
                }
            }
        }
        Ok(false) => {
            warn!("Entry {} matched no row, skipping", id);
            report.failed += 1;
        }
        Err(e) => {
            warn!("Failed to update entry {}: {}", id, e);
            report.failed += 1;
        }
    }
    report.entries.push(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Rejects any file whose name starts with "icon"
    #[derive(Default)]
    struct NameClassifier {
        calls: AtomicUsize,
    }

    impl AssetClassifier for NameClassifier {
        fn name(&self) -> &'static str {
            "by-name"
        }

        fn classify(&self, path: &Path) -> Classification {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with("icon") {
                Classification::Anomalous(AnomalyReason::IconShaped { ratio: 1.0 })
            } else {
                Classification::Valid
            }
        }
    }

    struct SlowClassifier;

    impl AssetClassifier for SlowClassifier {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn classify(&self, _path: &Path) -> Classification {
            std::thread::sleep(Duration::from_millis(300));
            Classification::Valid
        }
    }

    /// Panics on "bad.png", accepts everything else
    struct PanickingClassifier;

    impl AssetClassifier for PanickingClassifier {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn classify(&self, path: &Path) -> Classification {
            if path.ends_with("bad.png") {
                panic!("decoder bug");
            }
            Classification::Valid
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<(String, String)>>,
        fail_on: Option<String>,
    }

    impl MemoryStore {
        fn with(rows: &[(&str, &str)]) -> Self {
            Self {
                rows: Mutex::new(rows.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()),
                fail_on: None,
            }
        }

        fn get(&self, id: &str) -> String {
            let rows = self.rows.lock().unwrap();
            rows.iter().find(|(i, _)| i == id).map(|(_, v)| v.clone()).unwrap()
        }
    }

    impl CatalogStore for MemoryStore {
        fn list_entries_with_screenshots(&self) -> Result<Vec<crate::db::ScreenshotRow>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(id, v)| crate::db::ScreenshotRow { id: id.clone(), screenshots: v.clone() })
                .collect())
        }

        fn update_screenshots(&self, id: &str, screenshots: &str) -> Result<bool> {
            if self.fail_on.as_deref() == Some(id) {
                return Err(CuratorError::Config("disk full".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            match rows.iter_mut().find(|(i, _)| i == id) {
                Some(row) => {
                    row.1 = screenshots.to_string();
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn asset_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), b"stub").unwrap();
        }
        dir
    }

    fn curator(dir: &Path, classifier: Arc<dyn AssetClassifier>) -> Curator {
        Curator::new(classifier, AssetStore::new(dir), CurationOptions::default())
    }

    #[tokio::test]
    async fn test_curate_filters_dedupes_and_caps() {
        let dir = asset_dir(&["s1.png", "s2.png", "s3.png", "s4.png", "icon.png"]);
        let classifier = Arc::new(NameClassifier::default());
        let store = MemoryStore::with(&[("1", "s1.png;s1.png;icon.png;s2.png;s3.png;s4.png")]);

        let report = curator(dir.path(), classifier.clone()).curate(&store).await.unwrap();

        assert_eq!(store.get("1"), "s1.png;s2.png;s3.png");
        assert_eq!(report.updated, 1);
        assert_eq!(report.anomalies_removed, 1);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(report.entries[0].before, 6);
        assert_eq!(report.entries[0].after, 3);
        // s4.png is past the cap and never classified; the duplicate is not re-classified
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_missing_file_not_an_anomaly() {
        let dir = asset_dir(&["s1.png"]);
        let store = MemoryStore::with(&[("1", "gone.png; s1.png")]);

        let report = curator(dir.path(), Arc::new(NameClassifier::default()))
            .curate(&store)
            .await
            .unwrap();

        assert_eq!(store.get("1"), "s1.png");
        assert_eq!(report.missing_assets, 1);
        assert_eq!(report.anomalies_removed, 0);
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let dir = asset_dir(&["a.png", "b.png", "icon.png"]);
        let store = MemoryStore::with(&[("1", " a.png ;icon.png;a.png;b.png"), ("2", "b.png")]);
        let curator = curator(dir.path(), Arc::new(NameClassifier::default()));

        let first = curator.curate(&store).await.unwrap();
        assert_eq!(first.updated, 1);

        let second = curator.curate(&store).await.unwrap();
        assert_eq!(second.updated, 0);
        assert!(second.entries.is_empty());
        assert_eq!(store.get("1"), "a.png;b.png");
    }

    #[tokio::test]
    async fn test_failed_update_does_not_stop_run() {
        let dir = asset_dir(&["a.png"]);
        let mut store = MemoryStore::with(&[("bad", "a.png;a.png"), ("good", "a.png;a.png")]);
        store.fail_on = Some("bad".to_string());

        let report = curator(dir.path(), Arc::new(NameClassifier::default()))
            .curate(&store)
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(store.get("good"), "a.png");
        assert_eq!(store.get("bad"), "a.png;a.png");
        assert!(!report.entries.iter().find(|e| e.id == "bad").unwrap().written);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_catalog_alone() {
        let dir = asset_dir(&["a.png"]);
        let store = MemoryStore::with(&[("1", "a.png;icon.png")]);
        let mut options = CurationOptions::default();
        options.dry_run = true;
        let curator = Curator::new(Arc::new(NameClassifier::default()), AssetStore::new(dir.path()), options);

        let report = curator.curate(&store).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.updated, 1);
        assert_eq!(report.entries[0].new_value, "a.png");
        assert_eq!(store.get("1"), "a.png;icon.png");
    }

    #[tokio::test]
    async fn test_decode_timeout_is_anomalous() {
        let dir = asset_dir(&["a.png"]);
        let store = MemoryStore::with(&[("1", "a.png")]);
        let options = CurationOptions {
            decode_timeout: Duration::from_millis(20),
            ..CurationOptions::default()
        };
        let curator = Curator::new(Arc::new(SlowClassifier), AssetStore::new(dir.path()), options);

        let report = curator.curate(&store).await.unwrap();
        assert_eq!(report.anomalies_removed, 1);
        assert_eq!(store.get("1"), "");
    }

    #[tokio::test]
    async fn test_classifier_panic_is_anomalous() {
        let dir = asset_dir(&["bad.png", "ok.png"]);
        let store = MemoryStore::with(&[("1", "bad.png;ok.png;ok.png"), ("2", "ok.png;ok.png")]);

        let report = curator(dir.path(), Arc::new(PanickingClassifier))
            .curate(&store)
            .await
            .unwrap();

        assert_eq!(report.anomalies_removed, 1);
        assert_eq!(report.updated, 2);
        assert_eq!(store.get("1"), "ok.png");
        assert_eq!(store.get("2"), "ok.png");
    }

    #[tokio::test]
    async fn test_blank_separators_skipped() {
        let dir = asset_dir(&[]);
        let store = MemoryStore::with(&[("1", " ; ;")]);

        let report = curator(dir.path(), Arc::new(NameClassifier::default()))
            .curate(&store)
            .await
            .unwrap();
        assert_eq!(report.entries_seen, 0);
        assert_eq!(store.get("1"), " ; ;");
    }

    #[tokio::test]
    async fn test_missing_asset_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::with(&[("1", "a.png")]);
        let result = curator(&dir.path().join("nope"), Arc::new(NameClassifier::default()))
            .curate(&store)
            .await;

        assert!(matches!(result, Err(CuratorError::AssetsUnavailable(_))));
        assert_eq!(store.get("1"), "a.png");
    }

    #[test]
    fn test_dedupe_caps_without_files() {
        let store = MemoryStore::with(&[
            ("1", "a;a;b;c;d"),
            ("2", "x;y"),
            ("3", "p ; q;"),
        ]);
        let report = dedupe(&store, &CurationOptions::default(), None).unwrap();

        assert_eq!(store.get("1"), "a;b;c");
        assert_eq!(store.get("2"), "x;y");
        assert_eq!(store.get("3"), "p;q");
        assert_eq!(report.updated, 2);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(report.anomalies_removed, 0);

        assert_eq!(dedupe(&store, &CurationOptions::default(), None).unwrap().updated, 0);
    }

    #[test]
    fn test_dedupe_journals_writes() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.jsonl"));
        let store = MemoryStore::with(&[("1", "a;a")]);

        dedupe(&store, &CurationOptions::default(), Some(&journal)).unwrap();

        let records = journal.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].before, "a;a");
        assert_eq!(records[0].after, "a");
        assert_eq!(records[0].operation, Operation::Dedupe);
    }
}
