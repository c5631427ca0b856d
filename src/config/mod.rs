// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for the screenshot curator

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Catalog database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Screenshot/icon asset directory
    #[serde(default)]
    pub assets: AssetConfig,

    /// Run-level curation policy
    #[serde(default)]
    pub curation: CurationConfig,

    /// Screenshot heuristics
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Rewrite journal
    #[serde(default)]
    pub journal: JournalConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssetConfig {
    #[serde(default = "default_assets_dir")]
    pub dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CurationConfig {
    /// Cap on references kept per entry
    #[serde(default = "default_max_screenshots")]
    pub max_screenshots: usize,
    /// Upper bound on decoding a single image; exceeding it marks the asset anomalous
    #[serde(default = "default_decode_timeout_ms")]
    pub decode_timeout_ms: u64,
    /// Default for the `category` column added by migration
    #[serde(default = "default_category")]
    pub default_category: String,
}

/// Thresholds for telling real screenshots apart from icons and placeholders.
///
/// Every check is independent; an image matching any of them is anomalous.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Lower bound of the width/height ratio treated as icon-shaped
    #[serde(default = "default_square_ratio_min")]
    pub square_ratio_min: f64,
    /// Upper bound of the width/height ratio treated as icon-shaped
    #[serde(default = "default_square_ratio_max")]
    pub square_ratio_max: f64,
    /// Images whose longer side is below this are too small to be screenshots
    #[serde(default = "default_min_long_side")]
    pub min_long_side: u32,
    /// Side of the square grid the image is resampled to before pixel statistics
    #[serde(default = "default_sample_grid")]
    pub sample_grid: u32,
    /// A sample is near-white when every channel is at least this value
    #[serde(default = "default_near_white_channel")]
    pub near_white_channel: u8,
    /// Fraction of near-white samples at which the image counts as blank
    #[serde(default = "default_near_white_fraction")]
    pub near_white_fraction: f64,
    /// Images with at most this many distinct sample colors are flat icons
    #[serde(default = "default_max_distinct_colors")]
    pub max_distinct_colors: usize,
    /// Fraction covered by the most frequent color at which the image is a placeholder
    #[serde(default = "default_dominant_fraction")]
    pub dominant_fraction: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JournalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_journal_path")]
    pub path: String,
}

// Default value functions
fn default_db_path() -> String { "catalog.db".to_string() }
fn default_assets_dir() -> String { "assets".to_string() }
fn default_max_screenshots() -> usize { 3 }
fn default_decode_timeout_ms() -> u64 { 10_000 }
fn default_category() -> String { "Utilities".to_string() }
fn default_square_ratio_min() -> f64 { 0.8 }
fn default_square_ratio_max() -> f64 { 1.2 }
fn default_min_long_side() -> u32 { 200 }
fn default_sample_grid() -> u32 { 80 }
fn default_near_white_channel() -> u8 { 240 }
fn default_near_white_fraction() -> f64 { 0.82 }
fn default_max_distinct_colors() -> usize { 15 }
fn default_dominant_fraction() -> f64 { 0.80 }
fn default_true() -> bool { true }
fn default_journal_path() -> String { "curation_journal.jsonl".to_string() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            dir: default_assets_dir(),
        }
    }
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            max_screenshots: default_max_screenshots(),
            decode_timeout_ms: default_decode_timeout_ms(),
            default_category: default_category(),
        }
    }
}

impl CurationConfig {
    pub fn decode_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_timeout_ms)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            square_ratio_min: default_square_ratio_min(),
            square_ratio_max: default_square_ratio_max(),
            min_long_side: default_min_long_side(),
            sample_grid: default_sample_grid(),
            near_white_channel: default_near_white_channel(),
            near_white_fraction: default_near_white_fraction(),
            max_distinct_colors: default_max_distinct_colors(),
            dominant_fraction: default_dominant_fraction(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_journal_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::CuratorError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.curation.max_screenshots == 0 {
            return Err(crate::CuratorError::Config(
                "curation.max_screenshots must be at least 1".to_string(),
            ));
        }
        if self.classifier.sample_grid == 0 {
            return Err(crate::CuratorError::Config(
                "classifier.sample_grid must be at least 1".to_string(),
            ));
        }
        if self.classifier.square_ratio_min > self.classifier.square_ratio_max {
            return Err(crate::CuratorError::Config(
                "classifier.square_ratio_min exceeds square_ratio_max".to_string(),
            ));
        }
        Ok(())
    }
}
