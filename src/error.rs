// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for the screenshot curator

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for curator operations
pub type Result<T> = std::result::Result<T, CuratorError>;

/// Curator error types
#[derive(Error, Debug)]
pub enum CuratorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Catalog store not found: {0}")]
    StoreUnavailable(PathBuf),

    #[error("Asset directory not found: {0}")]
    AssetsUnavailable(PathBuf),

    #[error("Catalog schema error: {0}")]
    Schema(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
