// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Screenshot Curator: keeps mini-app catalog screenshots clean
//!
//! Drops app icons filed as screenshots, blank and placeholder renders,
//! duplicates and overflow from each listing's screenshot list, keeping
//! display order.

pub mod assets;
pub mod classifier;
pub mod config;
pub mod curator;
pub mod db;
pub mod error;
pub mod journal;
pub mod references;

pub use config::AppConfig;
pub use error::{CuratorError, Result};
