// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Flat directory of icon and screenshot files addressed by filename

use std::path::{Path, PathBuf};

/// Read-only view of the asset directory
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
}

impl AssetStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a reference points at, whether or not the file exists
    pub fn resolve(&self, reference: &str) -> PathBuf {
        self.dir.join(reference)
    }

    /// Resolved path if it names an existing regular file.
    ///
    /// Checked on every call; nothing is cached between lookups.
    pub fn locate(&self, reference: &str) -> Option<PathBuf> {
        let path = self.resolve(reference);
        path.is_file().then_some(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }
}
