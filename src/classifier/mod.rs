// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Screenshot classification
//!
//! Decides whether an image is a genuine app screenshot or an anomaly: an
//! icon mistakenly filed as a screenshot, a blank render, a flat placeholder,
//! or anything that cannot be decoded. Undecodable input is always anomalous.

pub mod pixels;

use image::{DynamicImage, GenericImageView, ImageError, ImageReader};
use std::fmt;
use std::io::{BufRead, Cursor, Seek};
use std::path::Path;
use tracing::debug;

use crate::config::ClassifierConfig;
use pixels::{downsample, flatten_on_white, sample_stats};

/// Why an asset was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum AnomalyReason {
    ZeroDimension,
    IconShaped { ratio: f64 },
    Undersized { long_side: u32 },
    NearBlank { fraction: f64 },
    LowDiversity { distinct: usize },
    DominantColor { fraction: f64 },
    Undecodable(String),
    TimedOut,
}

impl fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "zero-dimension image"),
            Self::IconShaped { ratio } => write!(f, "icon-shaped (aspect {:.2})", ratio),
            Self::Undersized { long_side } => write!(f, "undersized ({}px long side)", long_side),
            Self::NearBlank { fraction } => write!(f, "near-blank ({:.0}% near-white)", fraction * 100.0),
            Self::LowDiversity { distinct } => write!(f, "low colour diversity ({} colours)", distinct),
            Self::DominantColor { fraction } => write!(f, "single colour covers {:.0}%", fraction * 100.0),
            Self::Undecodable(e) => write!(f, "undecodable: {}", e),
            Self::TimedOut => write!(f, "decode timed out"),
        }
    }
}

/// Outcome of classifying one asset
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Valid,
    Anomalous(AnomalyReason),
}

impl Classification {
    pub fn is_anomalous(&self) -> bool {
        matches!(self, Self::Anomalous(_))
    }

    pub fn reason(&self) -> Option<&AnomalyReason> {
        match self {
            Self::Valid => None,
            Self::Anomalous(reason) => Some(reason),
        }
    }
}

/// Trait for asset classifiers.
///
/// Implementations must not panic or fail: any problem reading the asset is
/// reported as [`Classification::Anomalous`].
pub trait AssetClassifier: Send + Sync {
    /// Name of this classifier
    fn name(&self) -> &'static str;

    /// Classify the image stored at `path`
    fn classify(&self, path: &Path) -> Classification;
}

/// Geometry and pixel-statistics heuristics for screenshots
#[derive(Debug, Clone, Default)]
pub struct ScreenshotClassifier {
    config: ClassifierConfig,
}

impl ScreenshotClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify an encoded image held in memory
    pub fn classify_bytes(&self, bytes: &[u8]) -> Classification {
        self.classify_source(|| Ok(ImageReader::new(Cursor::new(bytes))))
    }

    /// Classify an already decoded image
    pub fn classify_image(&self, img: &DynamicImage) -> Classification {
        let (width, height) = img.dimensions();
        if let Some(reason) = self.check_geometry(width, height) {
            return Classification::Anomalous(reason);
        }
        self.check_pixels(img)
            .map_or(Classification::Valid, Classification::Anomalous)
    }

    /// Reads the header for geometry, then decodes only if the shape passes.
    /// Each pass opens its own reader, released when the pass returns.
    fn classify_source<R, F>(&self, open: F) -> Classification
    where
        R: BufRead + Seek,
        F: Fn() -> std::io::Result<ImageReader<R>>,
    {
        let reader = || {
            open()
                .and_then(ImageReader::with_guessed_format)
                .map_err(ImageError::IoError)
        };

        let (width, height) = match reader().and_then(ImageReader::into_dimensions) {
            Ok(dims) => dims,
            Err(e) => return Classification::Anomalous(AnomalyReason::Undecodable(e.to_string())),
        };
        if let Some(reason) = self.check_geometry(width, height) {
            return Classification::Anomalous(reason);
        }

        let img = match reader().and_then(ImageReader::decode) {
            Ok(img) => img,
            Err(e) => return Classification::Anomalous(AnomalyReason::Undecodable(e.to_string())),
        };
        self.check_pixels(&img)
            .map_or(Classification::Valid, Classification::Anomalous)
    }

    fn check_geometry(&self, width: u32, height: u32) -> Option<AnomalyReason> {
        if width == 0 || height == 0 {
            return Some(AnomalyReason::ZeroDimension);
        }

        let ratio = width as f64 / height as f64;
        if (self.config.square_ratio_min..=self.config.square_ratio_max).contains(&ratio) {
            return Some(AnomalyReason::IconShaped { ratio });
        }

        let long_side = width.max(height);
        if long_side < self.config.min_long_side {
            return Some(AnomalyReason::Undersized { long_side });
        }

        None
    }

    fn check_pixels(&self, img: &DynamicImage) -> Option<AnomalyReason> {
        let grid = downsample(&flatten_on_white(img), self.config.sample_grid);
        let stats = sample_stats(&grid, self.config.near_white_channel);
        if stats.samples == 0 {
            return Some(AnomalyReason::ZeroDimension);
        }

        let near_white = stats.near_white_fraction();
        if near_white >= self.config.near_white_fraction {
            return Some(AnomalyReason::NearBlank { fraction: near_white });
        }

        if stats.distinct <= self.config.max_distinct_colors {
            return Some(AnomalyReason::LowDiversity { distinct: stats.distinct });
        }

        let dominant = stats.dominant_fraction();
        if dominant >= self.config.dominant_fraction {
            return Some(AnomalyReason::DominantColor { fraction: dominant });
        }

        None
    }
}

impl AssetClassifier for ScreenshotClassifier {
    fn name(&self) -> &'static str {
        "screenshot-heuristics"
    }

    fn classify(&self, path: &Path) -> Classification {
        let result = self.classify_source(|| ImageReader::open(path));
        if let Classification::Anomalous(ref reason) = result {
            debug!("Anomalous asset {:?}: {}", path, reason);
        }
        result
    }
}
