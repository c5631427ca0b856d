// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Colour flattening, downsampling and sample statistics

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use std::collections::HashMap;

/// Counts gathered over the downsampled grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleStats {
    pub samples: usize,
    pub near_white: usize,
    pub distinct: usize,
    /// Occurrences of the most frequent colour
    pub dominant: usize,
}

impl SampleStats {
    pub fn near_white_fraction(&self) -> f64 {
        fraction(self.near_white, self.samples)
    }

    pub fn dominant_fraction(&self) -> f64 {
        fraction(self.dominant, self.samples)
    }
}

fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Compose the image over white and drop alpha. Greyscale and indexed inputs come out as RGB.
pub fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        out.put_pixel(x, y, Rgb([over_white(r, a), over_white(g, a), over_white(b, a)]));
    }
    out
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((channel as u32 * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Resample to an exact `grid`×`grid` square, ignoring aspect ratio
pub fn downsample(img: &RgbImage, grid: u32) -> RgbImage {
    imageops::resize(img, grid, grid, FilterType::Lanczos3)
}

/// Tally near-white samples, distinct colours and the most frequent colour
pub fn sample_stats(grid: &RgbImage, near_white_channel: u8) -> SampleStats {
    let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
    let mut near_white = 0;

    for px in grid.pixels() {
        if px.0.iter().all(|&c| c >= near_white_channel) {
            near_white += 1;
        }
        *counts.entry(px.0).or_insert(0) += 1;
    }

    SampleStats {
        samples: (grid.width() as usize) * (grid.height() as usize),
        near_white,
        distinct: counts.len(),
        dominant: counts.values().copied().max().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{LumaA, Rgba, RgbaImage};

    #[test]
    fn test_transparent_pixels_become_white() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([10, 20, 30, 0]));
        img.put_pixel(1, 0, Rgba([10, 20, 30, 255]));

        let flat = flatten_on_white(&DynamicImage::ImageRgba8(img));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_half_alpha_blends_toward_white() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 128]));
        let flat = flatten_on_white(&DynamicImage::ImageRgba8(img));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn test_greyscale_with_alpha_converted() {
        let img = image::ImageBuffer::from_pixel(3, 3, LumaA([40u8, 255]));
        let flat = flatten_on_white(&DynamicImage::ImageLumaA8(img));
        assert!(flat.pixels().all(|p| p.0 == [40, 40, 40]));
    }

    #[test]
    fn test_downsample_is_exact_square() {
        let img = RgbImage::from_pixel(370, 650, Rgb([1, 2, 3]));
        let grid = downsample(&img, 80);
        assert_eq!(grid.dimensions(), (80, 80));
        assert!(grid.pixels().all(|p| p.0 == [1, 2, 3]));
    }

    #[test]
    fn test_stats_counts() {
        let mut img = RgbImage::from_pixel(4, 2, Rgb([255, 255, 255]));
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([239, 250, 250]));

        let stats = sample_stats(&img, 240);
        assert_eq!(stats.samples, 8);
        assert_eq!(stats.near_white, 6);
        assert_eq!(stats.distinct, 3);
        assert_eq!(stats.dominant, 6);
        assert_eq!(stats.dominant_fraction(), 0.75);
    }
}
