// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use screenshot_curator::classifier::ScreenshotClassifier;

// Arbitrary bytes must always classify, never panic
fuzz_target!(|data: &[u8]| {
    let _ = ScreenshotClassifier::default().classify_bytes(data);
});
