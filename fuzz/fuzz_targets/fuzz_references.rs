// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use screenshot_curator::references::{normalize, normalize_field, split_references};

#[derive(Arbitrary, Debug)]
struct Input {
    raw: String,
    cap: u8,
}

fuzz_target!(|input: Input| {
    let cap = input.cap as usize;
    let once = normalize(&split_references(&input.raw), cap);
    assert!(once.len() <= cap);
    assert_eq!(normalize(&once, cap), once);

    let field = normalize_field(&input.raw, cap);
    assert_eq!(normalize_field(&field, cap), field);
});
