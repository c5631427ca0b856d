// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Screenshot reference lists and their persisted `;`-joined form

use std::collections::HashSet;

/// Delimiter between filenames in the persisted screenshot field
pub const DELIMITER: char = ';';

/// Split a persisted field into trimmed, non-empty references (order kept, duplicates kept)
pub fn split_references(raw: &str) -> Vec<&str> {
    raw.split(DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Join references back into the persisted form; an empty list is `""`
pub fn join_references<S: AsRef<str>>(references: &[S]) -> String {
    references
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// Trim, drop empties, keep first occurrences, and stop at `max_count` entries.
///
/// The output is a subsequence of the input's first-occurrence order and the
/// function is idempotent for a fixed `max_count`.
pub fn normalize<S: AsRef<str>>(raw: &[S], max_count: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for item in raw {
        if kept.len() >= max_count {
            break;
        }
        let item = item.as_ref().trim();
        if item.is_empty() {
            continue;
        }
        if seen.insert(item) {
            kept.push(item.to_string());
        }
    }

    kept
}

/// [`normalize`] applied to a persisted field
pub fn normalize_field(raw: &str, max_count: usize) -> String {
    join_references(&normalize(&split_references(raw), max_count))
}
