//! Fingerprinting and duplicate suppression of compiled CSS.

use crate::StyleNode;
use std::collections::HashSet;

/// The width that fingerprints are padded to.
const FINGERPRINT_LEN: usize = 7;

/// Computes a short deterministic fingerprint of `text`.
///
/// The fingerprint is the 31 high bits of the XXH32 hash of the text in base
/// 36, left-padded with `_`. Since the largest value has six digits, every
/// fingerprint starts with `_` and is usable as a class name.
pub fn fingerprint(text: &str) -> String {
    let mut hash = xxhash_rust::xxh32::xxh32(text.as_bytes(), 0) >> 1;

    let mut digits = Vec::with_capacity(FINGERPRINT_LEN);
    loop {
        digits.push(char::from_digit(hash % 36, 36).unwrap_or('_'));
        hash /= 36;
        if hash == 0 {
            break;
        }
    }

    let mut out = "_".repeat(FINGERPRINT_LEN.saturating_sub(digits.len()));
    out.extend(digits.into_iter().rev());
    out
}

/// A gate deciding whether compiled CSS should be emitted.
pub trait Filter {
    /// Returns true if CSS with the given fingerprint, compiled from `node`,
    /// should be emitted.
    fn should_emit(&mut self, fingerprint: &str, node: &StyleNode) -> bool;
}

impl<F> Filter for F
where
    F: FnMut(&str, &StyleNode) -> bool,
{
    #[inline]
    fn should_emit(&mut self, fingerprint: &str, node: &StyleNode) -> bool {
        self(fingerprint, node)
    }
}

/// A filter which emits each fingerprint only the first time it is seen.
#[derive(Debug, Default)]
pub struct SeenSet(HashSet<String>);

impl SeenSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of fingerprints seen.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no fingerprints have been seen.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Filter for SeenSet {
    fn should_emit(&mut self, fingerprint: &str, _: &StyleNode) -> bool {
        if self.0.contains(fingerprint) {
            false
        } else {
            self.0.insert(fingerprint.to_string());
            true
        }
    }
}
