//! Cache-busting request ids.
//!
//! Ids are the current epoch milliseconds in a URL-safe 64-symbol alphabet.
//! Ids generated within the same millisecond get a `.seed` suffix, so every
//! id from one [`Yeast`] is unique.

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Constants
// ============================================================================

const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

// ============================================================================
// Encoding
// ============================================================================

/// Encodes a number in the id alphabet.
#[must_use]
pub fn encode(mut num: u64) -> String {
    let mut digits = Vec::with_capacity(11);
    loop {
        digits.push(ALPHABET[(num % 64) as usize]);
        num /= 64;
        if num == 0 {
            break;
        }
    }
    digits.iter().rev().map(|&b| char::from(b)).collect()
}

/// Decodes an id produced by [`encode`].
///
/// Returns `None` for empty input, symbols outside the alphabet, or overflow.
#[must_use]
pub fn decode(encoded: &str) -> Option<u64> {
    if encoded.is_empty() {
        return None;
    }
    encoded.bytes().try_fold(0u64, |acc, byte| {
        let digit = ALPHABET.iter().position(|&symbol| symbol == byte)?;
        acc.checked_mul(64)?.checked_add(digit as u64)
    })
}

// ============================================================================
// Yeast
// ============================================================================

/// Per-transport id generator.
#[derive(Debug, Clone, Default)]
pub struct Yeast {
    prev: String,
    seed: u64,
}

impl Yeast {
    /// Creates a generator.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh id for the current time.
    pub fn next_id(&mut self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        self.next_at(millis)
    }

    /// Returns a fresh id for `millis` since the epoch.
    pub fn next_at(&mut self, millis: u64) -> String {
        let now = encode(millis);
        if now != self.prev {
            self.seed = 0;
            self.prev.clone_from(&now);
            return now;
        }
        let id = format!("{now}.{}", encode(self.seed));
        self.seed += 1;
        id
    }
}

// ============================================================================
// Tests
// ============================================================================
