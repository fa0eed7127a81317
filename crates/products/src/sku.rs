//! SKU generation for products created without an explicit SKU.
//!
//! Candidates look like `HARD-WID-4821`: a 4-letter category prefix, a 3-letter
//! name prefix and the last four digits of the millisecond clock. Retries append
//! a random two-digit suffix. Uniqueness is best-effort; the store's
//! `(tenant_id, sku)` constraint has the final word.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound on candidates tried before giving up.
pub const MAX_SKU_ATTEMPTS: usize = 10;

const CATEGORY_PREFIX_LEN: usize = 4;
const NAME_PREFIX_LEN: usize = 3;
const FILLER: char = 'X';
const DEFAULT_CATEGORY_PREFIX: &str = "PROD";

/// Produces SKU candidates. Holds its own RNG so tests can seed it.
#[derive(Debug)]
pub struct SkuGenerator<R = StdRng> {
    rng: R,
    max_attempts: usize,
}

impl SkuGenerator<StdRng> {
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SkuGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            max_attempts: MAX_SKU_ATTEMPTS,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Candidate for a 0-based `attempt`. Attempt 0 has no random suffix.
    pub fn candidate(&mut self, category: &str, name: &str, now: DateTime<Utc>, attempt: usize) -> String {
        let base = base_sku(category, name, now);
        if attempt == 0 {
            return base;
        }
        let suffix: u8 = self.rng.gen_range(0..100);
        format!("{base}{suffix:02}")
    }
}

/// Deterministic part of a SKU: `CATG-NAM-TTTT`.
pub fn base_sku(category: &str, name: &str, now: DateTime<Utc>) -> String {
    let category_prefix = if category.trim().is_empty() {
        DEFAULT_CATEGORY_PREFIX.to_string()
    } else {
        letter_prefix(category, CATEGORY_PREFIX_LEN)
    };
    let name_prefix = letter_prefix(name, NAME_PREFIX_LEN);
    let clock = now.timestamp_millis().rem_euclid(10_000);
    format!("{category_prefix}-{name_prefix}-{clock:04}")
}

fn letter_prefix(source: &str, width: usize) -> String {
    let mut prefix: String = source
        .trim()
        .chars()
        .take(width)
        .map(|c| {
            let upper = c.to_ascii_uppercase();
            if upper.is_ascii_uppercase() { upper } else { FILLER }
        })
        .collect();
    while prefix.chars().count() < width {
        prefix.push(FILLER);
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_millis(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn base_sku_uses_prefixes_and_clock_digits() {
        let sku = base_sku("Hardware", "widget", at_millis(1_700_000_004_821));
        assert_eq!(sku, "HARD-WID-4821");
    }

    #[test]
    fn non_letters_become_filler_and_short_sources_are_padded() {
        let sku = base_sku("4x4", "é", at_millis(7));
        assert_eq!(sku, "XXXX-XXX-0007");
    }

    #[test]
    fn empty_category_falls_back_to_default_prefix() {
        let sku = base_sku("  ", "Bolt", at_millis(1234));
        assert_eq!(sku, "PROD-BOL-1234");
    }

    #[test]
    fn retries_append_two_digits() {
        let mut generator = SkuGenerator::seeded(7);
        let now = at_millis(1_700_000_000_042);
        let first = generator.candidate("Tools", "Hammer", now, 0);
        let retry = generator.candidate("Tools", "Hammer", now, 1);
        assert_eq!(first, "TOOL-HAM-0042");
        assert_eq!(retry.len(), first.len() + 2);
        assert!(retry.starts_with(&first));
        assert!(retry[first.len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn generated_skus_fit_the_column() {
        let mut generator = SkuGenerator::seeded(1);
        let sku = generator.candidate("Category", "Name", Utc::now(), 3);
        assert!(sku.len() <= crate::product::SKU_MAX_LEN);
    }
}
