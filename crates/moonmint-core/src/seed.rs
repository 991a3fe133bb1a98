//! Seeded hashing
//!
//! Every random decision in moonmint comes from one polynomial rolling hash
//! over the UTF-16 code units of a string. The arithmetic is fixed-width
//! 32-bit with wraparound; changing the width or the unit encoding changes
//! every output ever minted, so neither may change.

/// Largest positive 32-bit value, the divisor for [`random`].
const RANDOM_DIVISOR: f64 = 2_147_483_647.0;

const SCATTER_SALT: &str = "moonmint";

/// Rolling hash: `h = h * 32 - h + unit`, wrapping at 32 bits.
pub fn hash(seed: &str) -> i32 {
    seed.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    })
}

/// Absolute value of [`hash`] without overflow at `i32::MIN`.
pub fn hash_magnitude(seed: &str) -> u64 {
    i64::from(hash(seed)).unsigned_abs()
}

/// Deterministic number for `(seed, index)`.
///
/// Lies in `[0, 1)` for every hash except `i32::MIN`, which yields a value a
/// hair above 1; callers turning this into an index go through [`pick`].
pub fn random(seed: &str, index: u64) -> f64 {
    let key = format!("{seed}{index}");
    hash_magnitude(&key) as f64 / RANDOM_DIVISOR
}

/// Well-mixed draw for `(seed, index)`, used where many draws are taken from
/// one seed.
///
/// [`random`] appends the index, and trailing characters carry the least
/// weight in the rolling hash, so nearby indices (or seeds differing only in
/// their last character) give nearly equal values. Here the index is followed
/// by a salt and the result is hashed a second time.
pub fn scatter(seed: &str, index: u64) -> f64 {
    let first = hash_magnitude(&format!("{seed}:{index}:{SCATTER_SALT}"));
    hash_magnitude(&format!("{first}:{SCATTER_SALT}")) as f64 / RANDOM_DIVISOR
}

/// Map a draw onto `0..len`. `len` must be non-zero.
pub fn pick(draw: f64, len: usize) -> usize {
    debug_assert!(len > 0);
    ((draw * len as f64).floor() as usize).min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_empty_is_zero() {
        assert_eq!(hash(""), 0);
    }

    #[test]
    fn test_hash_known_values() {
        // "a" = 97; "ab" = 97 * 31 + 98
        assert_eq!(hash("a"), 97);
        assert_eq!(hash("ab"), 3105);
        assert_eq!(hash("hello"), 99_162_322);
    }

    #[test]
    fn test_hash_wraps_at_32_bits() {
        // Long inputs overflow many times; the result must still be defined
        // and stable.
        let long = "moonmint-".repeat(64);
        assert_eq!(hash(&long), hash(&long.clone()));
        let wide = i64::from(hash(&long));
        assert!(wide >= i64::from(i32::MIN) && wide <= i64::from(i32::MAX));
    }

    #[test]
    fn test_hash_uses_utf16_units() {
        // U+1F315 is a surrogate pair in UTF-16
        let expected = {
            let hi: i32 = 0xD83C;
            let lo: i32 = 0xDF15;
            hi.wrapping_mul(31).wrapping_add(lo)
        };
        assert_eq!(hash("🌕"), expected);
    }

    #[test]
    fn test_random_range_and_determinism() {
        for index in 0..500 {
            let value = random("test-seed-123", index);
            assert!((0.0..=1.0 + 1e-9).contains(&value));
            assert_eq!(value, random("test-seed-123", index));
        }
    }

    #[test]
    fn test_random_concatenates_index() {
        assert_eq!(random("seed", 42), hash_magnitude("seed42") as f64 / RANDOM_DIVISOR);
    }

    #[test]
    fn test_scatter_separates_neighbours() {
        // adjacent indices collapse under `random` but not under `scatter`
        let near = (random("seed-0", 1) - random("seed-0", 2)).abs();
        assert!(near < 1e-6);

        let draws: Vec<f64> = (0..64).map(|i| scatter("seed-0", i)).collect();
        let spread = draws.iter().cloned().fold(f64::MIN, f64::max)
            - draws.iter().cloned().fold(f64::MAX, f64::min);
        assert!(spread > 0.5);
        assert_ne!(scatter("seed-0", 0), scatter("seed-1", 0));
        assert_eq!(scatter("seed-0", 7), scatter("seed-0", 7));
    }

    #[test]
    fn test_pick_is_clamped() {
        assert_eq!(pick(0.0, 4), 0);
        assert_eq!(pick(0.999, 4), 3);
        assert_eq!(pick(1.000_000_001, 4), 3);
    }
}
