//! # Words — Residue Codec
//!
//! A residue lives in three forms: 64-bit little-endian words on the device,
//! 32-bit little-endian words in snapshot files and proof middles, and
//! `rug::Integer` for the proof arithmetic. This module is the only place
//! those forms meet. All conversions are exact; trailing zero words are
//! permitted and meaningless.

use rug::integer::Order;
use rug::Integer;

/// Number of 32-bit words in the on-disk form of a residue mod 2^e − 1.
pub fn word_count(e: u64) -> usize {
    e.div_ceil(32) as usize
}

/// Interpret `words` as a little-endian unsigned magnitude.
pub fn to_integer(words: &[u32]) -> Integer {
    Integer::from_digits(words, Order::Lsf)
}

/// Serialize `x` as exactly `word_count(e)` little-endian 32-bit words,
/// zero-padded. The caller guarantees `0 ≤ x < 2^e`; the codec never
/// truncates.
pub fn from_integer(x: &Integer, e: u64) -> Vec<u32> {
    debug_assert!(*x >= 0u32);
    debug_assert!(
        x.significant_bits() as u64 <= e,
        "residue does not fit in {} bits",
        e
    );
    let mut words: Vec<u32> = x.to_digits(Order::Lsf);
    words.resize(word_count(e), 0);
    words
}

/// Re-chunk device words (64-bit) into disk words (32-bit), preserving the
/// little-endian byte stream exactly.
pub fn words64_to_words32(words: &[u64]) -> Vec<u32> {
    let mut out = Vec::with_capacity(words.len() * 2);
    for &w in words {
        out.push(w as u32);
        out.push((w >> 32) as u32);
    }
    out
}

/// Re-chunk disk words (32-bit) into device words (64-bit). An odd trailing
/// word is zero-extended.
pub fn words32_to_words64(words: &[u32]) -> Vec<u64> {
    let mut out = Vec::with_capacity(words.len().div_ceil(2));
    for pair in words.chunks(2) {
        let lo = pair[0] as u64;
        let hi = pair.get(1).copied().unwrap_or(0) as u64;
        out.push(lo | hi << 32);
    }
    out
}

/// Convert a device read into the on-disk form: re-chunk to 32-bit words
/// and normalize the length to `word_count(e)`. The device may hand back
/// more words than the disk form holds; the surplus is always zero padding
/// for an in-range residue.
pub fn device_to_disk(words: &[u64], e: u64) -> Vec<u32> {
    let mut out = words64_to_words32(words);
    let count = word_count(e);
    if out.len() > count {
        debug_assert!(
            out[count..].iter().all(|&w| w == 0),
            "device residue exceeds 2^{}",
            e
        );
    }
    out.resize(count, 0);
    out
}

/// Low 64 bits of the residue — the display fingerprint reported alongside
/// results, never used for arithmetic.
pub fn res64(words: &[u32]) -> u64 {
    let lo = words.first().copied().unwrap_or(0) as u64;
    let hi = words.get(1).copied().unwrap_or(0) as u64;
    lo | hi << 32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_rounds_up() {
        assert_eq!(word_count(1), 1);
        assert_eq!(word_count(32), 1);
        assert_eq!(word_count(33), 2);
        assert_eq!(word_count(127), 4);
        assert_eq!(word_count(128), 4);
    }

    #[test]
    fn all_ones_words_are_m127() {
        // The saturated 127-bit pattern is exactly 2^127 − 1.
        let words = vec![0xFFFF_FFFFu32, 0xFFFF_FFFF, 0xFFFF_FFFF, 0x7FFF_FFFF];
        let m = crate::mersenne::mersenne(127);
        assert_eq!(to_integer(&words), m);
        assert_eq!(from_integer(&m, 127), words);
    }

    #[test]
    fn round_trip_preserves_value() {
        for e in [31u64, 89, 127, 521] {
            for seed in [0u64, 1, 2, 0xDEAD_BEEF, u64::MAX] {
                let x = crate::mersenne::reduce(
                    Integer::from(seed) * Integer::from(seed ^ 0x5555_5555),
                    e,
                );
                let words = from_integer(&x, e);
                assert_eq!(words.len(), word_count(e));
                assert_eq!(to_integer(&words), x, "round trip failed for e={}", e);
            }
        }
    }

    #[test]
    fn trailing_zero_words_are_meaningless() {
        let mut words = from_integer(&Integer::from(42u32), 127);
        assert_eq!(to_integer(&words), Integer::from(42u32));
        words.push(0);
        words.push(0);
        assert_eq!(to_integer(&words), Integer::from(42u32));
    }

    #[test]
    fn device_words_rechunk_exactly() {
        let dev = vec![0x1111_2222_3333_4444u64, 0xAAAA_BBBB_CCCC_DDDD];
        let disk = words64_to_words32(&dev);
        assert_eq!(disk, vec![0x3333_4444, 0x1111_2222, 0xCCCC_DDDD, 0xAAAA_BBBB]);
        assert_eq!(words32_to_words64(&disk), dev);
        // The integer value is identical through either chunking.
        assert_eq!(to_integer(&disk), Integer::from_digits(&dev, Order::Lsf));
    }

    #[test]
    fn odd_disk_word_count_zero_extends() {
        let disk = vec![0x0000_0001u32, 0x0000_0002, 0x0000_0003];
        let dev = words32_to_words64(&disk);
        assert_eq!(dev, vec![0x0000_0002_0000_0001, 0x0000_0000_0000_0003]);
        // Back-conversion gains one meaningless zero word.
        assert_eq!(words64_to_words32(&dev), vec![1, 2, 3, 0]);
    }

    #[test]
    fn res64_reads_low_bits() {
        let words = vec![0x89AB_CDEFu32, 0x0123_4567, 0xFFFF_FFFF];
        assert_eq!(res64(&words), 0x0123_4567_89AB_CDEF);
        assert_eq!(res64(&[]), 0);
        assert_eq!(res64(&[7]), 7);
    }
}
