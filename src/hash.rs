//! # Proof Hash — Domain-Separated Digest Chain
//!
//! SHA3-256 over the exponent, the previous chain state, and a residue in
//! disk-word form. The digest is carried as four little-endian 64-bit limbs;
//! only the first limb feeds the next proof exponent, but the full state is
//! chained so every level commits to everything before it.

use sha3::{Digest, Sha3_256};

/// Chain state: the 32-byte digest as four little-endian limbs.
pub type ProofHash = [u64; 4];

fn limbs(digest: &[u8]) -> ProofHash {
    debug_assert_eq!(digest.len(), 32);
    let mut out = [0u64; 4];
    for (limb, chunk) in out.iter_mut().zip(digest.chunks_exact(8)) {
        *limb = u64::from_le_bytes(chunk.try_into().unwrap());
    }
    out
}

fn update_words(hasher: &mut Sha3_256, words: &[u32]) {
    for &w in words {
        hasher.update(w.to_le_bytes());
    }
}

/// `SHA3-256(LE64(e) ‖ bytes(words))` — seeds the chain from the final
/// residue.
pub fn hash_words(e: u64, words: &[u32]) -> ProofHash {
    let mut hasher = Sha3_256::new();
    hasher.update(e.to_le_bytes());
    update_words(&mut hasher, words);
    limbs(&hasher.finalize())
}

/// `SHA3-256(LE64(e) ‖ bytes(prev) ‖ bytes(words))` — extends the chain with
/// one proof middle.
pub fn hash_chain(e: u64, prev: &ProofHash, words: &[u32]) -> ProofHash {
    let mut hasher = Sha3_256::new();
    hasher.update(e.to_le_bytes());
    for &limb in prev {
        hasher.update(limb.to_le_bytes());
    }
    update_words(&mut hasher, words);
    limbs(&hasher.finalize())
}

/// The 64 bits of chain state that become the next level's exponent.
pub fn low64(h: &ProofHash) -> u64 {
    h[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_sensitive_to_exponent() {
        let words = vec![1u32, 2, 3, 4];
        assert_eq!(hash_words(127, &words), hash_words(127, &words));
        assert_ne!(hash_words(127, &words), hash_words(521, &words));
    }

    #[test]
    fn sensitive_to_every_word() {
        let base = vec![0u32; 8];
        let h0 = hash_words(89, &base);
        for i in 0..base.len() {
            let mut tweaked = base.clone();
            tweaked[i] = 1;
            assert_ne!(h0, hash_words(89, &tweaked), "word {} ignored", i);
        }
    }

    #[test]
    fn chain_depends_on_previous_state() {
        let words = vec![7u32; 4];
        let a = hash_words(127, &words);
        let b = hash_chain(127, &a, &words);
        let c = hash_chain(127, &b, &words);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(hash_chain(127, &a, &words), b);
    }

    #[test]
    fn word_serialization_is_little_endian() {
        // [0x04030201] must hash identically to the raw byte stream 01 02 03 04.
        let mut hasher = Sha3_256::new();
        hasher.update(9u64.to_le_bytes());
        hasher.update([0x01u8, 0x02, 0x03, 0x04]);
        let expect = limbs(&hasher.finalize());
        assert_eq!(hash_words(9, &[0x0403_0201]), expect);
    }

    #[test]
    fn low64_is_first_limb() {
        let h = hash_words(31, &[0xABCD]);
        assert_eq!(low64(&h), h[0]);
    }
}
