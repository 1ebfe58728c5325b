//! # Proof — Succinct Proof-of-Work over the Squaring Sequence
//!
//! Compresses a completed PRP run into `(E, B, M_0 … M_{power−1})`: the
//! final residue plus one "middle" residue per level of a binary-tree
//! reduction over the checkpoint set. Each level folds the remaining
//! interval in half; the fold exponent is drawn from a SHA3-256 hash chain
//! seeded by the final residue, so the prover commits to every level before
//! learning the next exponent. A verifier replays the chain and checks a
//! single span of `⌈E/2^power⌉` squarings instead of all `E`.
//!
//! ## Level reduction
//!
//! Level `p` loads the `2^p` checkpoints at stride `2^(power−p−1)` through
//! the sorted point set and collapses them pairwise in binary-counter
//! order: whenever the leaf index gains a trailing one-bit, the two newest
//! buffer slots merge as `left^h · right`, where `h` is the recorded hash
//! of the matching earlier level. The association is load-bearing — the
//! left factor takes the most recently recorded unused hash — and must not
//! be reordered.
//!
//! ## Verification fold
//!
//! The verifier walks the same middles, folding the claimed statement
//! `B = A^(2^span)` into `A ← A^h·M`, `B ← M^h·B` with `B` squared once
//! first when the span is odd (the right half-interval is one squaring
//! short of the left). After `power` folds, the remaining span is checked
//! by plain modular squaring.

use anyhow::{anyhow, bail, Result};
use rayon::prelude::*;
use rug::Integer;
use tracing::info;

use crate::error::StoreError;
use crate::hash::{self, ProofHash};
use crate::mersenne::{self, pow_mod, reduce};
use crate::store::ProofStore;
use crate::words;

/// The proof artifact: exponent, final residue, and one middle per level,
/// all in disk-word form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub exponent: u64,
    pub final_residue: Vec<u32>,
    pub middles: Vec<Vec<u32>>,
}

impl Proof {
    pub fn power(&self) -> u32 {
        self.middles.len() as u32
    }

    /// Replay the hash chain over `(E, B, middles)`, returning the per-level
    /// 64-bit fold exponents. Independent of the builder's internal state —
    /// this is exactly what a verifier derives from the artifact alone.
    pub fn hash_chain(&self) -> Vec<u64> {
        let mut state: ProofHash = hash::hash_words(self.exponent, &self.final_residue);
        let mut out = Vec::with_capacity(self.middles.len());
        for middle in &self.middles {
            state = hash::hash_chain(self.exponent, &state, middle);
            out.push(hash::low64(&state));
        }
        out
    }

    /// Verify the proof end to end: structural checks, the interval fold,
    /// and the final `⌈E/2^power⌉` squarings against the PRP seed.
    pub fn verify(&self) -> Result<()> {
        let e = self.exponent;
        let count = words::word_count(e);
        if self.final_residue.len() != count {
            bail!(
                "final residue has {} words, expected {}",
                self.final_residue.len(),
                count
            );
        }
        self.middles
            .par_iter()
            .enumerate()
            .try_for_each(|(level, middle)| {
                if middle.len() != count {
                    bail!(
                        "middle {} has {} words, expected {}",
                        level,
                        middle.len(),
                        count
                    );
                }
                if middle.iter().all(|&w| w == 0) {
                    bail!("middle {} is zero", level);
                }
                Ok(())
            })?;

        let exponents = self.hash_chain();
        let mut span = e;
        let mut a = Integer::from(3u32);
        let mut b = words::to_integer(&self.final_residue);

        for (middle, &h) in self.middles.iter().zip(&exponents) {
            let m = words::to_integer(middle);
            if span % 2 == 1 {
                b = reduce(b.square(), e);
            }
            a = reduce(pow_mod(&a, h, e) * &m, e);
            b = reduce(pow_mod(&m, h, e) * b, e);
            span = span.div_ceil(2);
        }

        for _ in 0..span {
            a = reduce(a.square(), e);
        }
        if !mersenne::residues_equal(&a, &b, e) {
            return Err(anyhow!(
                "proof does not connect: {} squarings from the folded start do not reach the folded end",
                span
            ));
        }
        Ok(())
    }

    /// Display fingerprint of the final residue.
    pub fn res64(&self) -> u64 {
        words::res64(&self.final_residue)
    }
}

/// Builds the proof from a fully populated checkpoint store.
pub struct ProofBuilder<'a> {
    store: &'a ProofStore,
}

impl<'a> ProofBuilder<'a> {
    pub fn new(store: &'a ProofStore) -> Self {
        ProofBuilder { store }
    }

    /// Run the binary-tree reduction. Every scheduled snapshot must exist
    /// and pass CRC; any gap or corruption is fatal, as is a zero middle.
    pub fn compute(&self) -> Result<Proof, StoreError> {
        let sched = self.store.schedule();
        let e = sched.exponent();
        let power = sched.power();

        self.store.is_valid_to(e)?;
        let final_residue = self.store.load(e)?;

        let mut state: ProofHash = hash::hash_words(e, &final_residue);
        let mut fold_exponents: Vec<u64> = Vec::with_capacity(power as usize);
        let mut middles: Vec<Vec<u32>> = Vec::with_capacity(power as usize);
        let mut buf: Vec<Integer> = vec![Integer::new(); 1 << power];

        for p in 0..power {
            let stride = 1usize << (power - p - 1);
            let leaves = 1usize << p;
            for slot in buf.iter_mut().take(leaves) {
                *slot = Integer::new();
            }

            let mut top = 0usize;
            for i in 0..leaves {
                let ci = stride * (2 * i + 1) - 1;
                let k = sched.point(ci);
                if k > e || !sched.is_checkpoint(k) {
                    continue;
                }
                buf[top] = words::to_integer(&self.store.load(k)?);
                top += 1;

                let mut bit = 0u32;
                while i & (1 << bit) != 0 {
                    let h = fold_exponents[(p - 1 - bit) as usize];
                    let right = std::mem::take(&mut buf[top - 1]);
                    let left = std::mem::take(&mut buf[top - 2]);
                    buf[top - 2] = reduce(pow_mod(&left, h, e) * right, e);
                    top -= 1;
                    bit += 1;
                }
            }
            debug_assert_eq!(top, 1, "level {} did not collapse to one slot", p);

            if buf[0] == 0u32 {
                return Err(StoreError::ZeroMiddle { level: p });
            }
            let middle = words::from_integer(&buf[0], e);
            state = hash::hash_chain(e, &state, &middle);
            fold_exponents.push(hash::low64(&state));
            middles.push(middle);
        }

        info!(
            exponent = e,
            power,
            res64 = %format_args!("{:016X}", words::res64(&final_residue)),
            "proof computed"
        );
        Ok(Proof {
            exponent: e,
            final_residue,
            middles,
        })
    }
}
