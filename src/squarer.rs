//! # Squarer — The Accelerator Seam
//!
//! The GPU pipeline (NTT/IBDWT kernels, queue management, buffer layout) is
//! entirely outside this crate. What the driver needs from it is tiny:
//! advance the residue one squaring iteration, and move the residue between
//! device and host as 64-bit little-endian words. [`Squarer`] is that
//! contract; [`CpuSquarer`] is the host-side reference implementation used
//! by the tests, the benches, and the demo binary.

use anyhow::Result;
use rug::integer::Order;
use rug::Integer;

use crate::mersenne;
use crate::store::Mode;
use crate::words;

/// One iterated-squaring pipeline for a fixed exponent. Reads and writes
/// are blocking from the host's point of view; implementations drain their
/// device queue before returning.
pub trait Squarer {
    /// Advance the residue by one iteration (a modular squaring, with the
    /// mode's extra term where applicable).
    fn advance(&mut self) -> Result<()>;

    /// Copy the current residue device → host, 64-bit little-endian words.
    fn read_words(&mut self) -> Result<Vec<u64>>;

    /// Copy a residue host → device. Only the resume path uses this.
    fn write_words(&mut self, words: &[u64]) -> Result<()>;
}

/// Reference squarer over GMP: exact, slow, and sufficient for small
/// exponents. PRP squares; LL squares and subtracts 2.
pub struct CpuSquarer {
    exponent: u64,
    subtract_two: bool,
    residue: Integer,
}

impl CpuSquarer {
    pub fn new(exponent: u64, mode: &Mode) -> Self {
        CpuSquarer {
            exponent,
            subtract_two: *mode == Mode::Ll,
            residue: Integer::from(mode.seed()),
        }
    }

    /// The residue in arithmetic form, for tests that want to compare
    /// against a direct computation.
    pub fn residue(&self) -> &Integer {
        &self.residue
    }
}

impl Squarer for CpuSquarer {
    fn advance(&mut self) -> Result<()> {
        let squared = Integer::from(&self.residue * &self.residue);
        let mut r = mersenne::reduce(squared, self.exponent);
        if self.subtract_two {
            r -= 2u32;
            if r < 0u32 {
                r += mersenne::mersenne(self.exponent);
            }
        }
        self.residue = r;
        Ok(())
    }

    fn read_words(&mut self) -> Result<Vec<u64>> {
        let disk = words::from_integer(&self.residue, self.exponent);
        Ok(words::words32_to_words64(&disk))
    }

    fn write_words(&mut self, words: &[u64]) -> Result<()> {
        self.residue = Integer::from_digits(words, Order::Lsf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prp_sequence_matches_direct_powers() {
        // After k iterations the residue is 3^(2^k) mod M_E.
        let e = 31u64;
        let m = mersenne::mersenne(e);
        let mut sq = CpuSquarer::new(e, &Mode::Prp);
        for k in 1..=10u32 {
            sq.advance().unwrap();
            let expect = Integer::from(3u32)
                .pow_mod(&(Integer::from(1u32) << k), &m)
                .unwrap();
            assert!(
                mersenne::residues_equal(sq.residue(), &expect, e),
                "mismatch at iteration {}",
                k
            );
        }
    }

    #[test]
    fn ll_sequence_detects_m7() {
        // 4, 14, 67, 42, 111, 0: the classic M_7 = 127 run, p − 2 iterations.
        let mut sq = CpuSquarer::new(7, &Mode::Ll);
        let expect = [14u32, 67, 42, 111, 0];
        for (i, &want) in expect.iter().enumerate() {
            sq.advance().unwrap();
            assert_eq!(*sq.residue(), want, "LL step {}", i + 1);
        }
    }

    #[test]
    fn read_write_round_trips_through_device_form() {
        let mut sq = CpuSquarer::new(127, &Mode::Prp);
        for _ in 0..20 {
            sq.advance().unwrap();
        }
        let before = sq.residue().clone();
        let dev = sq.read_words().unwrap();

        let mut other = CpuSquarer::new(127, &Mode::Prp);
        other.write_words(&dev).unwrap();
        assert_eq!(*other.residue(), before);
    }
}
