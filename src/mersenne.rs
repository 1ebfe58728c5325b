//! # Mersenne Arithmetic — Modular Arithmetic for M_E = 2^E − 1
//!
//! Specialized reduction and exponentiation modulo a Mersenne number.
//! Because 2^E ≡ 1 (mod 2^E − 1), reduction never divides:
//!
//! ```text
//! x ≡ (x mod 2^E) + (x div 2^E)   (mod 2^E − 1)
//! ```
//!
//! i.e. split at bit E, add the halves, and subtract M_E at most once.
//! This is the same trick the weighted-transform squaring kernels exploit
//! in hardware; here it serves the host-side proof arithmetic.
//!
//! ## Canonical representatives
//!
//! [`reduce`] maps into `[0, M_E]` *inclusive*: the value `M_E` itself is
//! left as-is rather than being folded to 0. The two are the same residue
//! class, and callers comparing residues that crossed a conversion boundary
//! must use [`residues_equal`] rather than `==`.

use rug::Integer;

/// The Mersenne number M_e = 2^e − 1.
pub fn mersenne(e: u64) -> Integer {
    (Integer::from(1u32) << crate::checked_u32(e)) - 1u32
}

/// Reduce `x` modulo 2^e − 1 by splitting at bit `e` and folding.
///
/// Accepts any `x` with `0 ≤ x < 2^(2e)` (the range produced by multiplying
/// two reduced residues) and returns a value in `[0, M_e]`. Values that
/// already fit in `e` bits are returned unchanged, so `M_e` stays `M_e`.
pub fn reduce(x: Integer, e: u64) -> Integer {
    debug_assert!(x >= 0u32, "reduce requires a non-negative value");
    if x.significant_bits() as u64 <= e {
        return x;
    }
    let shift = crate::checked_u32(e);
    let hi = Integer::from(&x >> shift);
    let lo = x.keep_bits(shift);
    let mut r = lo + hi;
    let m = mersenne(e);
    if r >= m {
        r -= m;
    }
    r
}

/// Compute `base^exp mod 2^e − 1` by left-to-right binary exponentiation,
/// reducing after every square and every multiply.
///
/// The exponent is a plain `u64` — the proof hash chain never supplies
/// anything wider.
pub fn pow_mod(base: &Integer, exp: u64, e: u64) -> Integer {
    if exp == 0 {
        return Integer::from(1u32);
    }
    let b = reduce(base.clone(), e);
    if exp == 1 {
        return b;
    }
    let bits = 64 - exp.leading_zeros();
    let mut acc = b.clone();
    for i in (0..bits - 1).rev() {
        acc = reduce(acc.square(), e);
        if exp >> i & 1 == 1 {
            acc = reduce(acc * &b, e);
        }
    }
    acc
}

/// Compare two residues modulo 2^e − 1, treating 0 and M_e as the same
/// residue class (see the module note on canonical representatives).
pub fn residues_equal(a: &Integer, b: &Integer, e: u64) -> bool {
    if a == b {
        return true;
    }
    let m = mersenne(e);
    (*a == 0u32 && *b == m) || (*a == m && *b == 0u32)
}
