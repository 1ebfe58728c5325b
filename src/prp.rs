//! # PRP Driver — The Checkpointed Squaring Loop
//!
//! Wires the pieces together for one exponent: resume from the state store,
//! push the residue to the squarer, iterate to the end consulting the
//! checkpoint schedule after every iteration, and on completion build the
//! proof and append the result line. The loop itself stays single-threaded
//! and cooperative; all blocking happens in the squarer's read/write calls
//! and in synchronous file I/O.
//!
//! Iterations are numbered 1..=total; iteration 0 is the seed. The state
//! files always describe a residue that is already durable (snapshot before
//! loop file), so a kill at any point resumes from the last completed save.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rug::Integer;
use tracing::{info, warn};

use crate::mersenne;
use crate::progress::Progress;
use crate::proof::{Proof, ProofBuilder};
use crate::report::{self, ProgramInfo, TestResult};
use crate::schedule::{self, ProofSchedule};
use crate::squarer::Squarer;
use crate::store::{Mode, ProofStore, StateStore};
use crate::words;

/// Default state-save cadence, in iterations. Roughly once a minute on
/// current accelerators at 100M-bit exponents.
pub const DEFAULT_SAVE_EVERY: u64 = 2_000_000;

/// What a completed run produced.
#[derive(Debug)]
pub struct Outcome {
    pub exponent: u64,
    pub is_probable_prime: bool,
    pub res64: u64,
    pub proof: Option<Proof>,
}

/// Number of squaring iterations the mode performs: E for PRP, E − 2 for
/// Lucas–Lehmer.
fn total_iterations(mode: &Mode, exponent: u64) -> u64 {
    match mode {
        Mode::Prp => exponent,
        Mode::Ll => exponent - 2,
        Mode::PMinus1 { .. } => unreachable!("P−1 does not run the squaring driver"),
    }
}

/// Run one full test, resuming from any prior state under `root`.
///
/// `power` of `None` means [`schedule::best_power`]. The squarer is driven
/// one iteration at a time; proof snapshots are written only in PRP mode.
pub fn run_test(
    root: &Path,
    exponent: u64,
    mode: Mode,
    power: Option<u32>,
    save_every: u64,
    squarer: &mut dyn Squarer,
    progress: &Arc<Progress>,
) -> Result<Outcome> {
    if matches!(mode, Mode::PMinus1 { .. }) {
        bail!("P−1 state is managed by the factoring stage, not the squaring driver");
    }
    if exponent < 3 || exponent % 2 == 0 {
        bail!("exponent must be an odd number >= 3, got {}", exponent);
    }
    let with_proof = mode == Mode::Prp;
    let total = total_iterations(&mode, exponent);
    let save_every = save_every.max(1);

    let proof_store = if with_proof {
        let power = power.unwrap_or_else(|| schedule::best_power(exponent));
        let gb = schedule::disk_usage_gb(exponent, power);
        if gb >= 1.0 {
            warn!(exponent, power, "proof snapshots will use ~{:.1} GB", gb);
        }
        Some(ProofStore::create(root, exponent, power)?)
    } else {
        None
    };

    let state = StateStore::new(root, exponent, mode.clone())?;
    let (mut residue, mut next) = state.load_state()?;

    // A resumed run is only as good as its snapshot prefix; a gap means the
    // proof could never be assembled, so start over instead of wasting the
    // remaining iterations.
    if next > 0 {
        if let Some(ps) = &proof_store {
            if let Err(err) = ps.is_valid_to(next) {
                warn!(%err, "checkpoint prefix incomplete, restarting from the seed");
                residue = words::from_integer(&Integer::from(mode.seed()), exponent);
                next = 0;
            }
        }
    }

    squarer.write_words(&words::words32_to_words64(&residue))?;

    progress.total.store(total, Ordering::Relaxed);
    progress.done.store(next.saturating_sub(1), Ordering::Relaxed);
    *progress.current.lock().unwrap() = format!("M({}) {}", exponent, mode.label());
    info!(
        exponent,
        total,
        start = next.max(1),
        proof = with_proof,
        "starting squaring loop"
    );

    let start = next.max(1);
    for k in start..=total {
        squarer.advance()?;
        progress.done.fetch_add(1, Ordering::Relaxed);

        let on_schedule = match &proof_store {
            Some(ps) => ps.schedule().is_checkpoint(k),
            None => false,
        };
        let state_due = k % save_every == 0 || k == total;
        if on_schedule || state_due {
            let disk = words::device_to_disk(&squarer.read_words()?, exponent);
            if on_schedule {
                proof_store.as_ref().unwrap().save(k, &disk)?;
            }
            if state_due {
                state.save_state(&disk, k)?;
            }
        }
    }

    let final_words = words::device_to_disk(&squarer.read_words()?, exponent);
    let final_residue = words::to_integer(&final_words);
    let res64 = words::res64(&final_words);

    let is_probable_prime = match mode {
        // 3^(2^E) ≡ 9 (mod M_E) when M_E is a base-3 Fermat probable prime.
        Mode::Prp => final_residue == 9u32,
        // LL: s_{E−2} ≡ 0 (mod M_E) exactly when M_E is prime.
        Mode::Ll => {
            let zero = Integer::new();
            mersenne::residues_equal(&final_residue, &zero, exponent)
        }
        Mode::PMinus1 { .. } => unreachable!(),
    };

    let proof = match &proof_store {
        Some(ps) => {
            let proof = ProofBuilder::new(ps)
                .compute()
                .context("assembling proof from checkpoints")?;
            Some(proof)
        }
        None => None,
    };

    let result = TestResult {
        exponent,
        worktype: match &mode {
            Mode::Prp => "PRP-3".to_string(),
            Mode::Ll => "LL".to_string(),
            Mode::PMinus1 { .. } => unreachable!(),
        },
        status: match (&mode, is_probable_prime) {
            (Mode::Ll, true) => "PRIME".to_string(),
            (_, true) => "P".to_string(),
            (_, false) => "C".to_string(),
        },
        res64: format!("{:016X}", res64),
        proof_power: proof.as_ref().map(|p| p.power()),
        program: ProgramInfo::current(),
        timestamp: Utc::now(),
    };
    report::append_result(root, &result)?;

    info!(
        exponent,
        status = %result.status,
        res64 = %result.res64,
        "test complete"
    );
    Ok(Outcome {
        exponent,
        is_probable_prime,
        res64,
        proof,
    })
}

/// Rebuild (and check) the proof for an exponent whose snapshot set is
/// already on disk — the recovery path when a run finished but the proof
/// was lost or never assembled.
pub fn rebuild_proof(root: &Path, exponent: u64, power: u32) -> Result<Proof> {
    let store = ProofStore::create(root, exponent, power)?;
    let proof = ProofBuilder::new(&store).compute()?;
    proof.verify().context("rebuilt proof failed verification")?;
    Ok(proof)
}

/// Schedule sanity report used by the CLI before long runs: point count and
/// projected disk usage.
pub fn describe_schedule(exponent: u64, power: Option<u32>) -> (ProofSchedule, f64) {
    let power = power.unwrap_or_else(|| schedule::best_power(exponent));
    let sched = ProofSchedule::new(exponent, power);
    let gb = schedule::disk_usage_gb(exponent, power);
    (sched, gb)
}
