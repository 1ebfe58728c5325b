//! # Store — Durable Residue Snapshots and Resume State
//!
//! Owns the on-disk layout for one exponent under a caller-supplied root:
//!
//! ```text
//! <root>/<E>/proof/<k>      CRC-protected residue snapshots, k on the schedule
//! <root>/<base>.mers        latest live residue (32-bit disk words)
//! <root>/<base>.loop        next iteration to execute, ASCII decimal
//! <root>/<base>.exponent    (P−1) accumulated stage-1 exponent, decimal
//! <root>/<base>.hq, .q      (P−1 stage-2) accumulators, snapshot format
//! <root>/<base>.loop2       (P−1 stage-2) next pair index
//! ```
//!
//! where `base` is the exponent followed by the mode tag (and the P−1 bounds
//! when applicable). Snapshot files are `crc32 ‖ words`, everything
//! little-endian, CRC over the serialized word bytes.
//!
//! ## Atomic Writes
//!
//! Every file is written to a temp sibling and renamed into place, so a
//! crash mid-write can never leave a half-written file that later fails CRC
//! and blocks resume. Within one save the snapshot lands before the loop
//! file; after a crash between the two, the orphan snapshot is simply
//! overwritten when the rerun reaches it again.
//!
//! ## Resume Policy
//!
//! The loop file is read first. Absent, empty, or zero means a fresh run
//! from the seed. A valid loop index with a corrupt or missing `.mers` is
//! logged and treated as fresh state — the proof snapshots, by contrast,
//! are strict: a bad proof file is fatal to proof generation, never silently
//! skipped.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rug::Integer;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::schedule::ProofSchedule;
use crate::words;

/// Which squaring sequence is being run. Selects the seed and the state
/// file naming; only PRP runs feed the proof builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Fermat probable-prime test, seed 3.
    Prp,
    /// Lucas–Lehmer, seed 4.
    Ll,
    /// Pollard P−1, stage bounds carried in the file names.
    PMinus1 { b1: u64, b2: Option<u64> },
}

impl Mode {
    /// Seed residue at iteration 0.
    pub fn seed(&self) -> u32 {
        match self {
            Mode::Prp | Mode::PMinus1 { .. } => 3,
            Mode::Ll => 4,
        }
    }

    /// Short tag for logs and progress lines.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Prp => "PRP",
            Mode::Ll => "LL",
            Mode::PMinus1 { .. } => "PM1",
        }
    }

    /// State-file base name: exponent, mode tag, P−1 bounds.
    pub fn file_base(&self, exponent: u64) -> String {
        match self {
            Mode::Prp => format!("{exponent}PRP"),
            Mode::Ll => format!("{exponent}LL"),
            Mode::PMinus1 { b1, b2: None } => format!("{exponent}PM1{b1}"),
            Mode::PMinus1 { b1, b2: Some(b2) } => format!("{exponent}PM1{b1}_{b2}"),
        }
    }
}

/// Write `bytes` to a temp sibling of `path` and rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    let mut f = File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
    f.write_all(bytes).map_err(|e| StoreError::io(&tmp, e))?;
    f.sync_all().map_err(|e| StoreError::io(&tmp, e))?;
    drop(f);
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for &w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    bytes
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Serialize a snapshot: `crc32(words) ‖ words`, all little-endian.
fn snapshot_bytes(words: &[u32]) -> Vec<u8> {
    let body = words_to_bytes(words);
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&crc32(&body).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Read a snapshot file: verify the CRC over exactly `count` words. The
/// byte count is authoritative — trailing garbage is tolerated when the
/// prefix is intact.
fn read_snapshot(path: &Path, count: usize) -> Result<Vec<u32>, StoreError> {
    let mut f = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut crc_bytes = [0u8; 4];
    f.read_exact(&mut crc_bytes)
        .map_err(|_| StoreError::corrupt(path, "file shorter than CRC header"))?;
    let stored_crc = u32::from_le_bytes(crc_bytes);

    let mut body = vec![0u8; count * 4];
    f.read_exact(&mut body).map_err(|_| {
        StoreError::corrupt(path, format!("short read, expected {} words", count))
    })?;

    if crc32(&body) != stored_crc {
        return Err(StoreError::corrupt(path, "CRC mismatch"));
    }

    let mut out = Vec::with_capacity(count);
    for chunk in body.chunks_exact(4) {
        out.push(u32::from_le_bytes(chunk.try_into().unwrap()));
    }
    Ok(out)
}

/// Proof snapshot store: the `<root>/<E>/proof/` directory plus the schedule
/// that decides which iterations belong in it.
pub struct ProofStore {
    dir: PathBuf,
    schedule: ProofSchedule,
}

impl ProofStore {
    /// Open (creating directories as needed) the proof store for one
    /// exponent. The schedule is owned here so every save and load agrees
    /// on membership.
    pub fn create(root: &Path, exponent: u64, power: u32) -> Result<Self, StoreError> {
        let dir = root.join(exponent.to_string()).join("proof");
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(ProofStore {
            dir,
            schedule: ProofSchedule::new(exponent, power),
        })
    }

    pub fn schedule(&self) -> &ProofSchedule {
        &self.schedule
    }

    pub fn exponent(&self) -> u64 {
        self.schedule.exponent()
    }

    fn path_for(&self, k: u64) -> PathBuf {
        self.dir.join(k.to_string())
    }

    /// Persist the residue at iteration `k`. A no-op when `k` is not on the
    /// schedule, so the driver can call this unconditionally every
    /// iteration.
    pub fn save(&self, k: u64, words: &[u32]) -> Result<(), StoreError> {
        if !self.schedule.is_checkpoint(k) {
            return Ok(());
        }
        debug_assert_eq!(words.len(), words::word_count(self.exponent()));
        write_atomic(&self.path_for(k), &snapshot_bytes(words))
    }

    /// Load and CRC-verify the snapshot for iteration `k`.
    pub fn load(&self, k: u64) -> Result<Vec<u32>, StoreError> {
        if !self.schedule.is_checkpoint(k) {
            return Err(StoreError::ScheduleInconsistency {
                exponent: self.exponent(),
                iteration: k,
            });
        }
        let path = self.path_for(k);
        if !path.exists() {
            return Err(StoreError::MissingSnapshot { iteration: k, path });
        }
        read_snapshot(&path, words::word_count(self.exponent()))
    }

    /// Check that every scheduled iteration below `min(limit, E)` has a file
    /// on disk. Resume past a gap is impossible, so the first missing point
    /// is the error.
    pub fn is_valid_to(&self, limit: u64) -> Result<(), StoreError> {
        let cap = limit.min(self.exponent());
        let missing = self
            .schedule
            .points()
            .par_iter()
            .filter(|&&k| k < cap)
            .find_first(|&&k| !self.path_for(k).exists());
        match missing {
            Some(&k) => Err(StoreError::MissingSnapshot {
                iteration: k,
                path: self.path_for(k),
            }),
            None => Ok(()),
        }
    }

    /// Delete the whole proof directory. Snapshots are only ever removed by
    /// this explicit request, never as a side effect.
    pub fn clean(&self) -> Result<(), StoreError> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
            info!(dir = %self.dir.display(), "removed proof snapshots");
        }
        Ok(())
    }
}

/// Live-residue state files for one `(exponent, mode)` pair: `.mers`,
/// `.loop`, and the P−1 family.
pub struct StateStore {
    root: PathBuf,
    exponent: u64,
    mode: Mode,
}

impl StateStore {
    pub fn new(root: &Path, exponent: u64, mode: Mode) -> Result<Self, StoreError> {
        fs::create_dir_all(root).map_err(|e| StoreError::io(root, e))?;
        Ok(StateStore {
            root: root.to_path_buf(),
            exponent,
            mode,
        })
    }

    fn base_path(&self, ext: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", self.mode.file_base(self.exponent), ext))
    }

    /// Seed residue in disk-word form.
    fn seed_words(&self) -> Vec<u32> {
        words::from_integer(&Integer::from(self.mode.seed()), self.exponent)
    }

    /// Parse a loop file: ASCII decimal, one optional trailing whitespace
    /// character accepted.
    fn parse_loop(text: &str) -> Option<u64> {
        text.trim_end().parse().ok()
    }

    /// Resume point: `(residue words, next iteration to execute)`.
    ///
    /// A missing, empty, or zero loop file means a fresh run from the seed.
    /// A valid loop index whose `.mers` is unreadable or mis-sized is logged
    /// and also treated as fresh — the live state is reproducible, unlike
    /// the proof snapshots.
    pub fn load_state(&self) -> Result<(Vec<u32>, u64), StoreError> {
        let loop_path = self.base_path("loop");
        let next = match fs::read_to_string(&loop_path) {
            Ok(text) => Self::parse_loop(&text).unwrap_or(0),
            Err(_) => 0,
        };
        if next == 0 {
            return Ok((self.seed_words(), 0));
        }

        let mers_path = self.base_path("mers");
        let count = words::word_count(self.exponent);
        match fs::read(&mers_path) {
            Ok(bytes) if bytes.len() >= count * 4 => {
                let mut out = Vec::with_capacity(count);
                for chunk in bytes[..count * 4].chunks_exact(4) {
                    out.push(u32::from_le_bytes(chunk.try_into().unwrap()));
                }
                info!(
                    exponent = self.exponent,
                    iteration = next,
                    "resuming from saved state"
                );
                Ok((out, next))
            }
            Ok(bytes) => {
                warn!(
                    path = %mers_path.display(),
                    got = bytes.len(),
                    want = count * 4,
                    "residue file mis-sized, starting fresh"
                );
                Ok((self.seed_words(), 0))
            }
            Err(err) => {
                warn!(
                    path = %mers_path.display(),
                    %err,
                    "loop file names iteration {} but residue is unreadable, starting fresh",
                    next
                );
                Ok((self.seed_words(), 0))
            }
        }
    }

    /// Persist the residue read at `iteration` and advance the loop file to
    /// `iteration + 1`. The snapshot lands first; the loop file only ever
    /// names a residue that is already durable.
    pub fn save_state(&self, residue: &[u32], iteration: u64) -> Result<(), StoreError> {
        debug_assert_eq!(residue.len(), words::word_count(self.exponent));
        write_atomic(&self.base_path("mers"), &words_to_bytes(residue))?;
        write_atomic(
            &self.base_path("loop"),
            (iteration + 1).to_string().as_bytes(),
        )
    }

    // ── P−1 state ───────────────────────────────────────────────────────

    /// Dump the accumulated stage-1 exponent as decimal text. These grow to
    /// hundreds of megabytes for deep bounds; the write is synchronous and
    /// atomic like everything else.
    pub fn save_exponent(&self, exponent: &Integer) -> Result<(), StoreError> {
        write_atomic(
            &self.base_path("exponent"),
            exponent.to_string_radix(10).as_bytes(),
        )
    }

    pub fn load_exponent(&self) -> Option<Integer> {
        let text = fs::read_to_string(self.base_path("exponent")).ok()?;
        Integer::parse(text.trim_end()).ok().map(Integer::from)
    }

    /// Persist the stage-2 accumulators H and Q plus the next pair index.
    /// Same snapshot format (`crc ‖ words`) and same snapshot-before-index
    /// ordering as the main state.
    pub fn save_stage2(&self, h: &[u32], q: &[u32], next: u64) -> Result<(), StoreError> {
        write_atomic(&self.base_path("hq"), &snapshot_bytes(h))?;
        write_atomic(&self.base_path("q"), &snapshot_bytes(q))?;
        write_atomic(&self.base_path("loop2"), next.to_string().as_bytes())
    }

    /// Stage-2 resume point, `None` when no stage-2 state exists yet.
    pub fn load_stage2(&self) -> Result<Option<(Vec<u32>, Vec<u32>, u64)>, StoreError> {
        let loop2 = self.base_path("loop2");
        let next = match fs::read_to_string(&loop2) {
            Ok(text) => match Self::parse_loop(&text) {
                Some(n) if n > 0 => n,
                _ => return Ok(None),
            },
            Err(_) => return Ok(None),
        };
        let count = words::word_count(self.exponent);
        let h = read_snapshot(&self.base_path("hq"), count)?;
        let q = read_snapshot(&self.base_path("q"), count)?;
        Ok(Some((h, q, next)))
    }
}
