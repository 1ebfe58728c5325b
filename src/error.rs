//! Typed errors for the checkpoint store and proof builder.
//!
//! Everything here is fatal to the operation that raised it: a corrupt or
//! missing snapshot halts resume or proof generation, a zero middle means an
//! upstream load went wrong, and a schedule inconsistency is a programming
//! error rather than bad input. Only the absent loop file on a first run is
//! not an error, and the store handles that case without constructing one.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// CRC mismatch or short read on a proof snapshot.
    #[error("corrupt snapshot {}: {reason}", path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },

    /// An iteration on the checkpoint schedule has no file on disk.
    #[error("missing snapshot for iteration {iteration}: {}", path.display())]
    MissingSnapshot { iteration: u64, path: PathBuf },

    /// OS-level failure, surfaced with the path it happened on.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested iteration is not a member of the checkpoint schedule.
    #[error("iteration {iteration} is not on the checkpoint schedule for exponent {exponent}")]
    ScheduleInconsistency { exponent: u64, iteration: u64 },

    /// A proof level reduced to the zero residue, which a correct run can
    /// never produce.
    #[error("proof level {level} produced a zero middle")]
    ZeroMiddle { level: u32 },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::CorruptSnapshot {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
