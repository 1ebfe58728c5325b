//! # Main — CLI Entry Point
//!
//! Parses arguments and routes to the executors in `cli.rs`. Three
//! subcommands: `prp` and `ll` run a full test with the CPU reference
//! squarer (checkpointing, resume, proof generation, result line), and
//! `proof` reassembles the proof from an existing snapshot directory.
//!
//! ## Global Options
//!
//! - `--save-path` / `DEEPREACH_SAVE_PATH`: root directory for snapshots,
//!   state files, and `results.txt`.
//! - `--power`: proof power override (default: derived from the exponent).
//! - `--save-every`: live-state save cadence in iterations.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "deepreach", about = "Test Mersenne numbers with proof-of-work generation")]
struct Cli {
    /// Root directory for checkpoints, state files, and results
    #[arg(long, env = "DEEPREACH_SAVE_PATH", default_value = ".")]
    save_path: PathBuf,

    /// Proof power (levels in the proof tree, 1-12). Default: derived from
    /// the exponent size
    #[arg(long)]
    power: Option<u32>,

    /// Iterations between live-state saves
    #[arg(long, default_value_t = deepreach::prp::DEFAULT_SAVE_EVERY)]
    save_every: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a base-3 probable-prime test with proof generation
    Prp {
        /// Mersenne exponent (odd, conventionally prime)
        exponent: u64,
    },
    /// Run a Lucas-Lehmer test (no proof)
    Ll {
        /// Mersenne exponent (odd prime)
        exponent: u64,
    },
    /// Rebuild and verify the proof from existing checkpoints
    Proof {
        /// Mersenne exponent of the completed run
        exponent: u64,
        /// Proof power the run was checkpointed with
        #[arg(long)]
        power: u32,
    },
}

fn main() -> Result<()> {
    cli::init_logging();
    let cli = Cli::parse();
    cli::dispatch(&cli)
}
