//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim: logging setup and
//! the execution logic for each subcommand. The demo runs drive the CPU
//! reference squarer; a production deployment swaps in the GPU pipeline
//! behind the same [`deepreach::squarer::Squarer`] trait.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use deepreach::progress::Progress;
use deepreach::prp;
use deepreach::squarer::CpuSquarer;
use deepreach::store::Mode;

use super::{Cli, Commands};

/// Initialize tracing to stderr, honoring `RUST_LOG` with an `info` default.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run a `prp` or `ll` subcommand end to end with the reference squarer.
pub fn run_test(cli: &Cli, exponent: u64, mode: Mode) -> Result<()> {
    if mode == Mode::Prp && exponent >= 3 && exponent % 2 == 1 {
        let (sched, gb) = prp::describe_schedule(exponent, cli.power);
        info!(
            exponent,
            power = sched.power(),
            checkpoints = sched.len(),
            disk_gb = %format_args!("{:.2}", gb),
            "checkpoint schedule"
        );
    }

    let progress = Progress::new();
    let reporter = progress.start_reporter();

    let mut squarer = CpuSquarer::new(exponent, &mode);
    let outcome = prp::run_test(
        &cli.save_path,
        exponent,
        mode,
        cli.power,
        cli.save_every,
        &mut squarer,
        &progress,
    );

    progress.stop();
    drop(reporter);
    let outcome = outcome?;

    println!(
        "M({}) is {}, res64 {:016X}",
        outcome.exponent,
        if outcome.is_probable_prime {
            "a probable prime"
        } else {
            "composite"
        },
        outcome.res64
    );
    if let Some(proof) = &outcome.proof {
        proof.verify()?;
        println!(
            "proof: power {}, {} middles, verified",
            proof.power(),
            proof.middles.len()
        );
    }
    Ok(())
}

/// Rebuild and verify the proof from an existing snapshot directory.
pub fn run_proof(cli: &Cli, exponent: u64, power: u32) -> Result<()> {
    let proof = prp::rebuild_proof(&cli.save_path, exponent, power)?;
    println!(
        "proof for M({}) rebuilt and verified: power {}, res64 {:016X}",
        exponent,
        proof.power(),
        proof.res64()
    );
    Ok(())
}

/// Route a parsed command to its executor.
pub fn dispatch(cli: &Cli) -> Result<()> {
    match cli.command {
        Commands::Prp { exponent } => run_test(cli, exponent, Mode::Prp),
        Commands::Ll { exponent } => run_test(cli, exponent, Mode::Ll),
        Commands::Proof { exponent, power } => run_proof(cli, exponent, power),
    }
}
