//! slmctl: operator CLI for PCIe SLM boards
//!
//! Usage:
//!   slmctl info [--json]                    board list, power, temperature
//!   slmctl compute-tf --rate <fps>          true frames for a sequencing rate
//!   slmctl run --rate <fps> --seconds <s>   load, start, watch and stop a sequence
//!   slmctl scan-library <dir>               list LUTs and calibration images
//!
//! Every command takes `--config <rig.toml>` describing the boards; see
//! `config.rs`. Logging goes through `RUST_LOG` (default `info`).

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod compute_tf;
mod config;
mod info;
mod run;
mod scan_library;

use config::RigConfig;

#[derive(Parser)]
#[command(name = "slmctl")]
#[command(about = "Control and sequencing for PCIe spatial light modulator boards", long_about = None)]
#[command(version)]
struct Cli {
    /// Rig description (TOML). Defaults to one 512×512 nematic board.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List boards with power and temperature
    Info {
        /// Print full telemetry snapshots as JSON
        #[arg(long)]
        json: bool,
    },

    /// True frames the session would program for a rate
    ComputeTf {
        /// Sequencing rate in frames per second
        #[arg(long)]
        rate: f64,
    },

    /// Load a sequence on every board, run it, then stop
    Run(run::RunArgs),

    /// List LUT files and calibration images in a folder
    ScanLibrary {
        /// Calibration folder
        dir: PathBuf,

        /// Also pick the nearest entries for this wavelength (nm)
        #[arg(long)]
        wavelength: Option<u32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let rig = || RigConfig::load(cli.config.as_deref());

    match cli.command {
        Commands::Info { json } => info::run(&rig()?, json),
        Commands::ComputeTf { rate } => compute_tf::run(&rig()?, rate),
        Commands::Run(args) => run::run(&rig()?, &args),
        Commands::ScanLibrary { dir, wavelength } => scan_library::run(&dir, wavelength),
    }
}
