//! CLI command definitions
//!
//! Defines the clap commands for the ragger CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::backend::BackendKind;
use crate::common::config::RunConfig;
use crate::screen::Device;

#[derive(Subcommand)]
pub enum Commands {
    /// Execute test scenarios defined in YAML files
    Run {
        /// Paths to the YAML test scenario files
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,

        #[command(flatten)]
        target: TargetArgs,

        /// Regenerate the golden snapshots instead of comparing against them
        #[arg(long)]
        golden_run: bool,

        /// Root directory of the snapshot trees
        #[arg(long)]
        snapshots: Option<PathBuf>,

        /// Snapshot comparison: exact or sha256
        #[arg(long)]
        comparator: Option<String>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Send one APDU and print the reply
    Exchange {
        /// Command APDU in hex (e.g. e0010000)
        apdu: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Raise policy: nothing, all, all-but-success or custom:<sw,..>
        #[arg(long, default_value = "all-but-success")]
        raise: String,
    },

    /// List supported device models
    Devices {
        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Which device a command drives
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Backend: emulator, wired or wireless
    #[arg(long, default_value = "emulator")]
    pub backend: BackendKind,

    /// Device model (nanos, nanosp, nanox, stax, flex)
    #[arg(long, default_value = "nanos")]
    pub device: Device,

    /// Show the emulator window instead of running headless
    #[arg(long)]
    pub display: bool,

    /// Seed of the emulator's deterministic RNG
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write every APDU frame to this file
    #[arg(long)]
    pub log_apdu_file: Option<PathBuf>,

    /// Application image loaded by the emulator
    #[arg(long)]
    pub app: Option<PathBuf>,
}

impl TargetArgs {
    pub fn into_run_config(self, golden_run: bool) -> RunConfig {
        RunConfig {
            backend: self.backend,
            device: self.device,
            display: self.display,
            seed: self.seed,
            golden_run,
            log_apdu_file: self.log_apdu_file,
            app: self.app,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(subcommand)]
        command: Commands,
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "ragger",
            "run",
            "a.yaml",
            "b.yaml",
            "--backend",
            "speculos",
            "--device",
            "stax",
            "--seed",
            "7",
            "--golden-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                scenarios,
                target,
                golden_run,
                ..
            } => {
                assert_eq!(scenarios.len(), 2);
                let run = target.into_run_config(golden_run);
                assert_eq!(run.backend, BackendKind::Emulator);
                assert_eq!(run.device, Device::STAX);
                assert_eq!(run.seed, Some(7));
                assert!(run.golden_run);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_unknown_device_is_rejected() {
        assert!(Cli::try_parse_from(["ragger", "exchange", "e0010000", "--device", "nanoz"]).is_err());
    }

    #[test]
    fn test_run_needs_a_scenario() {
        assert!(Cli::try_parse_from(["ragger", "run"]).is_err());
    }
}
