//! ragger - drive secure-device applications over APDU from the command line
//!
//! Runs YAML test scenarios against the emulator or a physical device and
//! checks every navigated screen against golden snapshots.

use clap::Parser;
use commands::Commands;
use ragger::common::logging;
use ragger::{cli, commands};

#[derive(Parser)]
#[command(name = "ragger", about = "Device application test harness")]
#[command(version, long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG still takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.debug {
        logging::init_cli_with(logging::VERBOSE_FILTER);
    } else {
        logging::init_cli();
    }

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
