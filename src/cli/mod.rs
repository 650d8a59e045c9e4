//! CLI command handling
//!
//! Dispatches CLI commands to the backend and the scenario runner and
//! formats output.

use colored::Colorize;

use crate::apdu::{Command, RaisePolicy};
use crate::backend;
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::screen::Device;
use crate::testing::{self, RunnerSettings, TestResult};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            scenarios,
            target,
            golden_run,
            snapshots,
            comparator,
            verbose,
        } => {
            let config = Config::load()?;
            let run = target.into_run_config(golden_run);
            let settings = RunnerSettings {
                snapshots,
                comparator,
                verbose,
            };

            let results = testing::run_scenarios(&scenarios, &run, &config, &settings).await;

            print_summary(&results);

            let failed = results.iter().filter(|r| !r.passed).count();
            if failed > 0 {
                return Err(Error::TestAssertion(format!(
                    "{} of {} scenarios failed",
                    failed,
                    results.len()
                )));
            }
            Ok(())
        }

        Commands::Exchange { apdu, target, raise } => {
            let config = Config::load()?;
            let command = Command::from_hex(&apdu)?;
            let policy: RaisePolicy = raise.parse()?;
            let run = target.into_run_config(false);

            let mut backend = backend::create(&run, &config)?.with_raise_policy(policy);
            backend.open().await?;
            let result = backend.exchange(&command).await;
            backend.close().await?;

            let response = result?;
            println!("{}", response);
            Ok(())
        }

        Commands::Devices { json } => {
            if json {
                let devices: Vec<serde_json::Value> = Device::ALL
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "name": d.name,
                            "touchscreen": d.is_touchscreen,
                            "resolution": [d.resolution.0, d.resolution.1],
                            "sdk": d.sdk_version().to_string(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else {
                println!("Devices:");
                for d in Device::ALL {
                    let input = if d.is_touchscreen { "touch" } else { "buttons" };
                    println!(
                        "  {:<8} {:>3}x{:<4} {:<8} sdk {}",
                        d.name,
                        d.resolution.0,
                        d.resolution.1,
                        input,
                        d.sdk_version()
                    );
                }
            }
            Ok(())
        }
    }
}

fn print_summary(results: &[TestResult]) {
    if results.len() < 2 {
        return;
    }

    println!("{}", "Summary:".cyan());
    for result in results {
        if result.passed {
            println!("  {} {}", "✓".green(), result.name);
        } else if result.steps_total == 0 {
            println!(
                "  {} {}: {}",
                "✗".red(),
                result.name,
                result.error.as_deref().unwrap_or("failed")
            );
        } else {
            println!(
                "  {} {} (step {}/{}): {}",
                "✗".red(),
                result.name,
                result.steps_run,
                result.steps_total,
                result.error.as_deref().unwrap_or("failed")
            );
        }
    }
}
