//! Scenario runner
//!
//! Reads YAML test scenarios and plays them against a backend: APDU
//! exchanges with their expected replies, and screen navigation checked
//! against golden snapshots.

mod config;
mod runner;

pub use config::*;
pub use runner::{execute_scenario, load_scenario, run_scenario, run_scenarios, RunnerSettings, TestResult};
