//! Common utilities: errors, configuration, logging and paths

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, FailureSummary, Result};
