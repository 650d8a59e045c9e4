//! ragger - test harness for secure-device applications
//!
//! This library exchanges APDUs with a device application running in the
//! emulator or on hardware, drives its screen with buttons or touch
//! gestures, and compares every visited screen with golden snapshots.

pub mod apdu;
pub mod backend;
pub mod cli;
pub mod commands;
pub mod common;
pub mod navigator;
pub mod screen;
pub mod testing;

// Re-export commonly used types for tests
pub use apdu::{Command, RaisePolicy, Response};
pub use backend::{Backend, BackendKind};
pub use common::{Error, Result};
pub use navigator::{Instruction, NavigateOptions, Navigator};
pub use screen::Device;
