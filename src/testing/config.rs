//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML test scenarios.
//!
//! ```yaml
//! name: Sign a simple transfer
//! app: ../build/stax/bin/app.elf
//! device: stax
//! steps:
//!   - action: exchange
//!     apdu: e004000015058000002c
//!     navigate:
//!       flow: review_approve
//!       test_case: sign_simple
//!     expect:
//!       status: 0x9000
//!   - action: navigate
//!     test_case: settings
//!     instructions: [home.settings, settings.multi_page_exit]
//! ```

use std::path::PathBuf;

use serde::Deserialize;

use crate::backend::BackendKind;
use crate::navigator::{Flow, Instruction, NavigateOptions};
use crate::screen::Device;

/// A complete test scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// Application image, relative to the scenario file
    pub app: Option<PathBuf>,
    /// Device model, overrides the command line
    pub device: Option<Device>,
    /// Backend variant, overrides the command line
    pub backend: Option<BackendKind>,
    /// The sequence of test steps to execute
    pub steps: Vec<TestStep>,
}

/// A single test step in the execution flow
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Send one APDU, optionally driving the screen while it is pending
    Exchange {
        /// Command APDU in hex
        apdu: String,
        /// Raise policy for this exchange (`nothing`, `all`, `all-but-success`, `custom:..`)
        raise: Option<String>,
        /// Navigation performed before the reply is read
        navigate: Option<PendingNavigation>,
        /// Expected reply
        expect: Option<ResponseExpectation>,
    },
    /// Walk the screens, checking one golden snapshot per instruction
    Navigate {
        /// Snapshot directory name; without it nothing is captured
        test_case: Option<String>,
        instructions: Vec<Instruction>,
        #[serde(default)]
        options: NavigationOptions,
    },
    /// Page until a text shows up, then validate
    NavigateUntilText {
        test_case: Option<String>,
        navigate: Instruction,
        validation: Vec<Instruction>,
        text: String,
        /// Timeout in seconds (default: 30)
        timeout: Option<u64>,
    },
}

/// Navigation run while an exchange waits for its reply
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum PendingNavigation {
    /// One of the stock review flows
    Flow {
        flow: Flow,
        test_case: Option<String>,
        /// Stop text, when the app words its review differently
        text: Option<String>,
    },
    /// Explicit instructions
    Instructions {
        test_case: Option<String>,
        instructions: Vec<Instruction>,
        #[serde(default)]
        options: NavigationOptions,
    },
}

/// When steps wait for a screen change before their capture
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct NavigationOptions {
    #[serde(default = "default_true")]
    pub screen_change_before_first_instruction: bool,
    #[serde(default = "default_true")]
    pub screen_change_after_last_instruction: bool,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            screen_change_before_first_instruction: true,
            screen_change_after_last_instruction: true,
        }
    }
}

impl From<NavigationOptions> for NavigateOptions {
    fn from(options: NavigationOptions) -> Self {
        NavigateOptions {
            screen_change_before_first_instruction: options.screen_change_before_first_instruction,
            screen_change_after_last_instruction: options.screen_change_after_last_instruction,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Expectations for an exchange reply
#[derive(Deserialize, Debug, Default)]
pub struct ResponseExpectation {
    /// Expected status word
    pub status: Option<u16>,
    /// Expected reply data in hex (exact match)
    pub data: Option<String>,
    /// Expected hex substring of the reply data
    pub data_contains: Option<String>,
}
