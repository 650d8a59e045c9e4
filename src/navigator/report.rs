//! Per-step outcomes of a navigation run

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Whether a run checks captures against goldens or regenerates them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Compare,
    /// Opt-in: overwrites the goldens
    Record,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Compare => write!(f, "compare"),
            Mode::Record => write!(f, "record"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    /// Capture equals its golden
    Matched,
    /// Capture written as the new golden
    Recorded,
    /// Backend cannot capture; the instruction ran unchecked
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub instruction: String,
    pub outcome: StepOutcome,
    /// Where the capture of this step was kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub test_case: String,
    pub mode: Mode,
    pub steps: Vec<StepReport>,
    /// Goldens deleted because the recorded flow got shorter
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<PathBuf>,
}

impl RunReport {
    pub fn new(test_case: &str, mode: Mode) -> Self {
        Self {
            test_case: test_case.to_string(),
            mode,
            steps: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, instruction: String, outcome: StepOutcome, capture: Option<PathBuf>) {
        self.steps.push(StepReport {
            index: self.steps.len(),
            instruction,
            outcome,
            capture,
        });
    }

    pub fn outcomes(&self) -> Vec<StepOutcome> {
        self.steps.iter().map(|s| s.outcome).collect()
    }

    pub fn count(&self, outcome: StepOutcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }
}
