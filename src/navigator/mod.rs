//! Navigation and golden snapshot engine

pub mod compare;
pub mod engine;
pub mod instruction;
pub mod report;
pub mod scenario;
pub mod snapshots;

pub use compare::{ExactBytes, ImageComparator, Sha256Digest};
pub use engine::{NavigateOptions, Navigator};
pub use instruction::{Gesture, Instruction, WaitCondition};
pub use report::{Mode, RunReport, StepOutcome, StepReport};
pub use scenario::{Flow, NavigationScenario};
pub use snapshots::SnapshotStore;
