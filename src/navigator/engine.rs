//! Navigation engine
//!
//! Runs instructions strictly in order. In compare mode each step's capture
//! is checked against its golden and the first mismatch ends the run; in
//! record mode the capture becomes the golden. Nothing is retried: a step
//! that is re-run would act on a screen its golden was not taken from.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

use crate::backend::Backend;
use crate::common::config::{Config, RunConfig};
use crate::common::{Error, Result};
use crate::screen::UseCaseRegistry;

use super::compare::{ExactBytes, ImageComparator};
use super::instruction::{Gesture, Instruction, WaitCondition};
use super::report::{Mode, RunReport, StepOutcome};
use super::snapshots::SnapshotStore;

const DEFAULT_SCREEN_CHANGE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// When a step waits for the screen to change before its capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Wait for the first instruction's effect instead of capturing right away
    pub screen_change_before_first_instruction: bool,
    /// Wait for the last instruction's effect (off when it leaves the screen as is)
    pub screen_change_after_last_instruction: bool,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            screen_change_before_first_instruction: true,
            screen_change_after_last_instruction: true,
        }
    }
}

/// State of one comparing or recording run
struct Run {
    store: SnapshotStore,
    report: RunReport,
    capture: bool,
}

pub struct Navigator {
    backend: Backend,
    registry: UseCaseRegistry,
    root: PathBuf,
    mode: Mode,
    comparator: Box<dyn ImageComparator>,
    screen_change_timeout: Duration,
    settle: Duration,
}

impl Navigator {
    /// Navigator in compare mode, storing snapshots under `root`
    pub fn new(backend: Backend, root: impl Into<PathBuf>) -> Result<Self> {
        let registry = UseCaseRegistry::for_device(*backend.device())?;
        Ok(Self {
            backend,
            registry,
            root: root.into(),
            mode: Mode::Compare,
            comparator: Box::new(ExactBytes),
            screen_change_timeout: DEFAULT_SCREEN_CHANGE_TIMEOUT,
            settle: DEFAULT_SETTLE,
        })
    }

    /// Navigator set up from the run options and the configuration file
    ///
    /// Record mode is only entered when the run explicitly asks for a
    /// golden run.
    pub fn from_config(backend: Backend, run: &RunConfig, config: &Config) -> Result<Self> {
        let navigator = Self::new(backend, config.navigation.snapshots_root.clone())?
            .with_screen_change_timeout(config.timeouts.screen_change())
            .with_settle(config.navigation.settle());
        Ok(if run.golden_run {
            navigator.with_mode(Mode::Record)
        } else {
            navigator
        })
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_comparator(mut self, comparator: Box<dyn ImageComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_screen_change_timeout(mut self, timeout: Duration) -> Self {
        self.screen_change_timeout = timeout;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Backend access for exchanges interleaved with navigation
    pub fn backend_mut(&mut self) -> &mut Backend {
        &mut self.backend
    }

    pub fn into_backend(self) -> Backend {
        self.backend
    }

    pub fn registry(&self) -> &UseCaseRegistry {
        &self.registry
    }

    /// Run instructions without capturing anything
    pub async fn navigate(&mut self, instructions: &[Instruction]) -> Result<()> {
        for instruction in instructions {
            self.execute(instruction, None).await?;
            if !instruction.is_wait() {
                tokio::time::sleep(self.settle).await;
            }
        }
        Ok(())
    }

    /// Run instructions, checking or recording one snapshot per instruction
    ///
    /// Snapshot `i` is the screen after instruction `i`.
    pub async fn navigate_and_compare(
        &mut self,
        test_case: &str,
        instructions: &[Instruction],
        options: NavigateOptions,
    ) -> Result<RunReport> {
        let mut run = self.begin(test_case)?;
        let mut previous = self.initial_context(&run, options).await?;

        let last = instructions.len().saturating_sub(1);
        for (index, instruction) in instructions.iter().enumerate() {
            self.execute(instruction, previous.as_deref()).await?;
            let wait = index < last || options.screen_change_after_last_instruction;
            previous = self
                .check_step(&mut run, index, instruction, previous, wait)
                .await?;
        }
        self.finish(run)
    }

    /// Repeat `navigate` until the screen shows `text`, then run `validation`
    pub async fn navigate_until_text(
        &mut self,
        navigate: &Instruction,
        validation: &[Instruction],
        text: &str,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while !self.backend.compare_screen_with_text(text).await? {
            if Instant::now() >= deadline {
                return Err(Error::timeout(timeout, &format!("text '{}'", text)));
            }
            self.execute(navigate, None).await?;
            tokio::time::sleep(self.settle).await;
        }
        self.navigate(validation).await
    }

    /// [`Navigator::navigate_until_text`] with one snapshot per visited screen
    pub async fn navigate_until_text_and_compare(
        &mut self,
        test_case: &str,
        navigate: &Instruction,
        validation: &[Instruction],
        text: &str,
        timeout: Duration,
        options: NavigateOptions,
    ) -> Result<RunReport> {
        let mut run = self.begin(test_case)?;
        let mut previous = self.initial_context(&run, options).await?;
        let mut index = 0;

        let deadline = Instant::now() + timeout;
        while !self.backend.compare_screen_with_text(text).await? {
            if Instant::now() >= deadline {
                return Err(Error::timeout(timeout, &format!("text '{}'", text)));
            }
            self.execute(navigate, previous.as_deref()).await?;
            previous = self
                .check_step(&mut run, index, navigate, previous, true)
                .await?;
            index += 1;
        }

        let last = validation.len().saturating_sub(1);
        for (i, instruction) in validation.iter().enumerate() {
            self.execute(instruction, previous.as_deref()).await?;
            let wait = i < last || options.screen_change_after_last_instruction;
            previous = self
                .check_step(&mut run, index, instruction, previous, wait)
                .await?;
            index += 1;
        }
        self.finish(run)
    }

    fn begin(&self, test_case: &str) -> Result<Run> {
        let store = SnapshotStore::new(&self.root, self.backend.device(), test_case)?;
        let capture = self.backend.has_screen_capture();
        if self.mode == Mode::Record && !capture {
            return Err(Error::RecordUnsupported(self.backend.kind().to_string()));
        }
        if capture {
            store.reset_tmp()?;
        } else {
            tracing::warn!(
                "{} backend cannot capture the screen, steps of '{}' are not checked",
                self.backend.kind(),
                test_case
            );
        }
        tracing::info!(
            "Navigating '{}' on {} ({} mode, {} comparison)",
            test_case,
            self.backend.device(),
            self.mode,
            self.comparator.name()
        );
        Ok(Run {
            store,
            report: RunReport::new(test_case, self.mode),
            capture,
        })
    }

    async fn initial_context(&mut self, run: &Run, options: NavigateOptions) -> Result<Option<Vec<u8>>> {
        if run.capture && options.screen_change_before_first_instruction {
            Ok(Some(self.backend.screenshot().await?))
        } else {
            Ok(None)
        }
    }

    /// Capture the screen after step `index` and check or record it
    async fn check_step(
        &mut self,
        run: &mut Run,
        index: usize,
        instruction: &Instruction,
        previous: Option<Vec<u8>>,
        wait: bool,
    ) -> Result<Option<Vec<u8>>> {
        if !run.capture {
            tokio::time::sleep(self.settle).await;
            run.report.push(instruction.to_string(), StepOutcome::Skipped, None);
            return Ok(None);
        }

        let current = match previous {
            Some(context) if wait && !instruction.is_wait() => {
                self.backend
                    .wait_for_screen_change(&context, self.screen_change_timeout)
                    .await?
            }
            _ => {
                tokio::time::sleep(self.settle).await;
                self.backend.screenshot().await?
            }
        };
        let actual = run.store.save_tmp(index, &current)?;

        let outcome = match self.mode {
            Mode::Compare => {
                let expected = run.store.golden_path(index);
                let golden = run
                    .store
                    .read_golden(index)?
                    .ok_or_else(|| Error::MissingGolden {
                        step: index,
                        path: expected.clone(),
                    })?;
                if !self.comparator.images_match(&golden, &current) {
                    tracing::error!("Step {} ({}) does not match {}", index, instruction, expected.display());
                    return Err(Error::SnapshotMismatch {
                        step: index,
                        expected,
                        actual,
                    });
                }
                StepOutcome::Matched
            }
            Mode::Record => {
                run.store.record(index, &current)?;
                StepOutcome::Recorded
            }
        };
        tracing::info!("Step {} ({}): {:?}", index, instruction, outcome);
        run.report.push(instruction.to_string(), outcome, Some(actual));
        Ok(Some(current))
    }

    fn finish(&self, mut run: Run) -> Result<RunReport> {
        if run.capture && self.mode == Mode::Record {
            run.report.removed = run.store.remove_stale(run.report.steps.len())?;
            for path in &run.report.removed {
                tracing::info!("Removed stale golden {}", path.display());
            }
        }
        Ok(run.report)
    }

    async fn execute(&mut self, instruction: &Instruction, context: Option<&[u8]>) -> Result<()> {
        tracing::debug!("Executing {}", instruction);
        match instruction {
            Instruction::UseCase {
                use_case,
                action,
                arg,
            } => {
                self.registry
                    .perform(&mut self.backend, use_case, action, arg)
                    .await
            }
            Instruction::Gesture(Gesture::Press(button)) => self.backend.press(*button).await,
            Instruction::Gesture(Gesture::Touch { at, hold }) => {
                self.backend.finger_touch(*at, *hold).await
            }
            Instruction::Gesture(Gesture::Swipe { at, direction }) => {
                self.backend.finger_swipe(*at, *direction).await
            }
            Instruction::Wait(WaitCondition::Duration(pause)) => {
                tokio::time::sleep(*pause).await;
                Ok(())
            }
            Instruction::Wait(WaitCondition::ScreenChange) => {
                if !self.backend.has_screen_capture() {
                    tokio::time::sleep(self.settle).await;
                    return Ok(());
                }
                let context = match context {
                    Some(context) => context.to_vec(),
                    None => self.backend.screenshot().await?,
                };
                self.backend
                    .wait_for_screen_change(&context, self.screen_change_timeout)
                    .await
                    .map(|_| ())
            }
            Instruction::Wait(WaitCondition::Text(text)) => {
                self.backend
                    .wait_for_text(text, self.screen_change_timeout)
                    .await
            }
        }
    }
}
