//! Test runner implementation
//!
//! Executes test scenarios against one backend. Every step works on
//! structured replies and run reports rather than on printed output.

use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;

use crate::apdu::{Command, RaisePolicy, Response};
use crate::backend;
use crate::common::config::{Config, RunConfig};
use crate::common::{Error, FailureSummary, Result};
use crate::navigator::{compare, Instruction, NavigateOptions, NavigationScenario, Navigator, RunReport};

use super::config::{PendingNavigation, ResponseExpectation, TestScenario, TestStep};

const DEFAULT_TEXT_TIMEOUT_SECS: u64 = 30;

/// Result of a test run
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
    pub failure: Option<FailureSummary>,
    /// Snapshot runs of the passed steps, in order
    pub reports: Vec<RunReport>,
}

/// Settings shared by every scenario of one invocation
#[derive(Debug, Clone, Default)]
pub struct RunnerSettings {
    /// Snapshot root, overrides the configuration file
    pub snapshots: Option<PathBuf>,
    /// Comparator name (`exact` or `sha256`)
    pub comparator: Option<String>,
    pub verbose: bool,
}

/// Load a scenario from a YAML file
pub fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse test scenario '{}': {}", path.display(), e)))
}

/// Run a test scenario from a YAML file
pub async fn run_scenario(
    path: &Path,
    run: &RunConfig,
    config: &Config,
    settings: &RunnerSettings,
) -> Result<TestResult> {
    let scenario = load_scenario(path)?;

    // Scenario overrides, with the application resolved relative to the file
    let mut run = run.clone();
    if let Some(device) = scenario.device {
        run.device = device;
    }
    if let Some(kind) = scenario.backend {
        run.backend = kind;
    }
    if let Some(app) = &scenario.app {
        let scenario_dir = path.parent().unwrap_or(Path::new("."));
        run.app = Some(if app.is_relative() {
            scenario_dir.join(app)
        } else {
            app.clone()
        });
    }

    let backend = backend::create(&run, config)?;
    let mut navigator = Navigator::from_config(backend, &run, config)?;
    if let Some(root) = &settings.snapshots {
        navigator = navigator.with_root(root.clone());
    }
    if let Some(name) = &settings.comparator {
        let comparator = compare::by_name(name)
            .ok_or_else(|| Error::Config(format!("Unknown comparator '{}'. Use exact or sha256", name)))?;
        navigator = navigator.with_comparator(comparator);
    }

    println!(
        "\n{} {} {}",
        "Running Test:".blue().bold(),
        scenario.name.white().bold(),
        format!("({} on {}, {} mode)", run.backend, run.device, navigator.mode()).dimmed()
    );

    if let Err(e) = navigator.backend_mut().open().await {
        return Ok(failed(&scenario, 0, &e, Vec::new()));
    }

    let result = execute_scenario(&mut navigator, &scenario, settings.verbose).await;

    // Cleanup: release the device or stop the emulator
    if let Err(e) = navigator.backend_mut().close().await {
        tracing::warn!("Failed to close backend: {}", e);
    }

    Ok(result)
}

/// Run every scenario in order; one that cannot be loaded or set up fails alone
pub async fn run_scenarios(
    paths: &[PathBuf],
    run: &RunConfig,
    config: &Config,
    settings: &RunnerSettings,
) -> Vec<TestResult> {
    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        let result = match run_scenario(path, run, config, settings).await {
            Ok(result) => result,
            Err(e) => {
                println!("\n{} {}: {}", "✗".red(), path.display(), e);
                TestResult::not_run(path, &e)
            }
        };
        results.push(result);
    }
    results
}

/// Run the steps of a loaded scenario on an open backend
pub async fn execute_scenario(
    navigator: &mut Navigator,
    scenario: &TestScenario,
    verbose: bool,
) -> TestResult {
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    let steps_total = scenario.steps.len();
    let mut reports = Vec::new();

    println!("\n{}", "Steps:".cyan());

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;

        match execute_step(navigator, step, step_num, verbose).await {
            Ok(report) => reports.extend(report),
            Err(e) => {
                println!("  {} Step {}: {}", "✗".red(), step_num, e);
                if let Error::SnapshotMismatch {
                    expected, actual, ..
                } = &e
                {
                    println!("      expected: {}", expected.display().to_string().dimmed());
                    println!("      actual:   {}", actual.display().to_string().dimmed());
                }
                return failed(scenario, step_num, &e, reports);
            }
        }
    }

    println!(
        "\n{} {}\n",
        "✓".green().bold(),
        "Test Passed".green().bold()
    );

    TestResult {
        name: scenario.name.clone(),
        passed: true,
        steps_run: steps_total,
        steps_total,
        error: None,
        failure: None,
        reports,
    }
}

impl TestResult {
    /// A scenario that could not be loaded or set up
    pub fn not_run(path: &Path, e: &Error) -> Self {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            passed: false,
            steps_run: 0,
            steps_total: 0,
            error: Some(e.to_string()),
            failure: Some(FailureSummary::from(e)),
            reports: Vec::new(),
        }
    }
}

fn failed(scenario: &TestScenario, steps_run: usize, e: &Error, reports: Vec<RunReport>) -> TestResult {
    TestResult {
        name: scenario.name.clone(),
        passed: false,
        steps_run,
        steps_total: scenario.steps.len(),
        error: Some(e.to_string()),
        failure: Some(FailureSummary::from(e)),
        reports,
    }
}

/// Execute a single test step
async fn execute_step(
    navigator: &mut Navigator,
    step: &TestStep,
    step_num: usize,
    verbose: bool,
) -> Result<Option<RunReport>> {
    match step {
        TestStep::Exchange {
            apdu,
            raise,
            navigate,
            expect,
        } => {
            execute_exchange_step(
                navigator,
                apdu,
                raise.as_deref(),
                navigate.as_ref(),
                expect.as_ref(),
                step_num,
                verbose,
            )
            .await
        }
        TestStep::Navigate {
            test_case,
            instructions,
            options,
        } => {
            let report =
                run_instructions(navigator, test_case.as_deref(), instructions, (*options).into())
                    .await?;
            print_navigation(step_num, "navigate", test_case.as_deref(), report.as_ref(), verbose);
            Ok(report)
        }
        TestStep::NavigateUntilText {
            test_case,
            navigate,
            validation,
            text,
            timeout,
        } => {
            let timeout = Duration::from_secs(timeout.unwrap_or(DEFAULT_TEXT_TIMEOUT_SECS));
            let report = match test_case {
                Some(test_case) => Some(
                    navigator
                        .navigate_until_text_and_compare(
                            test_case,
                            navigate,
                            validation,
                            text,
                            timeout,
                            NavigateOptions::default(),
                        )
                        .await?,
                ),
                None => {
                    navigator
                        .navigate_until_text(navigate, validation, text, timeout)
                        .await?;
                    None
                }
            };
            let label = format!("until '{}'", text);
            print_navigation(step_num, &label, test_case.as_deref(), report.as_ref(), verbose);
            Ok(report)
        }
    }
}

/// Execute an exchange step
///
/// Navigation, when present, runs between sending the command and reading
/// the reply, which is how review screens get approved.
async fn execute_exchange_step(
    navigator: &mut Navigator,
    apdu: &str,
    raise: Option<&str>,
    navigate: Option<&PendingNavigation>,
    expect: Option<&ResponseExpectation>,
    step_num: usize,
    verbose: bool,
) -> Result<Option<RunReport>> {
    let command = Command::from_hex(apdu)?;

    // An expected status is checked here, so the backend must not raise on it
    let policy = match (raise, expect.and_then(|e| e.status)) {
        (Some(raise), _) => Some(raise.parse::<RaisePolicy>()?),
        (None, Some(_)) => Some(RaisePolicy::RaiseNothing),
        (None, None) => None,
    };
    let previous = navigator.backend().raise_policy().clone();
    if let Some(policy) = policy {
        navigator.backend_mut().set_raise_policy(policy);
    }

    let outcome = exchange(navigator, &command, navigate).await;
    navigator.backend_mut().set_raise_policy(previous);
    let (response, report) = outcome?;

    if let Some(expect) = expect {
        check_response(&response, expect)?;
    }

    println!(
        "  {} Step {}: {} {} {}",
        "✓".green(),
        step_num,
        apdu.dimmed(),
        "→".dimmed(),
        response.to_string().dimmed()
    );
    if let Some(report) = &report {
        print_report(report, verbose);
    }

    Ok(report)
}

async fn exchange(
    navigator: &mut Navigator,
    command: &Command,
    navigate: Option<&PendingNavigation>,
) -> Result<(Response, Option<RunReport>)> {
    let Some(navigate) = navigate else {
        let response = navigator.backend_mut().exchange(command).await?;
        return Ok((response, None));
    };

    navigator.backend_mut().send(command).await?;
    let report = match navigate_pending(navigator, navigate).await {
        Ok(report) => report,
        Err(e) => {
            // the reply to the sent command may still arrive
            navigator.backend_mut().drop_connection("navigation failed mid-exchange").await;
            return Err(e);
        }
    };
    let response = navigator.backend_mut().receive().await?;
    Ok((response, report))
}

async fn navigate_pending(
    navigator: &mut Navigator,
    navigate: &PendingNavigation,
) -> Result<Option<RunReport>> {
    match navigate {
        PendingNavigation::Flow {
            flow,
            test_case,
            text,
        } => match text {
            Some(text) => {
                let scenario = NavigationScenario::new(*flow, navigator.backend().device())
                    .with_text(text);
                run_until_text(navigator, test_case.as_deref(), &scenario).await
            }
            None => navigator.run_flow(*flow, test_case.as_deref()).await,
        },
        PendingNavigation::Instructions {
            test_case,
            instructions,
            options,
        } => run_instructions(navigator, test_case.as_deref(), instructions, (*options).into()).await,
    }
}

async fn run_until_text(
    navigator: &mut Navigator,
    test_case: Option<&str>,
    scenario: &NavigationScenario,
) -> Result<Option<RunReport>> {
    let timeout = Duration::from_secs(DEFAULT_TEXT_TIMEOUT_SECS);
    match test_case {
        Some(test_case) => navigator
            .navigate_until_text_and_compare(
                test_case,
                &scenario.navigate,
                &scenario.validation,
                &scenario.text,
                timeout,
                NavigateOptions::default(),
            )
            .await
            .map(Some),
        None => navigator
            .navigate_until_text(&scenario.navigate, &scenario.validation, &scenario.text, timeout)
            .await
            .map(|_| None),
    }
}

async fn run_instructions(
    navigator: &mut Navigator,
    test_case: Option<&str>,
    instructions: &[Instruction],
    options: NavigateOptions,
) -> Result<Option<RunReport>> {
    match test_case {
        Some(test_case) => navigator
            .navigate_and_compare(test_case, instructions, options)
            .await
            .map(Some),
        None => navigator.navigate(instructions).await.map(|_| None),
    }
}

fn check_response(response: &Response, expect: &ResponseExpectation) -> Result<()> {
    if let Some(status) = expect.status {
        if response.status != status {
            return Err(Error::TestAssertion(format!(
                "Status mismatch: expected 0x{:04x}, got 0x{:04x}",
                status, response.status
            )));
        }
    }

    let data = hex::encode(&response.data);
    if let Some(expected) = &expect.data {
        if !data.eq_ignore_ascii_case(expected) {
            return Err(Error::TestAssertion(format!(
                "Data mismatch: expected '{}', got '{}'",
                expected, data
            )));
        }
    }
    if let Some(part) = &expect.data_contains {
        if !data.contains(&part.to_ascii_lowercase()) {
            return Err(Error::TestAssertion(format!(
                "Data '{}' does not contain '{}'",
                data, part
            )));
        }
    }

    Ok(())
}

fn print_navigation(
    step_num: usize,
    label: &str,
    test_case: Option<&str>,
    report: Option<&RunReport>,
    verbose: bool,
) {
    let target = test_case.unwrap_or("no snapshots");
    println!(
        "  {} Step {}: {} {}",
        "✓".green(),
        step_num,
        label,
        format!("({})", target).dimmed()
    );
    if let Some(report) = report {
        print_report(report, verbose);
    }
}

fn print_report(report: &RunReport, verbose: bool) {
    use crate::navigator::StepOutcome;

    println!(
        "      {} matched, {} recorded, {} skipped",
        report.count(StepOutcome::Matched),
        report.count(StepOutcome::Recorded),
        report.count(StepOutcome::Skipped)
    );
    if verbose {
        for step in &report.steps {
            println!(
                "      {:05} {} {}",
                step.index,
                step.instruction.dimmed(),
                format!("{:?}", step.outcome).to_lowercase()
            );
        }
    }
    for path in &report.removed {
        println!("      removed stale {}", path.display().to_string().dimmed());
    }
}
