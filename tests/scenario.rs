//! Scenario files played against a scripted device

use std::path::{Path, PathBuf};
use std::time::Duration;

use ragger::backend::mock::MockDevice;
use ragger::navigator::{Mode, Navigator, StepOutcome};
use ragger::testing::{execute_scenario, load_scenario, TestResult};
use ragger::{Backend, Response};

fn scenario_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("scenarios")
        .join("nano_sign.yaml")
}

fn device() -> MockDevice {
    MockDevice::new()
        .reply(Response::new(vec![0x01, 0x02, 0x03], 0x9000))
        .reply(Response::new(vec![0x30, 0x44, 0x02, 0x20], 0x9000))
        .reply(Response::new(vec![], 0x6985))
        .screens([vec![0], vec![1], vec![2], vec![3]])
}

async fn play(mock: MockDevice, root: &Path, mode: Mode) -> TestResult {
    let scenario = load_scenario(&scenario_path()).unwrap();
    let device = scenario.device.unwrap();

    let mut backend =
        Backend::new(Box::new(mock), device).with_poll_interval(Duration::from_millis(1));
    backend.open().await.unwrap();
    let mut navigator = Navigator::new(backend, root)
        .unwrap()
        .with_mode(mode)
        .with_settle(Duration::ZERO)
        .with_screen_change_timeout(Duration::from_millis(300));

    execute_scenario(&mut navigator, &scenario, false).await
}

#[tokio::test]
async fn test_record_then_compare_scenario() {
    let dir = tempfile::tempdir().unwrap();

    let recorded = play(device(), dir.path(), Mode::Record).await;
    assert!(recorded.passed, "{:?}", recorded.error);
    assert_eq!(recorded.steps_run, 3);
    assert_eq!(recorded.reports[0].outcomes(), vec![StepOutcome::Recorded; 3]);

    let compared = play(device(), dir.path(), Mode::Compare).await;
    assert!(compared.passed, "{:?}", compared.error);
    assert_eq!(compared.reports[0].outcomes(), vec![StepOutcome::Matched; 3]);
}

#[tokio::test]
async fn test_changed_screen_fails_with_summary() {
    let dir = tempfile::tempdir().unwrap();
    let recorded = play(device(), dir.path(), Mode::Record).await;
    assert!(recorded.passed, "{:?}", recorded.error);

    let changed = MockDevice::new()
        .reply(Response::new(vec![0x01, 0x02, 0x03], 0x9000))
        .reply(Response::new(vec![0x30, 0x44, 0x02, 0x20], 0x9000))
        .screens([vec![0], vec![1], vec![7], vec![3]]);
    let journal = changed.journal();
    let result = play(changed, dir.path(), Mode::Compare).await;

    assert!(!result.passed);
    assert_eq!(result.steps_run, 2);
    let failure = result.failure.unwrap();
    assert_eq!(failure.code, "SNAPSHOT_MISMATCH");
    assert_eq!(failure.step, Some(1));
    assert!(failure
        .expected
        .unwrap()
        .ends_with("snapshots/nanosp/nano_sign/00001.png"));
    // the signing reply was never read, the last exchange never sent
    assert_eq!(journal.commands().len(), 2);
}
