//! APDU exchanges over a real socket
//!
//! A fake device listens on a loopback TCP port, the way the Bluetooth
//! bridge does, and answers each command with the next scripted status.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ragger::apdu::codec::{read_command, write_reply};
use ragger::backend::{self, BackendKind};
use ragger::common::config::{Config, RunConfig};
use ragger::{Command, Error, RaisePolicy, Response};

/// Serve scripted replies to one connection, returning the commands seen
async fn fake_device(replies: Vec<Response>) -> (u16, JoinHandle<Vec<Command>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut replies: VecDeque<Response> = replies.into();
        let mut seen = Vec::new();
        while let Some(reply) = replies.pop_front() {
            let Ok(command) = read_command(&mut stream).await else {
                break;
            };
            seen.push(command);
            write_reply(&mut stream, &reply).await.unwrap();
        }
        seen
    });

    (port, handle)
}

fn wireless(port: u16) -> (RunConfig, Config) {
    let run = RunConfig {
        backend: BackendKind::Wireless,
        ..RunConfig::default()
    };
    let mut config = Config::default();
    config.wireless.host = "127.0.0.1".to_string();
    config.wireless.port = port;
    (run, config)
}

fn get_version() -> Command {
    Command::empty(0xe0, 0x01, 0x00, 0x00)
}

#[tokio::test]
async fn test_raise_nothing_returns_error_status() {
    let (port, device) = fake_device(vec![Response::new(vec![], 0x6f00)]).await;
    let (run, config) = wireless(port);

    let mut backend = backend::create(&run, &config)
        .unwrap()
        .with_raise_policy(RaisePolicy::RaiseNothing);
    backend.open().await.unwrap();

    let response = backend.exchange(&get_version()).await.unwrap();
    assert_eq!(response.status, 0x6f00);
    assert!(response.data.is_empty());

    backend.close().await.unwrap();
    assert_eq!(device.await.unwrap(), vec![get_version()]);
}

#[tokio::test]
async fn test_raise_all_rejects_success() {
    let (port, _device) = fake_device(vec![Response::new(vec![0x01, 0x02], 0x9000)]).await;
    let (run, config) = wireless(port);

    let mut backend = backend::create(&run, &config)
        .unwrap()
        .with_raise_policy(RaisePolicy::RaiseAll);
    backend.open().await.unwrap();

    let err = backend.exchange(&get_version()).await.unwrap_err();
    match &err {
        Error::Protocol { response } => {
            assert_eq!(response.status, 0x9000);
            assert_eq!(response.data, vec![0x01, 0x02]);
        }
        other => panic!("expected a protocol error, got {other:?}"),
    }
    assert_eq!(err.status(), Some(0x9000));
}

#[tokio::test]
async fn test_split_exchange_over_socket() {
    let signature = vec![0x30, 0x44, 0x02, 0x20];
    let (port, device) = fake_device(vec![
        Response::new(signature.clone(), 0x9000),
        Response::new(vec![], 0x9000),
    ])
    .await;
    let (run, config) = wireless(port);

    let mut backend = backend::create(&run, &config).unwrap();
    backend.open().await.unwrap();

    let sign = Command::new(0xe0, 0x04, 0x00, 0x00, vec![0xaa; 8]).unwrap();
    backend.send(&sign).await.unwrap();
    assert!(matches!(
        backend.send(&get_version()).await,
        Err(Error::ExchangeInFlight)
    ));
    // gestures are accepted while the reply is pending
    backend.right_click().await.unwrap();
    backend.both_click().await.unwrap();

    let response = backend.receive().await.unwrap();
    assert_eq!(response.data, signature);
    assert_eq!(backend.last_async_response(), Some(&response));

    // the link is free again
    backend.exchange(&get_version()).await.unwrap();
    backend.close().await.unwrap();
    assert_eq!(device.await.unwrap(), vec![sign, get_version()]);
}

#[tokio::test]
async fn test_apdu_log_records_both_directions() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("logs").join("apdu.log");
    let (port, _device) = fake_device(vec![Response::new(vec![0x01], 0x9000)]).await;
    let (mut run, config) = wireless(port);
    run.log_apdu_file = Some(log.clone());

    let mut backend = backend::create(&run, &config).unwrap();
    backend.open().await.unwrap();
    backend.exchange(&get_version()).await.unwrap();
    backend.close().await.unwrap();

    let content = std::fs::read_to_string(&log).unwrap();
    assert_eq!(content.lines().collect::<Vec<_>>(), vec!["=> e001000000", "<= 019000"]);
}

#[tokio::test]
async fn test_unreachable_bridge_is_a_connection_error() {
    // bind then drop to get a port nobody listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let (run, config) = wireless(port);

    let mut backend = backend::create(&run, &config).unwrap();
    assert!(matches!(backend.open().await, Err(Error::Connection(_))));
    assert!(!backend.is_open());
}

#[tokio::test]
async fn test_late_reply_never_answers_the_next_command() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let device = tokio::spawn(async move {
        // first connection answers too late
        let (mut slow, _) = listener.accept().await.unwrap();
        let first = read_command(&mut slow).await.unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = write_reply(&mut slow, &Response::new(vec![0x01], 0x9000)).await;
        });

        let (mut fresh, _) = listener.accept().await.unwrap();
        let second = read_command(&mut fresh).await.unwrap();
        write_reply(&mut fresh, &Response::new(vec![0x02], 0x9000))
            .await
            .unwrap();
        vec![first, second]
    });

    let (run, config) = wireless(port);
    let mut backend = backend::create(&run, &config)
        .unwrap()
        .with_exchange_timeout(Duration::from_millis(50));
    backend.open().await.unwrap();

    let sign = Command::new(0xe0, 0x04, 0x00, 0x00, vec![0xaa; 4]).unwrap();
    assert!(matches!(
        backend.exchange(&sign).await,
        Err(Error::Timeout(..))
    ));
    assert!(!backend.is_open());
    assert!(matches!(
        backend.exchange(&get_version()).await,
        Err(Error::NotOpen)
    ));

    // a new connection only sees replies to its own commands
    backend.open().await.unwrap();
    let response = backend.exchange(&get_version()).await.unwrap();
    assert_eq!(response.data, vec![0x02]);
    backend.close().await.unwrap();

    assert_eq!(device.await.unwrap(), vec![sign, get_version()]);
}
