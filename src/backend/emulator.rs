//! Emulator backend
//!
//! Spawns the emulator on the application image, then talks to it on two
//! channels: framed APDUs over its TCP APDU port, and gestures plus screen
//! captures over its HTTP automation API.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::common::config::EmulatorConfig;
use crate::common::{Error, Result};
use crate::screen::{Device, Position};

use super::link::FramedLink;
use super::transport::Transport;
use super::{BackendKind, Button, SwipeDirection};

/// Interval between readiness probes of the automation API
const READY_POLL: Duration = Duration::from_millis(200);

/// Distance covered by a swipe, in pixels
const SWIPE_DISTANCE: u16 = 150;

pub struct EmulatorTransport {
    settings: EmulatorConfig,
    app: PathBuf,
    device: Device,
    display: bool,
    seed: Option<u64>,
    process: Option<Child>,
    link: Option<FramedLink<TcpStream>>,
    http: reqwest::Client,
}

impl EmulatorTransport {
    pub fn new(
        settings: EmulatorConfig,
        app: PathBuf,
        device: Device,
        display: bool,
        seed: Option<u64>,
    ) -> Self {
        Self {
            settings,
            app,
            device,
            display,
            seed,
            process: None,
            link: None,
            http: reqwest::Client::new(),
        }
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "http://{}:{}/{}",
            self.settings.host, self.settings.api_port, endpoint
        )
    }

    fn link(&mut self) -> Result<&mut FramedLink<TcpStream>> {
        self.link.as_mut().ok_or(Error::NotOpen)
    }

    async fn spawn(&mut self) -> Result<()> {
        validate_app(&self.app)?;

        let executable = which::which(&self.settings.executable).map_err(|_| {
            Error::Startup(format!(
                "emulator '{}' not found. Install it or set [emulator] executable",
                self.settings.executable
            ))
        })?;
        let args = emulator_args(&self.settings, &self.app, &self.device, self.display, self.seed);
        tracing::info!("Starting {} {}", executable.display(), args.join(" "));

        let child = Command::new(&executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Startup(format!("Failed to start {}: {}", executable.display(), e))
            })?;
        self.process = Some(child);

        if let Err(e) = self.wait_until_ready().await {
            self.kill().await;
            return Err(e);
        }
        Ok(())
    }

    /// Poll the automation API until it answers or the startup budget runs out
    async fn wait_until_ready(&mut self) -> Result<()> {
        let budget = self.settings.startup_timeout();
        let deadline = Instant::now() + budget;
        let url = self.api_url("events?currentscreenonly=true");
        loop {
            if let Some(process) = self.process.as_mut() {
                if let Some(status) = process.try_wait()? {
                    return Err(Error::Startup(format!(
                        "emulator exited during startup ({})",
                        status
                    )));
                }
            }
            match self.http.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("Emulator API ready");
                    return Ok(());
                }
                Ok(response) => tracing::trace!("Emulator API not ready: {}", response.status()),
                Err(e) => tracing::trace!("Emulator API not ready: {}", e),
            }
            if Instant::now() >= deadline {
                return Err(Error::Startup(format!(
                    "emulator API did not come up within {:?}",
                    budget
                )));
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    async fn kill(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill().await {
                tracing::warn!("Failed to stop emulator: {}", e);
            }
        }
    }

    async fn post(&self, endpoint: &str, body: serde_json::Value) -> Result<()> {
        let response = self
            .http
            .post(self.api_url(endpoint))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "POST /{} returned {}",
                endpoint,
                response.status()
            )));
        }
        Ok(())
    }

    async fn finger(&self, action: &str, at: Position, delay: Option<Duration>) -> Result<()> {
        let mut body = json!({ "action": action, "x": at.x, "y": at.y });
        if let Some(delay) = delay {
            body["delay"] = json!(delay.as_secs_f64());
        }
        self.post("finger", body).await
    }
}

/// Command line of the emulator process
pub fn emulator_args(
    settings: &EmulatorConfig,
    app: &Path,
    device: &Device,
    display: bool,
    seed: Option<u64>,
) -> Vec<String> {
    let mut args = vec![
        app.display().to_string(),
        "--model".to_string(),
        device.name.to_string(),
        "--sdk".to_string(),
        device.sdk_version().to_string(),
        "--display".to_string(),
        if display { "qt" } else { "headless" }.to_string(),
        "--api-port".to_string(),
        settings.api_port.to_string(),
        "--apdu-port".to_string(),
        settings.apdu_port.to_string(),
    ];
    if let Some(seed) = seed {
        args.push("--deterministic-rng".to_string());
        args.push(seed.to_string());
    }
    if let Some(mnemonic) = &settings.mnemonic {
        args.push("--seed".to_string());
        args.push(mnemonic.clone());
    }
    args.extend(settings.args.iter().cloned());
    args
}

fn validate_app(app: &Path) -> Result<()> {
    if !app.exists() {
        return Err(Error::path(app, "no such file"));
    }
    if !app.is_file() {
        return Err(Error::path(app, "not a regular file"));
    }
    Ok(())
}

/// End point of a swipe starting at `at`, clamped to the screen
fn swipe_end(device: &Device, at: Position, direction: SwipeDirection) -> Position {
    let (width, height) = device.resolution;
    match direction {
        SwipeDirection::Left => Position::new(at.x.saturating_sub(SWIPE_DISTANCE), at.y),
        SwipeDirection::Right => {
            Position::new(at.x.saturating_add(SWIPE_DISTANCE).min(width.saturating_sub(1)), at.y)
        }
        SwipeDirection::Up => Position::new(at.x, at.y.saturating_sub(SWIPE_DISTANCE)),
        SwipeDirection::Down => {
            Position::new(at.x, at.y.saturating_add(SWIPE_DISTANCE).min(height.saturating_sub(1)))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScreenEvents {
    #[serde(default)]
    events: Vec<ScreenEvent>,
}

#[derive(Debug, Deserialize)]
struct ScreenEvent {
    text: String,
}

#[async_trait]
impl Transport for EmulatorTransport {
    fn kind(&self) -> BackendKind {
        BackendKind::Emulator
    }

    async fn connect(&mut self) -> Result<()> {
        if self.settings.spawn {
            self.spawn().await?;
        }
        let address = (self.settings.host.as_str(), self.settings.apdu_port);
        let stream = match TcpStream::connect(address).await {
            Ok(stream) => stream,
            Err(e) => {
                self.kill().await;
                return Err(Error::Connection(format!(
                    "emulator APDU port {}:{}: {}",
                    self.settings.host, self.settings.apdu_port, e
                )));
            }
        };
        stream.set_nodelay(true)?;
        self.link = Some(FramedLink::new(stream));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(link) = self.link.take() {
            if let Err(e) = link.shutdown().await {
                tracing::debug!("APDU socket shutdown: {}", e);
            }
        }
        self.kill().await;
        Ok(())
    }

    async fn send(&mut self, apdu: &[u8]) -> Result<()> {
        self.link()?.send(apdu).await
    }

    async fn receive(&mut self) -> Result<Vec<u8>> {
        self.link()?.receive().await
    }

    async fn press(&mut self, button: Button) -> Result<()> {
        let endpoint = format!("button/{}", button.as_str());
        self.post(&endpoint, json!({ "action": "press-and-release" }))
            .await
    }

    async fn touch(&mut self, at: Position, hold: Duration) -> Result<()> {
        self.finger("press-and-release", at, Some(hold)).await
    }

    async fn swipe(&mut self, at: Position, direction: SwipeDirection) -> Result<()> {
        let end = swipe_end(&self.device, at, direction);
        self.finger("press", at, None).await?;
        self.finger("release", end, None).await
    }

    fn has_screen_capture(&self) -> bool {
        true
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let response = self.http.get(self.api_url("screenshot")).send().await?;
        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "GET /screenshot returned {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn screen_text(&mut self) -> Result<Vec<String>> {
        let events: ScreenEvents = self
            .http
            .get(self.api_url("events?currentscreenonly=true"))
            .send()
            .await?
            .json()
            .await?;
        Ok(events.events.into_iter().map(|e| e.text).collect())
    }
}
