//! Backend: connection lifetime and APDU exchanges
//!
//! All variants share this exchange path: encode, send, wait for one reply
//! within the exchange timeout, decode, then apply the raise policy.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

use crate::apdu::{codec, Command, RaisePolicy, Response};
use crate::common::{Error, Result};
use crate::screen::{Device, Position};

use super::apdu_log::ApduLog;
use super::transport::Transport;
use super::{BackendKind, Button, SwipeDirection};

/// Default bound on a single exchange
const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between screen polls
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Long press duration honoured by the SDK
pub const LONG_PRESS: Duration = Duration::from_millis(1500);

/// Default duration of a plain tap
pub const TAP: Duration = Duration::from_millis(100);

/// A device connection with its own raise policy
///
/// At most one exchange may be pending at a time. The protocol is strict
/// request/reply, so callers sequence their calls; `&mut self` on every
/// exchange method makes overlapping calls on one instance impossible.
pub struct Backend {
    transport: Box<dyn Transport>,
    device: Device,
    raise_policy: RaisePolicy,
    open: bool,
    /// A command was sent and its reply not yet received
    pending: bool,
    last_async_response: Option<Response>,
    apdu_log_path: Option<PathBuf>,
    apdu_log: Option<ApduLog>,
    exchange_timeout: Duration,
    poll_interval: Duration,
}

impl Backend {
    pub fn new(transport: Box<dyn Transport>, device: Device) -> Self {
        Self {
            transport,
            device,
            raise_policy: RaisePolicy::default(),
            open: false,
            pending: false,
            last_async_response: None,
            apdu_log_path: None,
            apdu_log: None,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Record every frame to `path` (truncated on open)
    pub fn with_apdu_log(mut self, path: PathBuf) -> Self {
        self.apdu_log_path = Some(path);
        self
    }

    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_raise_policy(mut self, policy: RaisePolicy) -> Self {
        self.raise_policy = policy;
        self
    }

    pub fn kind(&self) -> BackendKind {
        self.transport.kind()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn raise_policy(&self) -> &RaisePolicy {
        &self.raise_policy
    }

    /// Replace the active policy; applies from the next received reply
    pub fn set_raise_policy(&mut self, policy: RaisePolicy) {
        tracing::debug!("Raise policy: {} -> {}", self.raise_policy, policy);
        self.raise_policy = policy;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Acquire the device connection
    pub async fn open(&mut self) -> Result<()> {
        if self.open {
            return Ok(());
        }
        if let Some(path) = &self.apdu_log_path {
            self.apdu_log = Some(ApduLog::create(path)?);
        }
        tracing::info!("Opening {} backend ({})", self.kind(), self.device);
        self.transport.connect().await?;
        self.open = true;
        self.pending = false;
        Ok(())
    }

    /// Release the device connection. Closing a closed backend is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        tracing::info!("Closing {} backend", self.kind());
        self.open = false;
        self.pending = false;
        self.apdu_log = None;
        self.transport.disconnect().await
    }

    /// Close after the link lost sync with the device; later calls fail with `NotOpen`
    pub async fn drop_connection(&mut self, reason: &str) {
        if !self.open {
            return;
        }
        tracing::warn!("Dropping {} connection: {}", self.kind(), reason);
        if let Err(e) = self.close().await {
            tracing::debug!("Disconnect after {} failed: {}", reason, e);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::NotOpen)
        }
    }

    /// Send a command and wait for its reply
    pub async fn exchange(&mut self, command: &Command) -> Result<Response> {
        self.exchange_raw(&codec::encode(command)).await
    }

    /// Send an already serialized command and wait for its reply
    pub async fn exchange_raw(&mut self, apdu: &[u8]) -> Result<Response> {
        self.send_raw(apdu).await?;
        let response = self.receive_reply().await?;
        self.enforce(response)
    }

    /// First half of a split exchange
    ///
    /// The device may hold the reply until the user acts on screen; gestures
    /// stay available until [`Backend::receive`] is called.
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        self.send_raw(&codec::encode(command)).await
    }

    pub async fn send_raw(&mut self, apdu: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if self.pending {
            return Err(Error::ExchangeInFlight);
        }
        tracing::debug!(target: "ragger::apdu", "=> {}", hex::encode(apdu));
        if let Some(log) = &mut self.apdu_log {
            log.command(apdu)?;
        }
        self.transport.send(apdu).await?;
        self.pending = true;
        Ok(())
    }

    /// Second half of a split exchange
    pub async fn receive(&mut self) -> Result<Response> {
        let response = self.receive_reply().await?;
        self.last_async_response = Some(response.clone());
        self.enforce(response)
    }

    /// Reply of the last split exchange, accepted or not
    pub fn last_async_response(&self) -> Option<&Response> {
        self.last_async_response.as_ref()
    }

    async fn receive_reply(&mut self) -> Result<Response> {
        self.ensure_open()?;
        if !self.pending {
            return Err(Error::NoPendingExchange);
        }
        let received = tokio::time::timeout(self.exchange_timeout, self.transport.receive()).await;
        self.pending = false;
        let raw = match received {
            Ok(raw) => raw?,
            Err(_) => {
                // the late reply would answer the next command
                self.drop_connection("reply timeout").await;
                return Err(Error::timeout(self.exchange_timeout, "the device reply"));
            }
        };
        tracing::debug!(target: "ragger::apdu", "<= {}", hex::encode(&raw));
        if let Some(log) = &mut self.apdu_log {
            log.reply(&raw)?;
        }
        codec::decode(&raw)
    }

    fn enforce(&self, response: Response) -> Result<Response> {
        if self.raise_policy.rejects(response.status) {
            tracing::debug!("Raise policy {} rejects {}", self.raise_policy, response);
            return Err(Error::Protocol { response });
        }
        Ok(response)
    }

    // === Gestures ===

    pub async fn right_click(&mut self) -> Result<()> {
        self.press(Button::Right).await
    }

    pub async fn left_click(&mut self) -> Result<()> {
        self.press(Button::Left).await
    }

    pub async fn both_click(&mut self) -> Result<()> {
        self.press(Button::Both).await
    }

    pub async fn press(&mut self, button: Button) -> Result<()> {
        self.ensure_open()?;
        tracing::trace!("Press {}", button.as_str());
        self.transport.press(button).await
    }

    /// Touch the screen at `at`, holding for `hold`
    pub async fn finger_touch(&mut self, at: Position, hold: Duration) -> Result<()> {
        self.ensure_open()?;
        tracing::trace!("Touch {} for {:?}", at, hold);
        self.transport.touch(at, hold).await
    }

    pub async fn finger_swipe(&mut self, at: Position, direction: SwipeDirection) -> Result<()> {
        self.ensure_open()?;
        tracing::trace!("Swipe {:?} from {}", direction, at);
        self.transport.swipe(at, direction).await
    }

    // === Screen side channel ===

    pub fn has_screen_capture(&self) -> bool {
        self.transport.has_screen_capture()
    }

    pub async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.ensure_open()?;
        self.transport.screenshot().await
    }

    pub async fn screen_text(&mut self) -> Result<Vec<String>> {
        self.ensure_open()?;
        self.transport.screen_text().await
    }

    /// Poll until the screen differs from `context`, returning the new capture
    pub async fn wait_for_screen_change(
        &mut self,
        context: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        loop {
            let current = self.screenshot().await?;
            if current != context {
                return Ok(current);
            }
            if Instant::now() >= deadline {
                return Err(Error::timeout(timeout, "a screen change"));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Whether the current screen shows `text`
    ///
    /// The text must be a whole element, or the whole screen read line by line.
    /// "Confirm" does not match a screen reading "Confirm the address below".
    pub async fn compare_screen_with_text(&mut self, text: &str) -> Result<bool> {
        let elements = self.screen_text().await?;
        let text = text.trim();
        let whole_screen = elements
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(elements.iter().any(|e| e.trim() == text) || whole_screen == text)
    }

    /// Poll until the current screen shows `text`
    pub async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.compare_screen_with_text(text).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::timeout(timeout, &format!("text '{}'", text)));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
