//! Byte-level transport trait implemented by every backend variant

use std::time::Duration;

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::screen::Position;

use super::{BackendKind, Button, SwipeDirection};

/// Low-level device transport
///
/// Variants only move bytes and gestures. Encoding, the raise policy and the
/// one-exchange-at-a-time rule live in [`super::Backend`].
#[async_trait]
pub trait Transport: Send {
    fn kind(&self) -> BackendKind;

    /// Acquire the connection (and start the device process, if any)
    async fn connect(&mut self) -> Result<()>;

    /// Release the connection. Must tolerate being called when not connected.
    async fn disconnect(&mut self) -> Result<()>;

    /// Send one serialized command frame
    async fn send(&mut self, apdu: &[u8]) -> Result<()>;

    /// Receive one raw reply (`data || status`)
    async fn receive(&mut self) -> Result<Vec<u8>>;

    async fn press(&mut self, button: Button) -> Result<()> {
        tracing::debug!("{} backend ignores {} button press", self.kind(), button.as_str());
        Ok(())
    }

    async fn touch(&mut self, at: Position, hold: Duration) -> Result<()> {
        tracing::debug!("{} backend ignores touch at {} ({:?})", self.kind(), at, hold);
        Ok(())
    }

    async fn swipe(&mut self, at: Position, direction: SwipeDirection) -> Result<()> {
        tracing::debug!("{} backend ignores {:?} swipe at {}", self.kind(), direction, at);
        Ok(())
    }

    /// Whether [`Transport::screenshot`] can succeed
    fn has_screen_capture(&self) -> bool {
        false
    }

    /// Current screen as PNG bytes
    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Err(Error::CaptureUnavailable(self.kind().to_string()))
    }

    /// Text shown on the current screen, one entry per text element
    async fn screen_text(&mut self) -> Result<Vec<String>> {
        Err(Error::CaptureUnavailable(self.kind().to_string()))
    }
}
