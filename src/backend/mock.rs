//! Scripted in-process device
//!
//! Replies are served in the order they were scripted. The screen is a list
//! of captures: every gesture moves to the next one and the last capture
//! stays on screen once the list is exhausted. A [`MockJournal`] handle
//! keeps access to what the device saw after the mock is moved into a
//! backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::apdu::Response;
use crate::common::{Error, Result};
use crate::screen::Position;

use super::transport::Transport;
use super::{BackendKind, Button, SwipeDirection};

#[derive(Debug, Default)]
struct State {
    connected: bool,
    replies: VecDeque<Vec<u8>>,
    screens: Vec<Vec<u8>>,
    texts: Vec<Vec<String>>,
    current: usize,
    commands: Vec<Vec<u8>>,
    gestures: Vec<String>,
    connects: usize,
}

impl State {
    fn advance(&mut self, gesture: String) {
        self.gestures.push(gesture);
        let last = self.screens.len().max(self.texts.len()).saturating_sub(1);
        self.current = (self.current + 1).min(last);
    }
}

/// Read access to a mock's history
#[derive(Debug, Clone)]
pub struct MockJournal {
    state: Arc<Mutex<State>>,
}

impl MockJournal {
    /// Serialized commands received, in order
    pub fn commands(&self) -> Vec<Vec<u8>> {
        lock(&self.state).commands.clone()
    }

    /// Gestures received, as `press right`, `touch (x, y) 100ms`, `swipe left (x, y)`
    pub fn gestures(&self) -> Vec<String> {
        lock(&self.state).gestures.clone()
    }

    /// Index of the screen currently shown
    pub fn screen_index(&self) -> usize {
        lock(&self.state).current
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    /// How many times the device was connected
    pub fn connects(&self) -> usize {
        lock(&self.state).connects
    }
}

/// Scripted device used by tests and dry runs
#[derive(Debug)]
pub struct MockDevice {
    state: Arc<Mutex<State>>,
    capture: bool,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            capture: true,
        }
    }

    /// Queue a reply
    pub fn reply(self, response: Response) -> Self {
        let mut raw = response.data.clone();
        raw.extend_from_slice(&response.status.to_be_bytes());
        self.raw_reply(raw)
    }

    /// Queue raw reply bytes, well-formed or not
    pub fn raw_reply(self, raw: Vec<u8>) -> Self {
        lock(&self.state).replies.push_back(raw);
        self
    }

    /// Screen captures, one per screen, in display order
    pub fn screens<I>(self, screens: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        lock(&self.state).screens = screens.into_iter().collect();
        self
    }

    /// Text elements of each screen, in display order
    pub fn screen_texts<I>(self, texts: I) -> Self
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        lock(&self.state).texts = texts.into_iter().collect();
        self
    }

    /// Behave like a physical device: no screen capture
    pub fn without_capture(mut self) -> Self {
        self.capture = false;
        self
    }

    pub fn journal(&self) -> MockJournal {
        MockJournal {
            state: Arc::clone(&self.state),
        }
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Transport for MockDevice {
    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    async fn connect(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.connected = true;
        state.connects += 1;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        lock(&self.state).connected = false;
        Ok(())
    }

    async fn send(&mut self, apdu: &[u8]) -> Result<()> {
        lock(&self.state).commands.push(apdu.to_vec());
        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<u8>> {
        let next = lock(&self.state).replies.pop_front();
        match next {
            Some(raw) => Ok(raw),
            // a device that never answers
            None => std::future::pending::<Result<Vec<u8>>>().await,
        }
    }

    async fn press(&mut self, button: Button) -> Result<()> {
        lock(&self.state).advance(format!("press {}", button.as_str()));
        Ok(())
    }

    async fn touch(&mut self, at: Position, hold: Duration) -> Result<()> {
        lock(&self.state).advance(format!("touch {} {}ms", at, hold.as_millis()));
        Ok(())
    }

    async fn swipe(&mut self, at: Position, direction: SwipeDirection) -> Result<()> {
        let direction = format!("{:?}", direction).to_lowercase();
        lock(&self.state).advance(format!("swipe {} {}", direction, at));
        Ok(())
    }

    fn has_screen_capture(&self) -> bool {
        self.capture
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        if !self.capture {
            return Err(Error::CaptureUnavailable(self.kind().to_string()));
        }
        let state = lock(&self.state);
        Ok(state.screens.get(state.current).cloned().unwrap_or_default())
    }

    async fn screen_text(&mut self) -> Result<Vec<String>> {
        if !self.capture {
            return Err(Error::CaptureUnavailable(self.kind().to_string()));
        }
        let state = lock(&self.state);
        Ok(state.texts.get(state.current).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_screens_advance_and_saturate() {
        let mut mock = MockDevice::new().screens([vec![1], vec![2]]);
        let journal = mock.journal();

        assert_eq!(mock.screenshot().await.unwrap(), vec![1]);
        mock.press(Button::Right).await.unwrap();
        assert_eq!(mock.screenshot().await.unwrap(), vec![2]);
        mock.press(Button::Right).await.unwrap();
        assert_eq!(mock.screenshot().await.unwrap(), vec![2]);
        assert_eq!(journal.screen_index(), 1);
        assert_eq!(journal.gestures().len(), 2);
    }

    #[tokio::test]
    async fn test_replies_in_order() {
        let mut mock = MockDevice::new()
            .reply(Response::new(vec![0x01], 0x9000))
            .raw_reply(vec![0x6d, 0x00]);
        assert_eq!(mock.receive().await.unwrap(), vec![0x01, 0x90, 0x00]);
        assert_eq!(mock.receive().await.unwrap(), vec![0x6d, 0x00]);
    }

    #[tokio::test]
    async fn test_without_capture() {
        let mut mock = MockDevice::new().screens([vec![1]]).without_capture();
        assert!(!mock.has_screen_capture());
        assert!(matches!(
            mock.screenshot().await,
            Err(Error::CaptureUnavailable(_))
        ));
    }
}
