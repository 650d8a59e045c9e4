//! USB-attached device behind a local socket bridge
//!
//! The bridge owns the USB HID endpoint and relays framed APDUs over a Unix
//! domain socket (named pipe on Windows). Screens are not observable:
//! gestures are no-ops and captures are unavailable.

use async_trait::async_trait;

#[cfg(unix)]
use interprocess::local_socket::GenericFilePath;
#[cfg(windows)]
use interprocess::local_socket::GenericNamespaced;
use interprocess::local_socket::tokio::{prelude::*, Stream};

use crate::common::{Error, Result};

use super::link::FramedLink;
use super::transport::Transport;
use super::BackendKind;

pub struct WiredTransport {
    socket_name: String,
    link: Option<FramedLink<Stream>>,
}

impl WiredTransport {
    pub fn new(socket_name: String) -> Self {
        Self {
            socket_name,
            link: None,
        }
    }

    fn link(&mut self) -> Result<&mut FramedLink<Stream>> {
        self.link.as_mut().ok_or(Error::NotOpen)
    }
}

async fn connect_stream(socket_name: &str) -> std::io::Result<Stream> {
    #[cfg(unix)]
    let name = socket_name.to_fs_name::<GenericFilePath>()?;
    #[cfg(windows)]
    let name = socket_name.to_ns_name::<GenericNamespaced>()?;

    Stream::connect(name).await
}

#[async_trait]
impl Transport for WiredTransport {
    fn kind(&self) -> BackendKind {
        BackendKind::Wired
    }

    async fn connect(&mut self) -> Result<()> {
        let stream = connect_stream(&self.socket_name).await.map_err(|e| {
            Error::Connection(format!("USB bridge at '{}': {}", self.socket_name, e))
        })?;
        tracing::debug!("Connected to USB bridge at {}", self.socket_name);
        self.link = Some(FramedLink::new(stream));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(link) = self.link.take() {
            link.shutdown().await?;
        }
        Ok(())
    }

    async fn send(&mut self, apdu: &[u8]) -> Result<()> {
        self.link()?.send(apdu).await
    }

    async fn receive(&mut self) -> Result<Vec<u8>> {
        self.link()?.receive().await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_bridge_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("absent.sock");
        let mut transport = WiredTransport::new(socket.to_string_lossy().into_owned());
        assert!(matches!(
            transport.connect().await,
            Err(Error::Connection(_))
        ));
        // gestures are accepted without a screen
        assert!(!transport.has_screen_capture());
    }
}
