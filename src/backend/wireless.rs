//! Bluetooth-attached device behind a TCP bridge

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::common::{Error, Result};

use super::link::FramedLink;
use super::transport::Transport;
use super::BackendKind;

pub struct WirelessTransport {
    host: String,
    port: u16,
    link: Option<FramedLink<TcpStream>>,
}

impl WirelessTransport {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            link: None,
        }
    }

    fn link(&mut self) -> Result<&mut FramedLink<TcpStream>> {
        self.link.as_mut().ok_or(Error::NotOpen)
    }
}

#[async_trait]
impl Transport for WirelessTransport {
    fn kind(&self) -> BackendKind {
        BackendKind::Wireless
    }

    async fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                Error::Connection(format!("Bluetooth bridge at {}:{}: {}", self.host, self.port, e))
            })?;
        stream.set_nodelay(true)?;
        tracing::debug!("Connected to Bluetooth bridge at {}:{}", self.host, self.port);
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
