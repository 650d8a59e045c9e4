//! Length-prefixed APDU link over any byte stream

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::apdu::codec;
use crate::common::Result;

/// A connected stream speaking the framed APDU protocol
pub struct FramedLink<S> {
    stream: S,
}

impl<S> FramedLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub async fn send(&mut self, apdu: &[u8]) -> Result<()> {
        codec::write_frame(&mut self.stream, apdu).await
    }

    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        codec::read_frame(&mut self.stream).await
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::{codec, Command, Response};

    #[tokio::test]
    async fn test_link_over_duplex() {
        let (client, mut device) = tokio::io::duplex(1024);
        let mut link = FramedLink::new(client);

        let command = Command::new(0xe0, 0x01, 0x00, 0x00, vec![0x01]).unwrap();
        let device_task = tokio::spawn(async move {
            let received = codec::read_command(&mut device).await.unwrap();
            codec::write_reply(&mut device, &Response::new(vec![0x33], 0x9000))
                .await
                .unwrap();
            received
        });

        link.send(&codec::encode(&command)).await.unwrap();
        let raw = link.receive().await.unwrap();
        assert_eq!(raw, vec![0x33, 0x90, 0x00]);
        assert_eq!(device_task.await.unwrap(), command);
    }
}
