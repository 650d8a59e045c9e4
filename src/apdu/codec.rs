//! APDU wire codec
//!
//! Command frame: `CLA INS P1 P2 Lc data[Lc]`.
//! Response: `data[*] SW1 SW2`, the status word big-endian.
//!
//! Socket transports wrap both directions in a length header:
//! ```text
//! request:  <u32 BE apdu length> <command frame>
//! response: <u32 BE data length> <data> <SW1 SW2>
//! ```

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::{Error, Result};

use super::types::{Command, Response};

/// Width of the trailing status word
pub const STATUS_LEN: usize = 2;

/// Upper bound on a response payload read from a socket
const MAX_FRAME_DATA: u32 = 64 * 1024;

/// Serialize a command into its wire frame
pub fn encode(command: &Command) -> Vec<u8> {
    let data = command.data();
    let mut frame = Vec::with_capacity(5 + data.len());
    frame.extend_from_slice(&[command.cla, command.ins, command.p1, command.p2]);
    frame.push(data.len() as u8);
    frame.extend_from_slice(data);
    frame
}

/// Decode a raw reply (`data || status`) into a response
pub fn decode(raw: &[u8]) -> Result<Response> {
    if raw.len() < STATUS_LEN {
        return Err(Error::MalformedResponse(format!(
            "reply is {} bytes, shorter than the status word",
            raw.len()
        )));
    }
    let (data, sw) = raw.split_at(raw.len() - STATUS_LEN);
    Ok(Response::new(data, u16::from_be_bytes([sw[0], sw[1]])))
}

/// Decode a length-prefixed reply frame, checking the declared length
pub fn decode_frame(frame: &[u8]) -> Result<Response> {
    if frame.len() < 4 {
        return Err(Error::MalformedResponse(format!(
            "frame is {} bytes, shorter than its length header",
            frame.len()
        )));
    }
    let (header, body) = frame.split_at(4);
    let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if body.len() != declared + STATUS_LEN {
        return Err(Error::MalformedResponse(format!(
            "frame declares {} data bytes but carries {}",
            declared,
            body.len().saturating_sub(STATUS_LEN)
        )));
    }
    decode(body)
}

/// Write a length-prefixed command frame to the stream
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, apdu: &[u8]) -> Result<()> {
    writer.write_all(&(apdu.len() as u32).to_be_bytes()).await?;
    writer.write_all(apdu).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed reply from the stream
///
/// Returns the raw `data || status` bytes. A stream ending before the
/// declared length has arrived is a framing violation, not a transport error.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::Connection("device closed the connection".to_string())
        } else {
            Error::Io(e)
        }
    })?;
    let declared = u32::from_be_bytes(len_buf);

    if declared > MAX_FRAME_DATA {
        return Err(Error::MalformedResponse(format!(
            "declared length too large: {} bytes",
            declared
        )));
    }

    let mut body = vec![0u8; declared as usize + STATUS_LEN];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::MalformedResponse(format!(
                "stream ended before the {} declared data bytes and status word",
                declared
            ))
        } else {
            Error::Io(e)
        }
    })?;
    Ok(body)
}

/// Write a length-prefixed reply (device side, used by fakes and bridges)
pub async fn write_reply<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<()> {
    writer
        .write_all(&(response.data.len() as u32).to_be_bytes())
        .await?;
    writer.write_all(&response.data).await?;
    writer.write_all(&response.status.to_be_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-prefixed command (device side, used by fakes and bridges)
pub async fn read_command<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Command> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > 5 + super::types::MAX_DATA_LEN {
        return Err(Error::MalformedResponse(format!("command frame too large: {len} bytes")));
    }
    let mut frame = vec![0u8; len];
    reader.read_exact(&mut frame).await?;
    Command::from_bytes(&frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_includes_length() {
        let cmd = Command::new(0xe0, 0x04, 0x01, 0x02, vec![0xaa, 0xbb]).unwrap();
        assert_eq!(encode(&cmd), vec![0xe0, 0x04, 0x01, 0x02, 0x02, 0xaa, 0xbb]);

        let cmd = Command::empty(0xb0, 0x01, 0x00, 0x00);
        assert_eq!(encode(&cmd), vec![0xb0, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_decode_status_only() {
        let rapdu = decode(&[0x90, 0x00]).unwrap();
        assert!(rapdu.data.is_empty());
        assert_eq!(rapdu.status, 0x9000);
    }

    #[test]
    fn test_decode_data_and_status_big_endian() {
        let rapdu = decode(&[0x01, 0x02, 0x6a, 0x80]).unwrap();
        assert_eq!(rapdu.data, vec![0x01, 0x02]);
        assert_eq!(rapdu.status, 0x6a80);
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(decode(&[]), Err(Error::MalformedResponse(_))));
        assert!(matches!(decode(&[0x90]), Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn test_decode_frame_checks_declared_length() {
        let ok = [0, 0, 0, 1, 0x42, 0x90, 0x00];
        assert_eq!(decode_frame(&ok).unwrap(), Response::new(vec![0x42], 0x9000));

        let short = [0, 0, 0, 3, 0x42, 0x90, 0x00];
        assert!(matches!(decode_frame(&short), Err(Error::MalformedResponse(_))));

        let long = [0, 0, 0, 0, 0x42, 0x90, 0x00];
        assert!(matches!(decode_frame(&long), Err(Error::MalformedResponse(_))));

        assert!(matches!(decode_frame(&[0, 0]), Err(Error::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_frame_round_trip_over_stream() {
        let response = Response::new(vec![0xde, 0xad], 0x6f00);
        let mut wire = Vec::new();
        write_reply(&mut wire, &response).await.unwrap();

        let mut reader = Cursor::new(wire);
        let raw = read_frame(&mut reader).await.unwrap();
        assert_eq!(decode(&raw).unwrap(), response);
    }

    #[tokio::test]
    async fn test_read_frame_truncated_is_malformed() {
        // declares 4 data bytes, delivers 1 + status
        let mut reader = Cursor::new(vec![0, 0, 0, 4, 0x01, 0x90, 0x00]);
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(Error::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_read_frame_closed_stream_is_connection_error() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(Error::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_command_frame_round_trip() {
        let cmd = Command::new(0xe0, 0x06, 0x00, 0x00, b"abc".to_vec()).unwrap();
        let mut wire = Vec::new();
        write_frame(&mut wire, &encode(&cmd)).await.unwrap();
        let mut reader = Cursor::new(wire);
        assert_eq!(read_command(&mut reader).await.unwrap(), cmd);
    }
}
