//! Command and response APDU types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

/// Largest data field a single-frame command can carry
pub const MAX_DATA_LEN: usize = 255;

/// Command APDU sent to the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Application class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    /// Command payload (at most 255 bytes)
    data: Vec<u8>,
}

impl Command {
    /// Build a command, rejecting payloads that do not fit a single frame
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        if data.len() > MAX_DATA_LEN {
            return Err(Error::CommandTooLong(data.len()));
        }
        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data,
        })
    }

    /// Build a command without payload
    pub fn empty(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
        }
    }

    /// Parse a hex-encoded serialized command (`CLA INS P1 P2 [Lc data]`)
    pub fn from_hex(s: &str) -> Result<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = hex::decode(&compact)
            .map_err(|e| Error::Config(format!("Invalid APDU hex '{}': {}", s, e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a serialized command, as produced by [`super::codec::encode`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [cla, ins, p1, p2] => Ok(Self::empty(*cla, *ins, *p1, *p2)),
            [cla, ins, p1, p2, lc, data @ ..] => {
                if data.len() != *lc as usize {
                    return Err(Error::Config(format!(
                        "APDU length byte says {} but {} data bytes follow",
                        lc,
                        data.len()
                    )));
                }
                Self::new(*cla, *ins, *p1, *p2, data.to_vec())
            }
            _ => Err(Error::Config(format!(
                "APDU too short: {} bytes (need at least 4)",
                bytes.len()
            ))),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(super::codec::encode(self)))
    }
}

/// Response APDU received from the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Response payload, without the trailing status word
    pub data: Vec<u8>,
    /// Status word (always present)
    pub status: u16,
}

impl Response {
    pub fn new(data: impl Into<Vec<u8>>, status: u16) -> Self {
        Self {
            data: data.into(),
            status,
        }
    }

    /// Whether the status is the canonical success code
    pub fn is_success(&self) -> bool {
        self.status == super::status::SUCCESS
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data.is_empty() {
            write!(f, "[0x{:04x}] <Nothing>", self.status)
        } else {
            write!(f, "[0x{:04x}] {}", self.status, hex::encode(&self.data))
        }
    }
}
