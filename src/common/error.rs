//! Error types for the device test harness
//!
//! Every failure surfaced to a test carries what the reporting side needs:
//! the status code for protocol failures and the step index for navigation
//! failures.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::apdu::Response;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Backend lifecycle ===
    #[error("Cannot reach device transport: {0}")]
    Connection(String),

    #[error("Device process failed to start: {0}")]
    Startup(String),

    #[error("Invalid application image '{}': {reason}", path.display())]
    Path { path: PathBuf, reason: String },

    #[error("Backend is not open. Call 'open' before exchanging")]
    NotOpen,

    #[error("An exchange is already pending on this backend")]
    ExchangeInFlight,

    #[error("No pending exchange to receive a response for")]
    NoPendingExchange,

    // === Codec / protocol ===
    #[error("Command data too long: {0} bytes (max 255)")]
    CommandTooLong(usize),

    #[error("Length-prefixed field too long: {0} bytes (max 255)")]
    FieldTooLong(usize),

    #[error("Invalid derivation path '{path}': {reason}")]
    DerivationPath { path: String, reason: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Device returned status 0x{:04X} ({})", response.status, crate::apdu::status_name(response.status))]
    Protocol { response: Response },

    // === Screen model ===
    #[error("Action '{action}' of layout '{layout}' is not supported on {device}")]
    UnsupportedLayout {
        layout: String,
        action: String,
        device: String,
    },

    #[error("Unknown device '{0}'. Supported: nanos, nanosp, nanox, stax, flex")]
    UnknownDevice(String),

    #[error("Unknown use case '{name}' on {device}")]
    UnknownUseCase { name: String, device: String },

    // === Navigation ===
    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(std::time::Duration, String),

    #[error("Step {step}: screen does not match golden '{}' (actual capture: '{}')", expected.display(), actual.display())]
    SnapshotMismatch {
        step: usize,
        expected: PathBuf,
        actual: PathBuf,
    },

    #[error("Step {step}: golden snapshot '{}' does not exist. Re-run with --golden-run to create it", path.display())]
    MissingGolden { step: usize, path: PathBuf },

    #[error("Recording golden snapshots requires a backend with screen capture ({0} has none)")]
    RecordUnsupported(String),

    #[error("Screen capture is not available on the {0} backend")]
    CaptureUnavailable(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Emulator API request failed: {0}")]
    Http(String),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an unsupported layout error
    pub fn unsupported_layout(layout: &str, action: &str, device: &str) -> Self {
        Self::UnsupportedLayout {
            layout: layout.to_string(),
            action: action.to_string(),
            device: device.to_string(),
        }
    }

    /// Create an invalid application image error
    pub fn path(path: impl Into<PathBuf>, reason: &str) -> Self {
        Self::Path {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a timeout error
    pub fn timeout(after: std::time::Duration, what: &str) -> Self {
        Self::Timeout(after, what.to_string())
    }

    /// Navigation step the failure happened at, if any
    pub fn step(&self) -> Option<usize> {
        match self {
            Error::SnapshotMismatch { step, .. } | Error::MissingGolden { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Status code returned by the device, for protocol failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Protocol { response } => Some(response.status),
            _ => None,
        }
    }

    /// The rejected response, for protocol failures
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Protocol { response } => Some(response),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            Error::Connection(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}

/// Structured failure detail handed to the reporting collaborator
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FailureSummary {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<PathBuf>,
}

impl From<&Error> for FailureSummary {
    fn from(e: &Error) -> Self {
        let code = match e {
            Error::Connection(_) => "CONNECTION_ERROR",
            Error::Startup(_) => "STARTUP_ERROR",
            Error::Path { .. } => "PATH_ERROR",
            Error::MalformedResponse(_) => "MALFORMED_RESPONSE",
            Error::Protocol { .. } => "PROTOCOL_ERROR",
            Error::UnsupportedLayout { .. } => "UNSUPPORTED_LAYOUT",
            Error::Timeout(..) => "TIMEOUT",
            Error::SnapshotMismatch { .. } => "SNAPSHOT_MISMATCH",
            Error::MissingGolden { .. } => "MISSING_GOLDEN",
            _ => "INTERNAL_ERROR",
        }
        .to_string();

        let (expected, actual) = match e {
            Error::SnapshotMismatch {
                expected, actual, ..
            } => (Some(expected.clone()), Some(actual.clone())),
            Error::MissingGolden { path, .. } => (Some(path.clone()), None),
            _ => (None, None),
        };

        Self {
            code,
            message: e.to_string(),
            step: e.step(),
            status: e.status(),
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_shows_status_in_hex() {
        let err = Error::Protocol {
            response: Response::new(vec![0x01], 0x6985),
        };
        let message = err.to_string();
        assert!(message.contains("0x6985"), "{message}");
        assert!(message.contains("CONDITIONS_NOT_SATISFIED"), "{message}");
        assert_eq!(err.status(), Some(0x6985));
        assert_eq!(err.response().map(|r| r.data.clone()), Some(vec![0x01]));
    }

    #[test]
    fn mismatch_summary_carries_step_and_paths() {
        let err = Error::SnapshotMismatch {
            step: 1,
            expected: PathBuf::from("snapshots/stax/t/00001.png"),
            actual: PathBuf::from("snapshots-tmp/stax/t/00001.png"),
        };
        let summary = FailureSummary::from(&err);
        assert_eq!(summary.code, "SNAPSHOT_MISMATCH");
        assert_eq!(summary.step, Some(1));
        assert_eq!(summary.status, None);
        assert_eq!(
            summary.actual,
            Some(PathBuf::from("snapshots-tmp/stax/t/00001.png"))
        );
    }
}
