//! Device backends
//!
//! A [`Backend`] owns one connection to a device and mediates every APDU
//! exchange. The byte transport underneath is chosen once, at configuration
//! time, among the emulator, the wired bridge and the wireless bridge.

pub mod apdu_log;
pub mod client;
pub mod emulator;
pub mod link;
pub mod mock;
pub mod transport;
pub mod wired;
pub mod wireless;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::config::{Config, RunConfig};
use crate::common::{Error, Result};

pub use client::Backend;
pub use transport::Transport;

/// Transport variant a backend is built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Emulator subprocess driven over TCP and its HTTP automation API
    #[default]
    #[serde(alias = "speculos")]
    Emulator,
    /// USB-attached device reached through a local socket bridge
    Wired,
    /// Bluetooth-attached device reached through a TCP bridge
    Wireless,
    /// In-process scripted device
    Mock,
}

impl BackendKind {
    /// Whether this variant talks to real hardware
    pub fn is_physical(&self) -> bool {
        matches!(self, BackendKind::Wired | BackendKind::Wireless)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Emulator => "emulator",
            BackendKind::Wired => "wired",
            BackendKind::Wireless => "wireless",
            BackendKind::Mock => "mock",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "emulator" | "speculos" => Ok(BackendKind::Emulator),
            "wired" | "usb" => Ok(BackendKind::Wired),
            "wireless" | "ble" => Ok(BackendKind::Wireless),
            "mock" => Ok(BackendKind::Mock),
            other => Err(Error::Config(format!(
                "Unknown backend '{}'. Use emulator, wired or wireless",
                other
            ))),
        }
    }
}

/// Physical buttons of button devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    Left,
    Right,
    Both,
}

impl Button {
    pub fn as_str(&self) -> &'static str {
        match self {
            Button::Left => "left",
            Button::Right => "right",
            Button::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

/// Build the backend selected by the run configuration
///
/// The backend is returned closed. Callers open it, and close it once the
/// run is over.
pub fn create(run: &RunConfig, config: &Config) -> Result<Backend> {
    let transport: Box<dyn Transport> = match run.backend {
        BackendKind::Emulator => {
            let app = run.app.clone().ok_or_else(|| {
                Error::Config("The emulator backend needs an application image (--app)".into())
            })?;
            Box::new(emulator::EmulatorTransport::new(
                config.emulator.clone(),
                app,
                run.device,
                run.display,
                run.seed,
            ))
        }
        BackendKind::Wired => Box::new(wired::WiredTransport::new(config.wired.socket_name())),
        BackendKind::Wireless => Box::new(wireless::WirelessTransport::new(
            config.wireless.host.clone(),
            config.wireless.port,
        )),
        BackendKind::Mock => {
            return Err(Error::Config(
                "The mock backend is built in-process with MockDevice, not from a run configuration"
                    .into(),
            ))
        }
    };

    tracing::debug!("Creating {} backend for {}", run.backend, run.device);

    let mut backend = Backend::new(transport, run.device)
        .with_exchange_timeout(config.timeouts.exchange())
        .with_poll_interval(config.timeouts.poll_interval());
    if let Some(path) = &run.log_apdu_file {
        backend = backend.with_apdu_log(path.clone());
    }
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::Device;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("speculos".parse::<BackendKind>().unwrap(), BackendKind::Emulator);
        assert_eq!("USB".parse::<BackendKind>().unwrap(), BackendKind::Wired);
        assert_eq!("ble".parse::<BackendKind>().unwrap(), BackendKind::Wireless);
        assert!("serial".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_physical_variants() {
        assert!(BackendKind::Wired.is_physical());
        assert!(BackendKind::Wireless.is_physical());
        assert!(!BackendKind::Emulator.is_physical());
    }

    #[test]
    fn test_create_emulator_requires_app() {
        let run = RunConfig {
            backend: BackendKind::Emulator,
            device: Device::STAX,
            ..RunConfig::default()
        };
        assert!(matches!(
            create(&run, &Config::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_create_wireless_is_closed() {
        let run = RunConfig {
            backend: BackendKind::Wireless,
            device: Device::NANOX,
            ..RunConfig::default()
        };
        let backend = create(&run, &Config::default()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Wireless);
        assert!(!backend.is_open());
    }
}
