//! Configuration file handling and per-run options

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::BackendKind;
use crate::screen::Device;

use super::paths::{bridge_socket_name, config_path};
use super::Result;

/// Options selecting what a run drives and how
///
/// Built from command line flags or a scenario file. The backend is chosen
/// once from these and never changes during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default = "default_device")]
    pub device: Device,

    /// Show the emulator window
    #[serde(default)]
    pub display: bool,

    /// Seed of the emulator's deterministic RNG
    #[serde(default)]
    pub seed: Option<u64>,

    /// Regenerate golden snapshots instead of comparing against them
    #[serde(default)]
    pub golden_run: bool,

    /// Write every APDU frame to this file
    #[serde(default)]
    pub log_apdu_file: Option<PathBuf>,

    /// Application image loaded by the emulator
    #[serde(default)]
    pub app: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            device: default_device(),
            display: false,
            seed: None,
            golden_run: false,
            log_apdu_file: None,
            app: None,
        }
    }
}

fn default_device() -> Device {
    Device::NANOS
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub emulator: EmulatorConfig,

    #[serde(default)]
    pub wired: WiredConfig,

    #[serde(default)]
    pub wireless: WirelessConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub navigation: NavigationConfig,
}

/// Emulator process settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EmulatorConfig {
    /// Emulator executable, looked up in PATH when not a path
    #[serde(default = "default_executable")]
    pub executable: String,

    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the HTTP automation API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Port of the framed APDU socket
    #[serde(default = "default_apdu_port")]
    pub apdu_port: u16,

    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,

    /// BIP39 mnemonic the emulated device is provisioned with
    #[serde(default)]
    pub mnemonic: Option<String>,

    /// Extra arguments appended to the emulator command line
    #[serde(default)]
    pub args: Vec<String>,

    /// Start the emulator; when false, attach to one already running
    #[serde(default = "default_spawn")]
    pub spawn: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            host: default_host(),
            api_port: default_api_port(),
            apdu_port: default_apdu_port(),
            startup_timeout_secs: default_startup_timeout(),
            mnemonic: None,
            args: Vec::new(),
            spawn: default_spawn(),
        }
    }
}

impl EmulatorConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

fn default_executable() -> String {
    "speculos".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_api_port() -> u16 {
    5000
}
fn default_apdu_port() -> u16 {
    9999
}
fn default_startup_timeout() -> u64 {
    20
}
fn default_spawn() -> bool {
    true
}

/// USB bridge settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WiredConfig {
    /// Local socket of the bridge; defaults to the per-user runtime socket
    #[serde(default)]
    pub socket: Option<String>,
}

impl WiredConfig {
    pub fn socket_name(&self) -> String {
        self.socket.clone().unwrap_or_else(bridge_socket_name)
    }
}

/// Bluetooth bridge settings
#[derive(Debug, Clone, Deserialize)]
pub struct WirelessConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_wireless_port")]
    pub port: u16,
}

impl Default for WirelessConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_wireless_port(),
        }
    }
}

fn default_wireless_port() -> u16 {
    9998
}

/// Timeout settings
#[derive(Debug, Clone, Deserialize)]
pub struct Timeouts {
    /// Bound on one APDU exchange
    #[serde(default = "default_exchange")]
    pub exchange_secs: u64,

    /// Bound on waiting for a screen change after a gesture
    #[serde(default = "default_screen_change")]
    pub screen_change_secs: u64,

    /// Interval between screen polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            exchange_secs: default_exchange(),
            screen_change_secs: default_screen_change(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Timeouts {
    pub fn exchange(&self) -> Duration {
        Duration::from_secs(self.exchange_secs)
    }

    pub fn screen_change(&self) -> Duration {
        Duration::from_secs(self.screen_change_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_exchange() -> u64 {
    30
}
fn default_screen_change() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    100
}

/// Snapshot and navigation settings
#[derive(Debug, Clone, Deserialize)]
pub struct NavigationConfig {
    /// Directory holding `snapshots/` and `snapshots-tmp/`
    #[serde(default = "default_snapshots_root")]
    pub snapshots_root: PathBuf,

    /// Pause after instructions that are not followed by a screen change wait
    #[serde(default = "default_settle")]
    pub settle_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            snapshots_root: default_snapshots_root(),
            settle_ms: default_settle(),
        }
    }
}

impl NavigationConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

fn default_snapshots_root() -> PathBuf {
    PathBuf::from("tests")
}
fn default_settle() -> u64 {
    100
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.emulator.executable, "speculos");
        assert_eq!(config.emulator.api_port, 5000);
        assert_eq!(config.emulator.apdu_port, 9999);
        assert!(config.emulator.spawn);
        assert_eq!(config.timeouts.exchange(), Duration::from_secs(30));
        assert_eq!(config.timeouts.screen_change(), Duration::from_secs(10));
        assert_eq!(config.navigation.settle(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [emulator]
            api_port = 5001
            args = ["--trace"]

            [timeouts]
            screen_change_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.emulator.api_port, 5001);
        assert_eq!(config.emulator.apdu_port, 9999);
        assert_eq!(config.emulator.args, vec!["--trace"]);
        assert_eq!(config.timeouts.screen_change_secs, 3);
        assert_eq!(config.timeouts.exchange_secs, 30);
        assert_eq!(config.wireless.port, 9998);
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[emulator\napi_port = 1").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(crate::common::Error::ConfigParse(_))
        ));
        assert!(matches!(
            Config::load_from(&dir.path().join("absent.toml")),
            Err(crate::common::Error::FileRead { .. })
        ));
    }

    #[test]
    fn test_run_config_from_json() {
        let run: RunConfig = serde_json::from_str(
            r#"{"backend": "speculos", "device": "stax", "seed": 42, "golden_run": true}"#,
        )
        .unwrap();
        assert_eq!(run.backend, BackendKind::Emulator);
        assert_eq!(run.device, Device::STAX);
        assert_eq!(run.seed, Some(42));
        assert!(run.golden_run);
        assert!(!run.display);
        assert_eq!(run.log_apdu_file, None);
    }
}
