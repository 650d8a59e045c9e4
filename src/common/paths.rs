//! Cross-platform bridge socket and configuration paths
//!
//! Unix/macOS: the USB bridge listens on a Unix domain socket at
//! $XDG_RUNTIME_DIR or /tmp
//! Windows: named pipe `ragger-usb-<username>`

use std::path::PathBuf;

const APP_NAME: &str = "ragger";

/// File name of the USB bridge socket
const BRIDGE_SOCKET: &str = "usb-bridge.sock";

/// Default socket path of the USB bridge
///
/// - Unix: `$XDG_RUNTIME_DIR/ragger/usb-bridge.sock` or `/tmp/ragger-<uid>/usb-bridge.sock`
/// - Windows: pipe name, the interprocess crate adds the `\\.\pipe\` prefix
#[cfg(unix)]
pub fn bridge_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_NAME).join(BRIDGE_SOCKET);
    }

    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/{}-{}", APP_NAME, uid)).join(BRIDGE_SOCKET)
}

#[cfg(windows)]
pub fn bridge_socket_path() -> PathBuf {
    PathBuf::from(bridge_socket_name())
}

/// Socket name for the interprocess local socket API
#[cfg(unix)]
pub fn bridge_socket_name() -> String {
    bridge_socket_path().to_string_lossy().into_owned()
}

#[cfg(windows)]
pub fn bridge_socket_name() -> String {
    let username = std::env::var("USERNAME").unwrap_or_else(|_| "default".to_string());
    format!("{}-usb-{}", APP_NAME, username)
}

/// Get the configuration directory path
///
/// - Linux: `~/.config/ragger/`
/// - macOS: `~/Library/Application Support/ragger/`
/// - Windows: `%APPDATA%\ragger\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
