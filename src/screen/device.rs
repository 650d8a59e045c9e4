//! Device descriptors
//!
//! One immutable descriptor per supported device model. The family decides
//! which layouts apply: button devices are driven with button chords, touch
//! devices with screen coordinates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFamily {
    /// Two physical buttons, small monochrome screen
    Nano,
    /// Large touchscreen
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    pub name: &'static str,
    pub family: DeviceFamily,
    pub is_touchscreen: bool,
    /// Screen size in pixels (width, height)
    pub resolution: (u16, u16),
    /// Default SDK version the emulator runs for this model
    sdk: &'static str,
}

impl Device {
    pub const NANOS: Device = Device {
        name: "nanos",
        family: DeviceFamily::Nano,
        is_touchscreen: false,
        resolution: (128, 32),
        sdk: "2.1.0",
    };
    pub const NANOSP: Device = Device {
        name: "nanosp",
        family: DeviceFamily::Nano,
        is_touchscreen: false,
        resolution: (128, 64),
        sdk: "1.0.4",
    };
    pub const NANOX: Device = Device {
        name: "nanox",
        family: DeviceFamily::Nano,
        is_touchscreen: false,
        resolution: (128, 64),
        sdk: "2.0.2",
    };
    pub const STAX: Device = Device {
        name: "stax",
        family: DeviceFamily::Touch,
        is_touchscreen: true,
        resolution: (400, 670),
        sdk: "1.0.0",
    };
    pub const FLEX: Device = Device {
        name: "flex",
        family: DeviceFamily::Touch,
        is_touchscreen: true,
        resolution: (480, 600),
        sdk: "1.0.0",
    };

    /// Every supported device, button devices first
    pub const ALL: [Device; 5] = [
        Device::NANOS,
        Device::NANOSP,
        Device::NANOX,
        Device::STAX,
        Device::FLEX,
    ];

    /// Look up a descriptor by name (case-insensitive)
    pub fn from_name(name: &str) -> Result<Device> {
        let lower = name.to_lowercase();
        Device::ALL
            .iter()
            .find(|d| d.name == lower)
            .copied()
            .ok_or(Error::UnknownDevice(name.to_string()))
    }

    pub fn is_nano(&self) -> bool {
        self.family == DeviceFamily::Nano
    }

    pub fn sdk_version(&self) -> semver::Version {
        // the table above only holds valid versions
        semver::Version::parse(self.sdk).unwrap_or_else(|_| semver::Version::new(0, 0, 0))
    }

    /// Whether a coordinate lies on the screen
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x < self.resolution.0 && y < self.resolution.1
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Device::from_name(s)
    }
}

impl Serialize for Device {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for Device {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Device::from_name(&name).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(Device::from_name("STAX").unwrap(), Device::STAX);
        assert_eq!(Device::from_name("nanosp").unwrap(), Device::NANOSP);
        assert!(matches!(
            Device::from_name("nanoz"),
            Err(Error::UnknownDevice(_))
        ));
    }

    #[test]
    fn test_families() {
        assert!(Device::NANOX.is_nano());
        assert!(!Device::NANOX.is_touchscreen);
        assert!(Device::FLEX.is_touchscreen);
        assert_eq!(Device::FLEX.family, DeviceFamily::Touch);
    }

    #[test]
    fn test_sdk_versions_parse() {
        for device in Device::ALL {
            assert_ne!(device.sdk_version(), semver::Version::new(0, 0, 0));
        }
    }

    #[test]
    fn test_serde_by_name() {
        let json = serde_json::to_string(&Device::STAX).unwrap();
        assert_eq!(json, "\"stax\"");
        let back: Device = serde_json::from_str("\"flex\"").unwrap();
        assert_eq!(back, Device::FLEX);
    }
}
