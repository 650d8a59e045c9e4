//! Screen model
//!
//! Devices, touch coordinates, layouts and the use cases composed from them.

pub mod device;
pub mod layout;
pub mod position;
pub mod use_case;

pub use device::{Device, DeviceFamily};
pub use layout::{ActionArg, Layout, LayoutKind};
pub use position::Position;
pub use use_case::{UseCase, UseCaseBuilder, UseCaseRegistry};
