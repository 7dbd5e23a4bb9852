//! Assignable input devices and the registry that lists them

pub mod registry;

use crate::input::GamepadIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use registry::DeviceRegistry;

/// Device category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Keyboard,
    Gamepad,
}

/// One controllable input source. There is only ever one keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Device {
    Keyboard,
    Gamepad(GamepadIndex),
}

impl Device {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Keyboard => DeviceKind::Keyboard,
            Device::Gamepad(_) => DeviceKind::Gamepad,
        }
    }

    /// Gamepad id, `None` for the keyboard
    pub fn id(&self) -> Option<GamepadIndex> {
        match self {
            Device::Keyboard => None,
            Device::Gamepad(id) => Some(*id),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Keyboard => write!(f, "Keyboard"),
            Device::Gamepad(id) => write!(f, "Controller {}", id),
        }
    }
}
