//! Input subsystem seam
//!
//! Everything the assignment core needs from the outside world lives behind two traits:
//!
//! 1. [`GamepadEnumerator`] - which gamepads are connected right now
//! 2. [`InputSubsystem`] - listener subscriptions for key and button releases
//!
//! # Architecture
//!
//! ```text
//! gilrs / stdin ──► InputEvent ──► ListenerHub ──► subscribed handler
//!  (collector)      (mpsc)        (routing)        (coordinator, menu)
//! ```
//!
//! [`hub::ListenerHub`] is the concrete listener registry, [`event_collector`] pumps
//! gamepad events out of gilrs and [`keyboard`] turns terminal input into key releases.

pub mod event_collector;
pub mod fake;
pub mod hub;
pub mod keyboard;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use event_collector::{CollectorError, CollectorHandle, CollectorSettings, GilrsGamepads};
pub use fake::StaticGamepads;
pub use hub::{ActivationPolicy, ListenerHub, Topic};

/// Gamepad identifier as handed out by the backend (stable while connected)
pub type GamepadIndex = usize;

/// A connected gamepad as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamepadInfo {
    pub id: GamepadIndex,
    pub name: String,
}

impl GamepadInfo {
    pub fn new(id: GamepadIndex, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Handle for one listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Keys the menus care about. Anything else is carried through as a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Space,
    Up,
    Down,
    Char(char),
}

// Button type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonType {
    A,
    B,
    X,
    Y,
    Start,
    Select,
    LeftBumper,
    RightBumper,
    LeftStick,
    RightStick,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    Guide,
    Other,
}

/// Events delivered by the input subsystem
#[derive(Debug, Clone)]
pub enum InputEvent {
    KeyReleased {
        key: Key,
        timestamp: DateTime<Local>,
    },
    GamepadButtonReleased {
        gamepad: GamepadIndex,
        button: ButtonType,
        timestamp: DateTime<Local>,
    },
    GamepadConnected {
        gamepad: GamepadIndex,
        name: String,
    },
    GamepadDisconnected {
        gamepad: GamepadIndex,
    },
}

impl InputEvent {
    pub fn key_released(key: Key) -> Self {
        Self::KeyReleased {
            key,
            timestamp: Local::now(),
        }
    }

    pub fn button_released(gamepad: GamepadIndex, button: ButtonType) -> Self {
        Self::GamepadButtonReleased {
            gamepad,
            button,
            timestamp: Local::now(),
        }
    }

    /// Listener topic this event is delivered on, if any
    pub fn topic(&self) -> Option<Topic> {
        match self {
            Self::KeyReleased { .. } => Some(Topic::KeyReleased),
            Self::GamepadButtonReleased { gamepad, .. } => {
                Some(Topic::GamepadButtonReleased(*gamepad))
            }
            Self::GamepadConnected { .. } | Self::GamepadDisconnected { .. } => None,
        }
    }
}

/// Source of the currently connected gamepads
pub trait GamepadEnumerator {
    /// Connected gamepads in detection order
    fn enumerate_connected_gamepads(&self) -> Vec<GamepadInfo>;
}

/// Listener registration surface of the input subsystem
///
/// Handlers are not stored here; a subscription only decides whether events of its
/// topic are delivered to the owner of the [`SubscriptionId`]. Unsubscribing takes
/// effect immediately.
pub trait InputSubsystem: GamepadEnumerator {
    fn subscribe_key_released(&mut self) -> SubscriptionId;

    fn unsubscribe_key_released(&mut self, id: SubscriptionId);

    fn subscribe_gamepad_button_released(&mut self, gamepad: GamepadIndex) -> SubscriptionId;

    fn unsubscribe_gamepad_button_released(&mut self, gamepad: GamepadIndex, id: SubscriptionId);

    /// Whether events for `id` are currently delivered
    fn is_delivering(&self, id: SubscriptionId) -> bool;
}
