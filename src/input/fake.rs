//! In-memory gamepad list for tests and headless runs

use super::{GamepadEnumerator, GamepadIndex, GamepadInfo};

/// Fixed, manually edited set of "connected" gamepads
#[derive(Debug, Clone, Default)]
pub struct StaticGamepads {
    connected: Vec<GamepadInfo>,
}

impl StaticGamepads {
    /// Gamepads with the given ids, named after their position
    pub fn with_ids(ids: &[GamepadIndex]) -> Self {
        Self {
            connected: ids
                .iter()
                .map(|id| GamepadInfo::new(*id, format!("Controller {}", id)))
                .collect(),
        }
    }

    pub fn connect(&mut self, info: GamepadInfo) {
        if !self.connected.iter().any(|g| g.id == info.id) {
            self.connected.push(info);
        }
    }

    pub fn disconnect(&mut self, id: GamepadIndex) {
        self.connected.retain(|g| g.id != id);
    }
}

impl GamepadEnumerator for StaticGamepads {
    fn enumerate_connected_gamepads(&self) -> Vec<GamepadInfo> {
        self.connected.clone()
    }
}
