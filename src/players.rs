//! Player roster
//!
//! Holds the players of the current game, their bound control device and whether they
//! can move. Players stay frozen while controllers are being assigned.

use crate::assignment::SlotAssignment;
use crate::device::Device;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Singleplayer,
    Coop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub mode: GameMode,
    /// Sprite names of the players, in player order
    pub player_names: Vec<String>,
    pub default_velocity: f32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            mode: GameMode::Singleplayer,
            player_names: vec!["hoodie".to_string(), "hoodie-blue".to_string()],
            default_velocity: 100.0,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("No player with index {0}")]
    UnknownPlayer(usize),

    #[error("No player names configured")]
    NoPlayers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    pub device: Option<Device>,
    pub keyboard_controlled: bool,
    pub velocity: f32,
}

impl Player {
    fn new(name: impl Into<String>, velocity: f32) -> Self {
        Self {
            name: name.into(),
            device: None,
            keyboard_controlled: false,
            velocity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlayerRoster {
    players: Vec<Player>,
    default_velocity: f32,
}

impl PlayerRoster {
    /// Builds the players for `mode`: the first configured name in single player,
    /// every configured name in co-op.
    pub fn for_mode(mode: GameMode, settings: &GameSettings) -> Result<Self, RosterError> {
        let names: Vec<&String> = match mode {
            GameMode::Singleplayer => settings.player_names.iter().take(1).collect(),
            GameMode::Coop => settings.player_names.iter().collect(),
        };
        if names.is_empty() {
            return Err(RosterError::NoPlayers);
        }
        info!("Creating {:?} roster with players {:?}", mode, names);
        Ok(Self {
            players: names
                .into_iter()
                .map(|name| Player::new(name.clone(), settings.default_velocity))
                .collect(),
            default_velocity: settings.default_velocity,
        })
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Player> {
        self.players.get(index)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn freeze_players(&mut self) {
        debug!("Freezing {} players", self.players.len());
        self.players.iter_mut().for_each(|p| p.velocity = 0.0);
    }

    pub fn unfreeze_players(&mut self) {
        debug!("Unfreezing {} players", self.players.len());
        let velocity = self.default_velocity;
        self.players.iter_mut().for_each(|p| p.velocity = velocity);
    }

    /// Binds each assigned device to its player
    ///
    /// Checks every index before touching any player.
    pub fn apply_assignments(&mut self, assignments: &[SlotAssignment]) -> Result<(), RosterError> {
        if let Some(bad) = assignments
            .iter()
            .find(|a| a.player_index >= self.players.len())
        {
            return Err(RosterError::UnknownPlayer(bad.player_index));
        }
        for assignment in assignments {
            let player = &mut self.players[assignment.player_index];
            player.device = Some(assignment.device);
            player.keyboard_controlled = assignment.device == Device::Keyboard;
            info!("{} is controlled by {}", player.name, assignment.device);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleplayer_uses_first_name_only() {
        let roster = PlayerRoster::for_mode(GameMode::Singleplayer, &GameSettings::default()).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get(0).unwrap().name, "hoodie");
    }

    #[test]
    fn empty_names_fail() {
        let settings = GameSettings {
            player_names: Vec::new(),
            ..Default::default()
        };
        assert_eq!(
            PlayerRoster::for_mode(GameMode::Coop, &settings).unwrap_err(),
            RosterError::NoPlayers
        );
    }

    #[test]
    fn freeze_and_unfreeze_restore_default_velocity() {
        let mut roster = PlayerRoster::for_mode(GameMode::Coop, &GameSettings::default()).unwrap();
        roster.freeze_players();
        assert!(roster.players().iter().all(|p| p.velocity == 0.0));
        roster.unfreeze_players();
        assert!(roster.players().iter().all(|p| p.velocity == 100.0));
    }

    #[test]
    fn assignments_bind_devices() {
        let mut roster = PlayerRoster::for_mode(GameMode::Coop, &GameSettings::default()).unwrap();
        roster
            .apply_assignments(&[
                SlotAssignment {
                    player_index: 0,
                    device: Device::Gamepad(3),
                },
                SlotAssignment {
                    player_index: 1,
                    device: Device::Keyboard,
                },
            ])
            .unwrap();

        let first = roster.get(0).unwrap();
        assert_eq!(first.device, Some(Device::Gamepad(3)));
        assert!(!first.keyboard_controlled);
        assert!(roster.get(1).unwrap().keyboard_controlled);
    }

    #[test]
    fn unknown_player_leaves_roster_untouched() {
        let mut roster = PlayerRoster::for_mode(GameMode::Singleplayer, &GameSettings::default()).unwrap();
        let result = roster.apply_assignments(&[
            SlotAssignment {
                player_index: 0,
                device: Device::Keyboard,
            },
            SlotAssignment {
                player_index: 4,
                device: Device::Gamepad(1),
            },
        ]);
        assert_eq!(result, Err(RosterError::UnknownPlayer(4)));
        assert_eq!(roster.get(0).unwrap().device, None);
    }
}
