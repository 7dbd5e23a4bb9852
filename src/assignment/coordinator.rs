//! Sequential player-to-device negotiation
//!
//! # State Machine
//!
//! ```text
//! Idle ──► AwaitingSlot(0) ──► … ──► AwaitingSlot(N-1) ──► Complete
//!   │            │                          │
//!   └────────────┴──────────┬───────────────┘
//!                           ▼
//!                       Cancelled
//! ```
//!
//! The coordinator subscribes one key-release listener and one button-release listener
//! per snapshotted gamepad when a negotiation starts. Every listener stays live until
//! the negotiation completes or is cancelled, so each claim goes through the
//! `used_devices` check before it binds anything.

use super::error::AssignmentError;
use super::state::{NegotiationPhase, NegotiationState, SlotAssignment};
use crate::device::{Device, DeviceRegistry};
use crate::input::{GamepadIndex, InputEvent, InputSubsystem, SubscriptionId, Topic};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Negotiation behaviour knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentSettings {
    /// Reject `start` when there are fewer devices than players
    pub require_enough_devices: bool,

    /// Hold back listener activation until the next tick after `start`
    pub defer_subscriptions: bool,
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        Self {
            require_enough_devices: false,
            defer_subscriptions: true,
        }
    }
}

/// What the presentation layer gets to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Waiting for the player with this index
    SlotAdvanced(usize),
    /// Every player has a device; assignments are in player order
    NegotiationComplete(Vec<SlotAssignment>),
}

#[derive(Debug, Clone, Copy)]
struct Listener {
    topic: Topic,
    id: SubscriptionId,
}

/// Drives one negotiation at a time
#[derive(Debug)]
pub struct AssignmentCoordinator {
    settings: AssignmentSettings,
    phase: NegotiationPhase,
    state: Option<NegotiationState>,
    listeners: Vec<Listener>,
    observations: mpsc::UnboundedSender<Observation>,
}

impl AssignmentCoordinator {
    pub fn new(
        settings: AssignmentSettings,
        observations: mpsc::UnboundedSender<Observation>,
    ) -> Self {
        debug!("Creating assignment coordinator with settings: {:?}", settings);
        Self {
            settings,
            phase: NegotiationPhase::Idle,
            state: None,
            listeners: Vec::new(),
            observations,
        }
    }

    pub fn settings(&self) -> &AssignmentSettings {
        &self.settings
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    /// State of the running negotiation, `None` when none is running
    pub fn state(&self) -> Option<&NegotiationState> {
        self.state.as_ref()
    }

    /// Subscriptions currently held by the coordinator
    pub fn subscriptions(&self) -> Vec<SubscriptionId> {
        self.listeners.iter().map(|l| l.id).collect()
    }

    /// Starts a negotiation for `player_count` players
    ///
    /// Snapshots the devices, subscribes the keyboard and every snapshotted gamepad and
    /// announces slot 0. Nothing is subscribed when this fails.
    ///
    /// # Errors
    ///
    /// * [`AssignmentError::InvalidSlotCount`] - `player_count <= 0`
    /// * [`AssignmentError::InsufficientDevices`] - fewer devices than players while
    ///   `require_enough_devices` is set
    /// * [`AssignmentError::AlreadyNegotiating`] - a negotiation is still running
    pub fn start<S: InputSubsystem + ?Sized>(
        &mut self,
        input: &mut S,
        player_count: i64,
    ) -> Result<(), AssignmentError> {
        if let NegotiationPhase::AwaitingSlot(slot) = self.phase {
            return Err(AssignmentError::AlreadyNegotiating(slot));
        }
        let slot_count = usize::try_from(player_count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or(AssignmentError::InvalidSlotCount(player_count))?;

        let options = DeviceRegistry::new(&*input).snapshot_devices();
        if self.settings.require_enough_devices && slot_count > options.len() {
            return Err(AssignmentError::InsufficientDevices {
                requested: slot_count,
                available: options.len(),
            });
        }
        if slot_count > options.len() {
            warn!(
                "{} players but only {} devices, later slots cannot be filled yet",
                slot_count,
                options.len()
            );
        }

        info!(
            "Starting controller negotiation for {} players with options {:?}",
            slot_count, options
        );

        for device in &options {
            let listener = match device {
                Device::Keyboard => Listener {
                    topic: Topic::KeyReleased,
                    id: input.subscribe_key_released(),
                },
                Device::Gamepad(id) => Listener {
                    topic: Topic::GamepadButtonReleased(*id),
                    id: input.subscribe_gamepad_button_released(*id),
                },
            };
            self.listeners.push(listener);
        }

        self.state = Some(NegotiationState::new(slot_count, options));
        self.phase = NegotiationPhase::AwaitingSlot(0);
        self.emit(Observation::SlotAdvanced(0));
        Ok(())
    }

    /// Hands an input event to the matching handler if one of our listeners is live
    ///
    /// Returns whether the event reached a handler.
    pub fn deliver<S: InputSubsystem + ?Sized>(&mut self, input: &mut S, event: &InputEvent) -> bool {
        if !matches!(self.phase, NegotiationPhase::AwaitingSlot(_)) {
            return false;
        }

        match event {
            InputEvent::GamepadDisconnected { gamepad } => {
                self.on_gamepad_disconnected(input, *gamepad);
                return false;
            }
            InputEvent::GamepadConnected { gamepad, name } => {
                info!(
                    "Gamepad {} ({}) connected during negotiation, it is not offered until the next one",
                    gamepad, name
                );
                return false;
            }
            _ => {}
        }

        let Some(topic) = event.topic() else {
            return false;
        };
        let listening = self
            .listeners
            .iter()
            .any(|l| l.topic == topic && input.is_delivering(l.id));
        if !listening {
            debug!("No live listener for {:?}, ignoring event", topic);
            return false;
        }

        match event {
            InputEvent::KeyReleased { key, timestamp } => {
                debug!("Key {:?} released at {}", key, timestamp.format("%H:%M:%S.%3f"));
                self.on_key_released(input);
            }
            InputEvent::GamepadButtonReleased {
                gamepad,
                button,
                timestamp,
            } => {
                debug!(
                    "Gamepad {} released {:?} at {}",
                    gamepad,
                    button,
                    timestamp.format("%H:%M:%S.%3f")
                );
                self.on_gamepad_button_released(input, *gamepad);
            }
            _ => return false,
        }
        true
    }

    /// Keyboard release handler
    pub fn on_key_released<S: InputSubsystem + ?Sized>(&mut self, input: &mut S) {
        self.claim(input, Device::Keyboard);
    }

    /// Button release handler for one gamepad
    pub fn on_gamepad_button_released<S: InputSubsystem + ?Sized>(
        &mut self,
        input: &mut S,
        gamepad: GamepadIndex,
    ) {
        self.claim(input, Device::Gamepad(gamepad));
    }

    /// Drops the running negotiation and all its listeners
    ///
    /// No-op after completion and when already cancelled.
    pub fn cancel<S: InputSubsystem + ?Sized>(&mut self, input: &mut S) {
        match self.phase {
            NegotiationPhase::Complete | NegotiationPhase::Cancelled => {
                debug!("Cancel ignored in phase {:?}", self.phase);
            }
            NegotiationPhase::Idle | NegotiationPhase::AwaitingSlot(_) => {
                info!("Cancelling controller negotiation in phase {:?}", self.phase);
                self.teardown(input);
                self.state = None;
                self.phase = NegotiationPhase::Cancelled;
            }
        }
    }

    fn claim<S: InputSubsystem + ?Sized>(&mut self, input: &mut S, device: Device) {
        if !matches!(self.phase, NegotiationPhase::AwaitingSlot(_)) {
            debug!("{} released outside of a negotiation", device);
            return;
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.is_used(&device) {
            debug!("{} already claimed, ignoring", device);
            return;
        }
        match state.claim(device) {
            Some(slot) => {
                info!("Player {} claimed {}", slot + 1, device);
                self.advance(input);
            }
            None => debug!("{} is not an option in this negotiation", device),
        }
    }

    fn advance<S: InputSubsystem + ?Sized>(&mut self, input: &mut S) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let next = state.advance();

        if !state.is_complete() {
            self.phase = NegotiationPhase::AwaitingSlot(next);
            self.emit(Observation::SlotAdvanced(next));
            return;
        }

        let assignments = state.assignments();
        info!("All {} players assigned: {:?}", assignments.len(), assignments);
        self.teardown(input);
        self.state = None;
        self.phase = NegotiationPhase::Complete;
        self.emit(Observation::NegotiationComplete(assignments));
    }

    fn on_gamepad_disconnected<S: InputSubsystem + ?Sized>(
        &mut self,
        input: &mut S,
        gamepad: GamepadIndex,
    ) {
        let device = Device::Gamepad(gamepad);
        let Some(state) = self.state.as_ref() else {
            return;
        };
        if !state.available_options().contains(&device) {
            return;
        }
        if state.is_used(&device) {
            debug!("{} disconnected after being claimed", device);
        } else {
            warn!(
                "{} disconnected during negotiation, it stays listed but cannot claim a slot",
                device
            );
        }

        let topic = Topic::GamepadButtonReleased(gamepad);
        if let Some(pos) = self.listeners.iter().position(|l| l.topic == topic) {
            let listener = self.listeners.remove(pos);
            input.unsubscribe_gamepad_button_released(gamepad, listener.id);
        }
    }

    fn teardown<S: InputSubsystem + ?Sized>(&mut self, input: &mut S) {
        debug!("Removing {} negotiation listeners", self.listeners.len());
        for listener in self.listeners.drain(..) {
            match listener.topic {
                Topic::KeyReleased => input.unsubscribe_key_released(listener.id),
                Topic::GamepadButtonReleased(gamepad) => {
                    input.unsubscribe_gamepad_button_released(gamepad, listener.id)
                }
            }
        }
    }

    fn emit(&self, observation: Observation) {
        debug!("Observation: {:?}", observation);
        if self.observations.send(observation).is_err() {
            warn!("Observation receiver dropped");
        }
    }
}
