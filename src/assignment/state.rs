//! Negotiation data: player slots and the claimed device set

use crate::device::Device;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Final binding of one player to one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub player_index: usize,
    pub device: Device,
}

/// One player waiting for a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSlot {
    index: usize,
    assigned_device: Option<Device>,
}

impl PlayerSlot {
    fn new(index: usize) -> Self {
        Self {
            index,
            assigned_device: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn assigned_device(&self) -> Option<Device> {
        self.assigned_device
    }
}

/// Lifecycle of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    Idle,
    AwaitingSlot(usize),
    Complete,
    Cancelled,
}

/// Mutable state of one running negotiation
///
/// `used_devices` only grows and is always a subset of `available_options`;
/// `current_slot_index` only grows and equals the slot count once every slot is bound.
#[derive(Debug, Clone)]
pub struct NegotiationState {
    current_slot_index: usize,
    used_devices: HashSet<Device>,
    available_options: Vec<Device>,
    slots: Vec<PlayerSlot>,
}

impl NegotiationState {
    pub(crate) fn new(slot_count: usize, available_options: Vec<Device>) -> Self {
        Self {
            current_slot_index: 0,
            used_devices: HashSet::new(),
            available_options,
            slots: (0..slot_count).map(PlayerSlot::new).collect(),
        }
    }

    pub fn current_slot_index(&self) -> usize {
        self.current_slot_index
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn used_devices(&self) -> &HashSet<Device> {
        &self.used_devices
    }

    pub fn available_options(&self) -> &[Device] {
        &self.available_options
    }

    pub fn slots(&self) -> &[PlayerSlot] {
        &self.slots
    }

    pub fn is_used(&self, device: &Device) -> bool {
        self.used_devices.contains(device)
    }

    pub fn is_complete(&self) -> bool {
        self.current_slot_index == self.slots.len()
    }

    /// Whether `device` may claim the current slot
    pub fn can_claim(&self, device: &Device) -> bool {
        !self.is_complete() && !self.is_used(device) && self.available_options.contains(device)
    }

    /// Binds `device` to the current slot. Returns the slot index, or `None` when the
    /// claim is not allowed.
    pub(crate) fn claim(&mut self, device: Device) -> Option<usize> {
        if !self.can_claim(&device) {
            return None;
        }
        let slot = &mut self.slots[self.current_slot_index];
        if slot.assigned_device.is_some() {
            return None;
        }
        slot.assigned_device = Some(device);
        self.used_devices.insert(device);
        Some(slot.index)
    }

    /// Moves past the current slot. Returns the new index.
    pub(crate) fn advance(&mut self) -> usize {
        if !self.is_complete() {
            self.current_slot_index += 1;
        }
        self.current_slot_index
    }

    /// Assignments in player order; only meaningful once complete
    pub fn assignments(&self) -> Vec<SlotAssignment> {
        self.slots
            .iter()
            .filter_map(|slot| {
                slot.assigned_device.map(|device| SlotAssignment {
                    player_index: slot.index,
                    device,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(slots: usize) -> NegotiationState {
        NegotiationState::new(
            slots,
            vec![Device::Keyboard, Device::Gamepad(1), Device::Gamepad(2)],
        )
    }

    #[test]
    fn claim_binds_current_slot_once() {
        let mut state = state(2);
        assert_eq!(state.claim(Device::Gamepad(2)), Some(0));
        assert_eq!(state.slots()[0].assigned_device(), Some(Device::Gamepad(2)));
        // slot already bound, advance has not happened yet
        assert_eq!(state.claim(Device::Keyboard), None);
        assert_eq!(state.used_devices().len(), 1);
    }

    #[test]
    fn used_and_unknown_devices_cannot_claim() {
        let mut state = state(3);
        state.claim(Device::Keyboard);
        state.advance();
        assert!(!state.can_claim(&Device::Keyboard));
        assert!(!state.can_claim(&Device::Gamepad(9)));
        assert!(state.can_claim(&Device::Gamepad(1)));
    }

    #[test]
    fn completes_when_index_reaches_slot_count() {
        let mut state = state(1);
        state.claim(Device::Keyboard);
        assert!(!state.is_complete());
        assert_eq!(state.advance(), 1);
        assert!(state.is_complete());
        assert_eq!(state.advance(), 1);
        assert_eq!(
            state.assignments(),
            vec![SlotAssignment {
                player_index: 0,
                device: Device::Keyboard
            }]
        );
    }
}
