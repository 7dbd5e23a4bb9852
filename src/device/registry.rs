use super::Device;
use crate::input::GamepadEnumerator;
use tracing::debug;

/// Read-only view of the assignable devices
pub struct DeviceRegistry<'a, E: GamepadEnumerator + ?Sized> {
    source: &'a E,
}

impl<'a, E: GamepadEnumerator + ?Sized> DeviceRegistry<'a, E> {
    pub fn new(source: &'a E) -> Self {
        Self { source }
    }

    /// Keyboard first, then every connected gamepad in detection order
    pub fn snapshot_devices(&self) -> Vec<Device> {
        let mut devices = vec![Device::Keyboard];
        for gamepad in self.source.enumerate_connected_gamepads() {
            let device = Device::Gamepad(gamepad.id);
            // backends should never report an id twice, but the list must stay unique
            if !devices.contains(&device) {
                devices.push(device);
            }
        }
        debug!("Device snapshot: {:?}", devices);
        devices
    }
}
