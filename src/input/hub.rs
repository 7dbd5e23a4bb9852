//! Listener registry that routes input events to their subscribers
//!
//! Subscriptions made during one tick can be held back until the next call to
//! [`ListenerHub::tick`]. A screen switch triggered by a key release would otherwise
//! hand that very release to the listeners the new screen just registered.

use super::{
    GamepadEnumerator, GamepadIndex, GamepadInfo, InputEvent, InputSubsystem, SubscriptionId,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What a subscription listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    KeyReleased,
    GamepadButtonReleased(GamepadIndex),
}

/// When new subscriptions start receiving events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationPolicy {
    /// Deliver from the very next event on
    Immediate,
    /// Deliver only after the next [`ListenerHub::tick`]
    #[default]
    NextTick,
}

#[derive(Debug, Clone)]
struct Registration {
    topic: Topic,
    active: bool,
}

/// Concrete [`InputSubsystem`] over any gamepad enumerator
#[derive(Debug)]
pub struct ListenerHub<E> {
    gamepads: E,
    policy: ActivationPolicy,
    registrations: BTreeMap<SubscriptionId, Registration>,
    next_id: u64,
}

impl<E: GamepadEnumerator> ListenerHub<E> {
    pub fn new(gamepads: E, policy: ActivationPolicy) -> Self {
        debug!("Creating listener hub with {:?} activation", policy);
        Self {
            gamepads,
            policy,
            registrations: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn policy(&self) -> ActivationPolicy {
        self.policy
    }

    pub fn gamepads(&self) -> &E {
        &self.gamepads
    }

    pub fn gamepads_mut(&mut self) -> &mut E {
        &mut self.gamepads
    }

    /// Activates every pending subscription
    pub fn tick(&mut self) {
        let mut activated = 0;
        for registration in self.registrations.values_mut().filter(|r| !r.active) {
            registration.active = true;
            activated += 1;
        }
        if activated > 0 {
            debug!("Activated {} pending subscriptions", activated);
        }
    }

    /// Active subscriptions the event would be delivered to
    pub fn route(&self, event: &InputEvent) -> Vec<SubscriptionId> {
        let Some(topic) = event.topic() else {
            return Vec::new();
        };
        self.registrations
            .iter()
            .filter(|(_, r)| r.active && r.topic == topic)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Registered subscriptions, pending ones included
    pub fn subscription_count(&self) -> usize {
        self.registrations.len()
    }

    pub fn active_count(&self) -> usize {
        self.registrations.values().filter(|r| r.active).count()
    }

    pub fn topic_of(&self, id: SubscriptionId) -> Option<Topic> {
        self.registrations.get(&id).map(|r| r.topic)
    }

    fn register(&mut self, topic: Topic) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let active = self.policy == ActivationPolicy::Immediate;
        self.registrations.insert(id, Registration { topic, active });
        debug!("Subscribed {} to {:?} (active: {})", id, topic, active);
        id
    }

    fn unregister(&mut self, expected: Topic, id: SubscriptionId) {
        match self.registrations.get(&id) {
            Some(registration) if registration.topic == expected => {
                self.registrations.remove(&id);
                debug!("Unsubscribed {} from {:?}", id, expected);
            }
            Some(registration) => warn!(
                "Refusing to unsubscribe {} from {:?}, it listens to {:?}",
                id, expected, registration.topic
            ),
            None => debug!("Subscription {} already removed", id),
        }
    }
}

impl<E: GamepadEnumerator> GamepadEnumerator for ListenerHub<E> {
    fn enumerate_connected_gamepads(&self) -> Vec<GamepadInfo> {
        self.gamepads.enumerate_connected_gamepads()
    }
}

impl<E: GamepadEnumerator> InputSubsystem for ListenerHub<E> {
    fn subscribe_key_released(&mut self) -> SubscriptionId {
        self.register(Topic::KeyReleased)
    }

    fn unsubscribe_key_released(&mut self, id: SubscriptionId) {
        self.unregister(Topic::KeyReleased, id);
    }

    fn subscribe_gamepad_button_released(&mut self, gamepad: GamepadIndex) -> SubscriptionId {
        self.register(Topic::GamepadButtonReleased(gamepad))
    }

    fn unsubscribe_gamepad_button_released(&mut self, gamepad: GamepadIndex, id: SubscriptionId) {
        self.unregister(Topic::GamepadButtonReleased(gamepad), id);
    }

    fn is_delivering(&self, id: SubscriptionId) -> bool {
        self.registrations.get(&id).is_some_and(|r| r.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ButtonType, Key, StaticGamepads};

    #[test]
    fn deferred_subscription_waits_for_tick() {
        let mut hub = ListenerHub::new(StaticGamepads::default(), ActivationPolicy::NextTick);
        let id = hub.subscribe_key_released();
        let event = InputEvent::key_released(Key::Enter);

        assert!(!hub.is_delivering(id));
        assert!(hub.route(&event).is_empty());
        assert_eq!(hub.subscription_count(), 1);
        assert_eq!(hub.active_count(), 0);

        hub.tick();
        assert!(hub.is_delivering(id));
        assert_eq!(hub.route(&event), vec![id]);
    }

    #[test]
    fn routes_button_releases_per_gamepad() {
        let mut hub = ListenerHub::new(StaticGamepads::default(), ActivationPolicy::Immediate);
        let first = hub.subscribe_gamepad_button_released(1);
        let second = hub.subscribe_gamepad_button_released(2);

        assert_eq!(
            hub.route(&InputEvent::button_released(2, ButtonType::A)),
            vec![second]
        );
        assert_eq!(
            hub.route(&InputEvent::button_released(1, ButtonType::Start)),
            vec![first]
        );
        assert!(hub
            .route(&InputEvent::GamepadDisconnected { gamepad: 1 })
            .is_empty());
    }

    #[test]
    fn unsubscribe_is_immediate_and_checks_topic() {
        let mut hub = ListenerHub::new(StaticGamepads::default(), ActivationPolicy::Immediate);
        let pad = hub.subscribe_gamepad_button_released(3);

        hub.unsubscribe_key_released(pad);
        assert!(hub.is_delivering(pad));

        hub.unsubscribe_gamepad_button_released(3, pad);
        assert!(!hub.is_delivering(pad));
        assert_eq!(hub.subscription_count(), 0);

        // second removal is a no-op
        hub.unsubscribe_gamepad_button_released(3, pad);
        assert_eq!(hub.subscription_count(), 0);
    }
}
