use playerbind::{
    assignment::{
        AssignmentCoordinator, AssignmentError, AssignmentSettings, NegotiationPhase, Observation,
        SlotAssignment,
    },
    device::Device,
    input::{ActivationPolicy, ButtonType, InputEvent, Key, ListenerHub, StaticGamepads},
};
use std::collections::HashSet;
use tokio::sync::mpsc;

struct Harness {
    coordinator: AssignmentCoordinator,
    hub: ListenerHub<StaticGamepads>,
    observations: mpsc::UnboundedReceiver<Observation>,
}

impl Harness {
    fn new(gamepads: &[usize]) -> Self {
        let (tx, observations) = mpsc::unbounded_channel();
        Self {
            coordinator: AssignmentCoordinator::new(AssignmentSettings::default(), tx),
            hub: ListenerHub::new(
                StaticGamepads::with_ids(gamepads),
                ActivationPolicy::NextTick,
            ),
            observations,
        }
    }

    fn start(&mut self, players: i64) -> Result<(), AssignmentError> {
        let result = self.coordinator.start(&mut self.hub, players);
        self.hub.tick();
        result
    }

    fn key(&mut self) {
        let event = InputEvent::key_released(Key::Enter);
        self.coordinator.deliver(&mut self.hub, &event);
    }

    fn pad(&mut self, id: usize) {
        let event = InputEvent::button_released(id, ButtonType::A);
        self.coordinator.deliver(&mut self.hub, &event);
    }

    fn observed(&mut self) -> Vec<Observation> {
        std::iter::from_fn(|| self.observations.try_recv().ok()).collect()
    }
}

fn assignment(player_index: usize, device: Device) -> SlotAssignment {
    SlotAssignment {
        player_index,
        device,
    }
}

#[test]
fn start_subscribes_each_option_and_announces_first_slot() {
    for players in 1..=4 {
        let mut harness = Harness::new(&[1, 2]);
        harness.start(players).unwrap();

        let options = harness.coordinator.state().unwrap().available_options().len();
        assert_eq!(options, 3);
        assert_eq!(harness.hub.subscription_count(), options);
        assert_eq!(harness.hub.active_count(), options);
        assert_eq!(harness.observed(), vec![Observation::SlotAdvanced(0)]);
    }
}

#[test]
fn invalid_counts_fail_without_listeners() {
    for players in [0, -1] {
        let mut harness = Harness::new(&[1]);
        assert_eq!(
            harness.start(players),
            Err(AssignmentError::InvalidSlotCount(players))
        );
        assert_eq!(harness.hub.subscription_count(), 0);
        assert!(harness.observed().is_empty());
    }
}

#[test]
fn distinct_releases_fill_every_slot_in_order() {
    let mut harness = Harness::new(&[3, 1, 2]);
    harness.start(4).unwrap();

    harness.pad(2);
    harness.key();
    harness.pad(3);
    harness.pad(1);

    let observed = harness.observed();
    let Some(Observation::NegotiationComplete(assignments)) = observed.last() else {
        panic!("negotiation did not complete: {:?}", observed);
    };

    assert_eq!(assignments.len(), 4);
    let devices: HashSet<Device> = assignments.iter().map(|a| a.device).collect();
    assert_eq!(devices.len(), 4);
    for (i, assignment) in assignments.iter().enumerate() {
        assert_eq!(assignment.player_index, i);
    }
    assert_eq!(assignments[0].device, Device::Gamepad(2));
    assert_eq!(assignments[1].device, Device::Keyboard);
}

#[test]
fn refiring_a_used_device_changes_nothing() {
    let mut harness = Harness::new(&[1, 2]);
    harness.start(3).unwrap();

    harness.pad(1);
    for _ in 0..3 {
        harness.pad(1);
    }

    let state = harness.coordinator.state().unwrap();
    assert_eq!(state.current_slot_index(), 1);
    assert_eq!(state.used_devices().len(), 1);
    assert!(state.used_devices().contains(&Device::Gamepad(1)));
    assert_eq!(
        harness.observed(),
        vec![Observation::SlotAdvanced(0), Observation::SlotAdvanced(1)]
    );
}

#[test]
fn cancel_at_any_slot_silences_observations() {
    for filled in 0..3 {
        let mut harness = Harness::new(&[1, 2]);
        harness.start(3).unwrap();
        let claims: [fn(&mut Harness); 3] = [|h| h.key(), |h| h.pad(1), |h| h.pad(2)];
        for claim in claims.iter().take(filled) {
            claim(&mut harness);
        }
        harness.observed();

        harness.coordinator.cancel(&mut harness.hub);
        assert_eq!(harness.coordinator.phase(), NegotiationPhase::Cancelled);

        harness.key();
        harness.pad(1);
        harness.pad(2);
        assert!(harness.observed().is_empty());
        assert_eq!(harness.hub.subscription_count(), 0);
    }
}

#[test]
fn two_players_keyboard_then_first_gamepad() {
    let mut harness = Harness::new(&[1, 2]);
    harness.start(2).unwrap();
    assert_eq!(
        harness.coordinator.state().unwrap().available_options(),
        &[Device::Keyboard, Device::Gamepad(1), Device::Gamepad(2)]
    );
    assert_eq!(harness.observed(), vec![Observation::SlotAdvanced(0)]);

    harness.key();
    assert_eq!(harness.observed(), vec![Observation::SlotAdvanced(1)]);

    harness.pad(1);
    assert_eq!(
        harness.observed(),
        vec![Observation::NegotiationComplete(vec![
            assignment(0, Device::Keyboard),
            assignment(1, Device::Gamepad(1)),
        ])]
    );

    harness.pad(2);
    assert!(harness.observed().is_empty());
    assert_eq!(harness.coordinator.phase(), NegotiationPhase::Complete);
}

#[test]
fn physical_order_decides_not_enumeration_order() {
    let mut harness = Harness::new(&[1, 2]);
    harness.start(1).unwrap();
    harness.observed();

    harness.pad(2);
    harness.pad(1);

    assert_eq!(
        harness.observed(),
        vec![Observation::NegotiationComplete(vec![assignment(
            0,
            Device::Gamepad(2)
        )])]
    );
}

#[test]
fn more_players_than_devices_leaves_last_slot_waiting() {
    let mut harness = Harness::new(&[]);
    harness.start(2).unwrap();

    harness.key();
    harness.key();

    assert_eq!(
        harness.coordinator.phase(),
        NegotiationPhase::AwaitingSlot(1)
    );
    assert_eq!(
        harness.observed(),
        vec![Observation::SlotAdvanced(0), Observation::SlotAdvanced(1)]
    );
}

#[test]
fn restart_after_completion_runs_a_fresh_negotiation() {
    let mut harness = Harness::new(&[1]);
    harness.start(1).unwrap();
    harness.key();
    harness.observed();

    harness.start(1).unwrap();
    harness.key();
    assert_eq!(
        harness.observed(),
        vec![
            Observation::SlotAdvanced(0),
            Observation::NegotiationComplete(vec![assignment(0, Device::Keyboard)])
        ]
    );
}
